//! Testing utilities for dispatchers and side effects.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! mvi = { version = "0.1", features = ["testing"] }
//! ```
//!
//! # Driving a side effect in isolation
//!
//! ```ignore
//! use mvi::testing::ActionRecorder;
//!
//! let recorder = ActionRecorder::new();
//! SaveDocument
//!     .execute(Cmd::Save, doc, recorder.dispatch())
//!     .await?;
//!
//! assert_eq!(recorder.actions(), vec![Cmd::Saved]);
//! ```
//!
//! # Waiting for background work
//!
//! Prefer [`TaskScope::join`](crate::TaskScope::join) when you control the
//! launcher. Otherwise count down a [`CountdownLatch`] from a handler:
//!
//! ```ignore
//! let latch = CountdownLatch::new(1);
//! // ... on_error calls latch.count_down()
//! dispatch.dispatch(Cmd::Save);
//! latch.wait().await;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::core::Dispatch;

/// Collects every action sent through its dispatch handle.
///
/// Clones share the same log.
#[derive(Debug)]
pub struct ActionRecorder<A> {
    actions: Arc<Mutex<Vec<A>>>,
}

impl<A: Send + 'static> ActionRecorder<A> {
    pub fn new() -> Self {
        Self {
            actions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A dispatch handle that appends to this recorder instead of reducing.
    pub fn dispatch(&self) -> Dispatch<A> {
        let actions = self.actions.clone();
        Dispatch::from_fn(move |action: A| {
            actions
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(action)
        })
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<A> {
        std::mem::take(
            &mut *self
                .actions
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl<A: Clone + Send + 'static> ActionRecorder<A> {
    /// Snapshot of the recorded actions, in dispatch order.
    pub fn actions(&self) -> Vec<A> {
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl<A: Send + 'static> Default for ActionRecorder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for ActionRecorder<A> {
    fn clone(&self) -> Self {
        Self {
            actions: Arc::clone(&self.actions),
        }
    }
}

#[derive(Debug)]
struct LatchInner {
    remaining: AtomicUsize,
    notify: Notify,
}

/// Countdown latch for awaiting a known number of background events.
///
/// Tests should wait for meaning, not time. Clones share the same count.
///
/// For tests that might hang, wrap [`wait`](Self::wait) in
/// `tokio::time::timeout`.
#[derive(Debug, Clone)]
pub struct CountdownLatch {
    inner: Arc<LatchInner>,
}

impl CountdownLatch {
    /// Create a latch expecting `expected` events.
    pub fn new(expected: usize) -> Self {
        Self {
            inner: Arc::new(LatchInner {
                remaining: AtomicUsize::new(expected),
                notify: Notify::new(),
            }),
        }
    }

    /// Record one event, waking waiters when the count reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if called more times than expected.
    pub fn count_down(&self) {
        let prev = self.inner.remaining.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            panic!("CountdownLatch decremented below zero - more events than expected");
        }
        if prev == 1 {
            self.inner.notify.notify_waiters();
        }
    }

    /// Wait for the count to reach zero.
    pub async fn wait(&self) {
        loop {
            // Register for notification BEFORE checking count
            let notified = self.inner.notify.notified();

            if self.inner.remaining.load(Ordering::Acquire) == 0 {
                return;
            }

            notified.await;
        }
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }
}
