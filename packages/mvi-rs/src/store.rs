//! State storage seam.
//!
//! The dispatcher never owns state. It reads through [`StateStore::get_state`]
//! before each reduction and writes through [`StateStore::set_state`] right
//! after. Stores provide no cross-call atomicity: if several threads dispatch
//! at once, serializing them is the caller's job.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

/// Read and replace the current state.
pub trait StateStore<S>: Send + Sync + 'static {
    /// Return a snapshot of the current state.
    fn get_state(&self) -> S;

    /// Replace the current state wholesale.
    fn set_state(&self, state: S);
}

impl<S, T> StateStore<S> for Arc<T>
where
    T: StateStore<S> + ?Sized,
{
    fn get_state(&self) -> S {
        (**self).get_state()
    }

    fn set_state(&self, state: S) {
        (**self).set_state(state)
    }
}

/// Plain in-memory state cell.
#[derive(Debug, Default)]
pub struct InMemoryStore<S> {
    state: Mutex<S>,
}

impl<S> InMemoryStore<S> {
    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    /// Consume the store and return the last committed state.
    pub fn into_inner(self) -> S {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // A reducer never runs under this lock, so a poisoned guard still holds
    // the last fully committed state.
    fn lock(&self) -> MutexGuard<'_, S> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Clone + Send + 'static> StateStore<S> for InMemoryStore<S> {
    fn get_state(&self) -> S {
        self.lock().clone()
    }

    fn set_state(&self, state: S) {
        *self.lock() = state;
    }
}

/// Reactive store backed by a `tokio::sync::watch` channel.
///
/// Every committed state is published to subscribers. Receivers only ever see
/// the latest value, so fast successive commits may be coalesced.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(WatchStore::new(Counter::default()));
/// let mut updates = store.subscribe();
///
/// let dispatch = Mvi::builder(store.clone(), reducer).build();
/// dispatch.dispatch(CounterAction::Increment);
///
/// updates.changed().await?;
/// assert_eq!(updates.borrow().count, 1);
/// ```
#[derive(Debug)]
pub struct WatchStore<S> {
    sender: watch::Sender<S>,
}

impl<S> WatchStore<S> {
    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Subscribe to committed states.
    ///
    /// The receiver starts out having seen the current value.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<S: Clone + Send + Sync + 'static> StateStore<S> for WatchStore<S> {
    fn get_state(&self) -> S {
        self.sender.borrow().clone()
    }

    fn set_state(&self, state: S) {
        // send_replace stores the value even when nobody is subscribed
        self.sender.send_replace(state);
    }
}

/// Store made of a getter and a setter closure.
///
/// Use [`store_fn`] to build one. This is the shape to reach for when state
/// lives somewhere the crate knows nothing about (a UI framework cell, an
/// actor, a field behind your own lock).
pub struct FnStore<G, W> {
    get: G,
    set: W,
}

/// Build a [`StateStore`] from a `get_state` and a `set_state` closure.
pub fn store_fn<S, G, W>(get: G, set: W) -> FnStore<G, W>
where
    G: Fn() -> S + Send + Sync + 'static,
    W: Fn(S) + Send + Sync + 'static,
{
    FnStore { get, set }
}

impl<S, G, W> StateStore<S> for FnStore<G, W>
where
    G: Fn() -> S + Send + Sync + 'static,
    W: Fn(S) + Send + Sync + 'static,
{
    fn get_state(&self) -> S {
        (self.get)()
    }

    fn set_state(&self, state: S) {
        (self.set)(state)
    }
}

impl<G, W> std::fmt::Debug for FnStore<G, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_in_memory_store_roundtrip() {
        let store = InMemoryStore::new(1_u32);
        assert_eq!(store.get_state(), 1);
        store.set_state(5);
        assert_eq!(store.get_state(), 5);
        assert_eq!(store.into_inner(), 5);
    }

    #[test]
    fn test_in_memory_store_recovers_from_poison() {
        let store = Arc::new(InMemoryStore::new(vec![1, 2]));

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(store.get_state(), vec![1, 2]);
        store.set_state(vec![3]);
        assert_eq!(store.get_state(), vec![3]);
    }

    #[test]
    fn test_arc_store_delegates() {
        let store = Arc::new(InMemoryStore::new(String::from("a")));
        let shared: Arc<dyn StateStore<String>> = store.clone();
        shared.set_state("b".into());
        assert_eq!(store.get_state(), "b");
    }

    #[test]
    fn test_watch_store_without_subscribers() {
        let store = WatchStore::new(0_i32);
        assert_eq!(store.subscriber_count(), 0);
        store.set_state(3);
        assert_eq!(store.get_state(), 3);
    }

    #[tokio::test]
    async fn test_watch_store_publishes_commits() {
        let store = WatchStore::new(0_i32);
        let mut rx = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);

        store.set_state(7);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 7);
    }

    #[test]
    fn test_fn_store_uses_closures() {
        let cell = Arc::new(AtomicI64::new(10));
        let store = store_fn(
            {
                let cell = cell.clone();
                move || cell.load(Ordering::SeqCst)
            },
            {
                let cell = cell.clone();
                move |v: i64| cell.store(v, Ordering::SeqCst)
            },
        );

        assert_eq!(store.get_state(), 10);
        store.set_state(-2);
        assert_eq!(cell.load(Ordering::SeqCst), -2);
    }
}
