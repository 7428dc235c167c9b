//! Task launching seam.
//!
//! The dispatcher never manages threads. It hands boxed futures to a
//! [`Launcher`] and forgets about them. Whatever the launcher does with a
//! task that panics or gets cancelled is the launcher's policy:
//!
//! - [`TokioLauncher`] (and a bare `tokio::runtime::Handle`) detaches the task.
//!   Panics are reported by tokio on the dropped `JoinHandle`, i.e. nowhere.
//! - [`TaskScope`] tracks its tasks so they can be joined or cancelled as a
//!   group. Finished tasks are collected on the next launch and counted in
//!   the report [`TaskScope::join`] returns; panics are logged when collected.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::error::{extract_panic_message, MviError};

/// Fire-and-forget scheduler for background work.
pub trait Launcher: Send + Sync + 'static {
    /// Schedule `task` to run. Must not block and must not wait for it.
    fn launch(&self, task: BoxFuture<'static, ()>);
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(&self, task: BoxFuture<'static, ()>) {
        (**self).launch(task)
    }
}

impl Launcher for Handle {
    fn launch(&self, task: BoxFuture<'static, ()>) {
        self.spawn(task);
    }
}

/// Spawns each task detached on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    handle: Handle,
}

impl TokioLauncher {
    /// Launch onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Launch onto the runtime the caller is running in.
    pub fn current() -> Result<Self, MviError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Launcher for TokioLauncher {
    fn launch(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(task);
    }
}

/// Summary returned by [`TaskScope::join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeReport {
    /// Tasks that ran to completion.
    pub completed: usize,
    /// Tasks that panicked.
    pub panicked: usize,
    /// Tasks stopped by [`TaskScope::cancel`].
    pub cancelled: usize,
}

impl ScopeReport {
    /// Total number of tasks collected.
    pub fn total(&self) -> usize {
        self.completed + self.panicked + self.cancelled
    }

    fn record(&mut self, result: Result<TaskEnd, JoinError>) {
        match result {
            Ok(TaskEnd::Completed) => self.completed += 1,
            Ok(TaskEnd::Cancelled) => self.cancelled += 1,
            Err(e) if e.is_panic() => {
                let panic_msg = extract_panic_message(&e.into_panic());
                warn!(panic = %panic_msg, "scoped task panicked");
                self.panicked += 1;
            }
            Err(_) => self.cancelled += 1,
        }
    }
}

impl std::ops::AddAssign for ScopeReport {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.panicked += other.panicked;
        self.cancelled += other.cancelled;
    }
}

#[derive(Debug)]
enum TaskEnd {
    Completed,
    Cancelled,
}

#[derive(Default)]
struct ScopeTasks {
    running: JoinSet<TaskEnd>,
    /// Outcomes of tasks collected by `launch` since the last join.
    reaped: ScopeReport,
}

impl ScopeTasks {
    fn reap_finished(&mut self) {
        while let Some(result) = self.running.try_join_next() {
            self.reaped.record(result);
        }
    }
}

/// A group of tasks that can be awaited or cancelled together.
///
/// Launching after [`cancel`](Self::cancel) drops the task. Dropping the
/// scope aborts whatever it still holds.
///
/// # Example
///
/// ```ignore
/// let scope = Arc::new(TaskScope::current()?);
/// let dispatch = Mvi::builder(store.clone(), reducer)
///     .with_effects(scope.clone(), effect, on_error, on_fault)
///     .build();
///
/// dispatch.dispatch(Action::Load);
///
/// // Waits for the effect and anything it dispatched in turn.
/// let report = scope.join().await;
/// assert_eq!(report.panicked, 0);
/// ```
pub struct TaskScope {
    handle: Handle,
    tasks: Mutex<ScopeTasks>,
    cancel: watch::Sender<bool>,
}

impl TaskScope {
    /// Create a scope whose tasks run on the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            handle,
            tasks: Mutex::new(ScopeTasks::default()),
            cancel,
        }
    }

    /// Create a scope on the runtime the caller is running in.
    pub fn current() -> Result<Self, MviError> {
        Ok(Self::new(Handle::try_current()?))
    }

    /// Tasks launched and not yet collected.
    ///
    /// Finished tasks are collected on the next launch or join, so this can
    /// briefly include tasks that have already ended.
    pub fn len(&self) -> usize {
        self.lock().running.len()
    }

    /// Returns true if no uncollected task remains.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Stop every running task at its next await point and refuse new ones.
    ///
    /// Cancelled tasks are still collected by [`join`](Self::join).
    pub fn cancel(&self) {
        if !self.cancel.send_replace(true) {
            debug!(pending = self.len(), "task scope cancelled");
        }
    }

    /// Wait until every task in the scope has finished.
    ///
    /// Tasks launched while joining (for example by a side effect that
    /// dispatches again) are waited on too. The report also counts tasks
    /// that finished and were collected since the previous join. If the
    /// returned future is dropped early, the tasks it had already taken are
    /// aborted.
    pub async fn join(&self) -> ScopeReport {
        let mut report = ScopeReport::default();

        loop {
            let mut batch = {
                let mut tasks = self.lock();
                report += std::mem::take(&mut tasks.reaped);
                std::mem::take(&mut tasks.running)
            };
            if batch.is_empty() {
                break;
            }

            while let Some(result) = batch.join_next().await {
                report.record(result);
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, ScopeTasks> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Launcher for TaskScope {
    fn launch(&self, task: BoxFuture<'static, ()>) {
        if self.is_cancelled() {
            warn!("task scope is cancelled, dropping launched task");
            return;
        }

        // wait_for checks the current value first, so a cancel that lands
        // between the check above and this subscribe is still observed.
        let mut cancelled = self.cancel.subscribe();
        let mut tasks = self.lock();
        tasks.reap_finished();
        tasks.running.spawn_on(
            async move {
                tokio::select! {
                    _ = task => TaskEnd::Completed,
                    _ = async { let _ = cancelled.wait_for(|c| *c).await; } => TaskEnd::Cancelled,
                }
            },
            &self.handle,
        );
    }
}

impl std::fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScope")
            .field("pending", &self.len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
