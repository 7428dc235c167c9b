//! The synchronous reduce-and-commit loop.
//!
//! Every call to [`Dispatch::dispatch`] runs exactly this sequence:
//!
//! ```text
//! get_state() ─► reducer(action, state) ─► set_state(next) ─► hook(action, next, dispatch)
//! ```
//!
//! The hook is optional, runs at most once per dispatch, and always runs after
//! the commit. Nothing here suspends, locks, or catches panics.

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug_span, trace};

use crate::core::{Dispatch, DispatchTarget, Reducer};
use crate::store::StateStore;

/// Called after each commit with the action, the committed state, and a
/// handle back to the dispatcher.
///
/// Implemented for any `Fn(&A, &S, &Dispatch<A>)`. The hook runs on the
/// dispatching thread; anything slow belongs in a side effect instead
/// (see [`MviBuilder::with_effects`]).
pub trait CommitHook<A, S>: Send + Sync + 'static {
    /// React to a committed state transition.
    fn after_commit(&self, action: &A, state: &S, dispatch: &Dispatch<A>);
}

impl<A, S, F> CommitHook<A, S> for F
where
    F: Fn(&A, &S, &Dispatch<A>) + Send + Sync + 'static,
{
    fn after_commit(&self, action: &A, state: &S, dispatch: &Dispatch<A>) {
        self(action, state, dispatch)
    }
}

/// Reduce-commit-notify loop behind a [`Dispatch`] handle.
pub(crate) struct DispatchCore<A, S> {
    store: Box<dyn StateStore<S>>,
    reducer: Box<dyn Reducer<A, S>>,
    hook: Option<Box<dyn CommitHook<A, S>>>,
}

impl<A: 'static, S: Clone + 'static> DispatchTarget<A> for DispatchCore<A, S> {
    fn dispatch_from(self: Arc<Self>, action: A) {
        let _span = debug_span!("dispatch", action = type_name::<A>()).entered();

        let current = self.store.get_state();
        let next = self.reducer.reduce(&action, current);

        match &self.hook {
            Some(hook) => {
                let committed = next.clone();
                self.store.set_state(next);
                trace!("state committed");

                let dispatch = Dispatch::from_target(self.clone());
                hook.after_commit(&action, &committed, &dispatch);
            }
            None => {
                self.store.set_state(next);
                trace!("state committed");
            }
        }
    }
}

/// Entry point for building dispatchers.
///
/// # Example
///
/// ```ignore
/// use mvi::{InMemoryStore, Mvi, StateStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::new(Counter { count: 0 }));
/// let dispatch = Mvi::builder(store.clone(), |_: &Increment, s: Counter| Counter {
///     count: s.count + 1,
/// })
/// .build();
///
/// dispatch.dispatch(Increment);
/// assert_eq!(store.get_state().count, 1);
/// ```
#[derive(Debug)]
pub struct Mvi;

impl Mvi {
    /// Start building a dispatcher over `store` and `reducer`.
    pub fn builder<A, S, St, R>(store: St, reducer: R) -> MviBuilder<A, S>
    where
        A: 'static,
        S: Clone + 'static,
        St: StateStore<S>,
        R: Reducer<A, S>,
    {
        MviBuilder::new(store, reducer)
    }
}

/// Builder for the bare dispatch loop.
///
/// Finish with [`build`](Self::build) for a plain dispatcher, or switch to
/// [`with_effects`](Self::with_effects) for background side effects.
pub struct MviBuilder<A, S> {
    store: Box<dyn StateStore<S>>,
    reducer: Box<dyn Reducer<A, S>>,
    hook: Option<Box<dyn CommitHook<A, S>>>,
}

impl<A: 'static, S: Clone + 'static> MviBuilder<A, S> {
    /// Create a builder over `store` and `reducer` with no hook.
    pub fn new<St, R>(store: St, reducer: R) -> Self
    where
        St: StateStore<S>,
        R: Reducer<A, S>,
    {
        Self {
            store: Box::new(store),
            reducer: Box::new(reducer),
            hook: None,
        }
    }

    /// Set the hook that runs after every commit, replacing any previous one.
    pub fn with_hook<H>(mut self, hook: H) -> Self
    where
        H: CommitHook<A, S>,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Finish the dispatcher.
    pub fn build(self) -> Dispatch<A> {
        let core = DispatchCore {
            store: self.store,
            reducer: self.reducer,
            hook: self.hook,
        };
        Dispatch::from_target(Arc::new(core))
    }
}

impl<A, S> std::fmt::Debug for MviBuilder<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MviBuilder")
            .field("has_hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{store_fn, InMemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        Add(i64),
        Explode,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        count: i64,
    }

    fn reducer(action: &CounterAction, state: Counter) -> Counter {
        match action {
            CounterAction::Increment => Counter {
                count: state.count + 1,
            },
            CounterAction::Add(n) => Counter {
                count: state.count + n,
            },
            CounterAction::Explode => panic!("reducer exploded"),
        }
    }

    /// Store that records every `set_state` call.
    fn recording_store(
        initial: Counter,
    ) -> (impl StateStore<Counter>, Arc<Mutex<Vec<Counter>>>) {
        let cell = Arc::new(Mutex::new(initial));
        let writes = Arc::new(Mutex::new(Vec::new()));
        let store = store_fn(
            {
                let cell = cell.clone();
                move || cell.lock().unwrap().clone()
            },
            {
                let writes = writes.clone();
                move |state: Counter| {
                    writes.lock().unwrap().push(state.clone());
                    *cell.lock().unwrap() = state;
                }
            },
        );
        (store, writes)
    }

    #[test]
    fn test_single_increment_commits_once() {
        let (store, writes) = recording_store(Counter::default());
        let dispatch = Mvi::builder(store, reducer).build();

        dispatch.dispatch(CounterAction::Increment);

        assert_eq!(*writes.lock().unwrap(), vec![Counter { count: 1 }]);
    }

    #[test]
    fn test_commits_reducer_output_for_each_action() {
        let (store, writes) = recording_store(Counter { count: 5 });
        let dispatch = Mvi::builder(store, reducer).build();

        let actions = [
            CounterAction::Add(-2),
            CounterAction::Increment,
            CounterAction::Add(10),
        ];
        for action in actions {
            let before = writes
                .lock()
                .unwrap()
                .last()
                .cloned()
                .unwrap_or(Counter { count: 5 });
            let expected = reducer(&action, before);
            dispatch.dispatch(action);
            assert_eq!(writes.lock().unwrap().last(), Some(&expected));
        }

        assert_eq!(writes.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_noop_hook_does_not_touch_state() {
        let (store, writes) = recording_store(Counter::default());
        let dispatch = Mvi::builder(store, reducer)
            .with_hook(|_: &CounterAction, _: &Counter, _: &Dispatch<CounterAction>| {})
            .build();

        dispatch.dispatch(CounterAction::Add(4));

        assert_eq!(*writes.lock().unwrap(), vec![Counter { count: 4 }]);
    }

    #[test]
    fn test_hook_sees_committed_state() {
        let store = Arc::new(InMemoryStore::new(Counter::default()));
        let observed = Arc::new(Mutex::new(Vec::new()));

        let dispatch = Mvi::builder(store.clone(), reducer)
            .with_hook({
                let store = store.clone();
                let observed = observed.clone();
                move |action: &CounterAction, state: &Counter, _: &Dispatch<CounterAction>| {
                    observed
                        .lock()
                        .unwrap()
                        .push((action.clone(), state.clone(), store.get_state()));
                }
            })
            .build();

        dispatch.dispatch(CounterAction::Increment);

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 1);
        let (action, state, in_store) = &observed[0];
        assert_eq!(action, &CounterAction::Increment);
        assert_eq!(state, &Counter { count: 1 });
        assert_eq!(in_store, &Counter { count: 1 });
    }

    #[test]
    fn test_hook_runs_once_per_dispatch() {
        let store = InMemoryStore::new(Counter::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let dispatch = Mvi::builder(store, reducer)
            .with_hook({
                let calls = calls.clone();
                move |_: &CounterAction, _: &Counter, _: &Dispatch<CounterAction>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        dispatch.dispatch_all([CounterAction::Increment, CounterAction::Increment]);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hook_can_chain_dispatch() {
        let store = Arc::new(InMemoryStore::new(Counter::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let dispatch = Mvi::builder(store.clone(), reducer)
            .with_hook({
                let seen = seen.clone();
                move |action: &CounterAction, state: &Counter, dispatch: &Dispatch<CounterAction>| {
                    seen.lock().unwrap().push(state.count);
                    if *action == CounterAction::Increment {
                        dispatch.dispatch(CounterAction::Add(10));
                    }
                }
            })
            .build();

        dispatch.dispatch(CounterAction::Increment);

        assert_eq!(*seen.lock().unwrap(), vec![1, 11]);
        assert_eq!(store.get_state(), Counter { count: 11 });
    }

    #[test]
    fn test_hook_receives_same_dispatcher() {
        let store = InMemoryStore::new(Counter::default());
        let captured: Arc<Mutex<Option<Dispatch<CounterAction>>>> = Arc::new(Mutex::new(None));

        let dispatch = Mvi::builder(store, reducer)
            .with_hook({
                let captured = captured.clone();
                move |_: &CounterAction, _: &Counter, dispatch: &Dispatch<CounterAction>| {
                    *captured.lock().unwrap() = Some(dispatch.clone());
                }
            })
            .build();

        dispatch.dispatch(CounterAction::Increment);

        let inner = captured.lock().unwrap().take().unwrap();
        assert!(Dispatch::same_target(&dispatch, &inner));
    }

    #[test]
    #[should_panic(expected = "reducer exploded")]
    fn test_reducer_panic_propagates() {
        let store = InMemoryStore::new(Counter::default());
        let dispatch = Mvi::builder(store, reducer).build();
        dispatch.dispatch(CounterAction::Explode);
    }

    #[test]
    fn test_reducer_panic_leaves_state_and_skips_hook() {
        let store = Arc::new(InMemoryStore::new(Counter { count: 3 }));
        let hook_calls = Arc::new(AtomicUsize::new(0));

        let dispatch = Mvi::builder(store.clone(), reducer)
            .with_hook({
                let hook_calls = hook_calls.clone();
                move |_: &CounterAction, _: &Counter, _: &Dispatch<CounterAction>| {
                    hook_calls.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            dispatch.dispatch(CounterAction::Explode)
        }));

        assert!(result.is_err());
        assert_eq!(store.get_state(), Counter { count: 3 });
        assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder_debug() {
        let builder = Mvi::builder(InMemoryStore::new(Counter::default()), reducer);
        assert!(format!("{:?}", builder).contains("has_hook: false"));

        let builder =
            builder.with_hook(|_: &CounterAction, _: &Counter, _: &Dispatch<CounterAction>| {});
        assert!(format!("{:?}", builder).contains("has_hook: true"));
    }
}
