//! Core traits and the dispatch handle.
//!
//! - [`Action`] and [`State`] are blanket marker traits, like `Clone + Send + Sync`
//!   aliases. Any value type qualifies.
//! - [`Reducer`] computes the next state. It is pure and synchronous.
//! - [`Dispatch`] is the capability to submit actions. Clones drive the same
//!   dispatcher.

use std::any::type_name;
use std::sync::Arc;

/// Marker trait for actions (intents, events).
///
/// Blanket-implemented for every `Clone + Send + Sync + 'static` type.
pub trait Action: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Action for T {}

/// Marker trait for state snapshots.
///
/// States are replaced wholesale, never mutated in place by the dispatcher.
pub trait State: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> State for T {}

/// Pure function producing the next state from an action and the current state.
///
/// Implemented for any `Fn(&A, S) -> S`.
///
/// # Example
///
/// ```ignore
/// fn reducer(action: &CounterAction, state: Counter) -> Counter {
///     match action {
///         CounterAction::Increment => Counter { count: state.count + 1 },
///         CounterAction::Reset => Counter::default(),
///     }
/// }
/// ```
///
/// A reducer that panics aborts the dispatch before anything is committed.
/// The panic reaches the caller of [`Dispatch::dispatch`] unchanged.
pub trait Reducer<A, S>: Send + Sync + 'static {
    /// Compute the state that follows `state` once `action` is applied.
    fn reduce(&self, action: &A, state: S) -> S;
}

impl<A, S, F> Reducer<A, S> for F
where
    F: Fn(&A, S) -> S + Send + Sync + 'static,
{
    fn reduce(&self, action: &A, state: S) -> S {
        self(action, state)
    }
}

/// Type-erased dispatch target.
///
/// Takes `Arc<Self>` so the target can hand a handle to itself to its own
/// commit hook without holding a reference cycle.
pub(crate) trait DispatchTarget<A>: Send + Sync + 'static {
    fn dispatch_from(self: Arc<Self>, action: A);
}

/// Handle used to submit actions.
///
/// `Dispatch` is cheap to clone and `Send + Sync`. Side effects receive a
/// clone of the handle that invoked them so they can feed further actions
/// back into the loop.
///
/// # Example
///
/// ```ignore
/// let dispatch = Mvi::builder(store.clone(), reducer).build();
/// dispatch.dispatch(CounterAction::Increment);
/// assert_eq!(store.get_state().count, 1);
/// ```
pub struct Dispatch<A> {
    target: Arc<dyn DispatchTarget<A>>,
}

impl<A: 'static> Dispatch<A> {
    pub(crate) fn from_target(target: Arc<dyn DispatchTarget<A>>) -> Self {
        Self { target }
    }

    /// Wrap a plain closure as a dispatch handle.
    ///
    /// Useful for driving a side effect in isolation, or for forwarding
    /// actions into a foreign sink.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::from_target(Arc::new(FnTarget(f)))
    }

    /// Submit one action: reduce, commit, then run the configured hook.
    ///
    /// Returns once the state is committed and any background work has been
    /// handed to the launcher. Never waits on side effects.
    pub fn dispatch(&self, action: A) {
        Arc::clone(&self.target).dispatch_from(action);
    }

    /// Submit several actions in order, each as its own full cycle.
    pub fn dispatch_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = A>,
    {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Returns true if both handles drive the same dispatcher.
    pub fn same_target(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.target, &b.target)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<A> std::fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("action", &type_name::<A>())
            .finish_non_exhaustive()
    }
}

struct FnTarget<F>(F);

impl<A, F> DispatchTarget<A> for FnTarget<F>
where
    F: Fn(A) + Send + Sync + 'static,
{
    fn dispatch_from(self: Arc<Self>, action: A) {
        (self.0)(action)
    }
}
