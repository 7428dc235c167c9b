//! Side effects and the handlers that receive their outcomes.
//!
//! A side effect runs after the commit, off the dispatching thread, with the
//! action, the committed state, and a [`Dispatch`] handle for follow-up
//! actions. It finishes in exactly one of three ways:
//!
//! | Outcome            | Routed to            |
//! |--------------------|----------------------|
//! | `Ok(())`           | nothing              |
//! | `Err(error)`       | [`ErrorHandler`]     |
//! | panic              | [`FaultHandler`]     |
//!
//! Every trait here is implemented for async closures of the matching shape,
//! so small effects can be written inline:
//!
//! ```ignore
//! let effect = |action: Cmd, state: App, dispatch: Dispatch<Cmd>| async move {
//!     if let Cmd::Save = action {
//!         api::save(&state).await.map_err(SaveError::from)?;
//!         dispatch.dispatch(Cmd::Saved);
//!     }
//!     Ok::<(), SaveError>(())
//! };
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::core::{Action, Dispatch, State};
use crate::error::Fault;

/// Asynchronous work triggered by a committed state transition.
///
/// # Example
///
/// ```ignore
/// struct SyncProfile {
///     client: ApiClient,
/// }
///
/// #[async_trait]
/// impl SideEffect<ProfileAction, Profile> for SyncProfile {
///     type Error = ApiError;
///
///     async fn execute(
///         &self,
///         action: ProfileAction,
///         state: Profile,
///         dispatch: Dispatch<ProfileAction>,
///     ) -> Result<(), ApiError> {
///         if let ProfileAction::Rename(_) = action {
///             self.client.put_profile(&state).await?;
///             dispatch.dispatch(ProfileAction::Synced);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SideEffect<A: Action, S: State>: Send + Sync + 'static {
    /// Declared, expected failure.
    type Error: Send + 'static;

    /// Run the effect for one committed transition.
    ///
    /// `state` is the state committed by the dispatch that scheduled this
    /// effect, not necessarily the latest one.
    async fn execute(&self, action: A, state: S, dispatch: Dispatch<A>)
        -> Result<(), Self::Error>;
}

#[async_trait]
impl<A, S, E, F, Fut> SideEffect<A, S> for F
where
    A: Action,
    S: State,
    E: Send + 'static,
    F: Fn(A, S, Dispatch<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    type Error = E;

    async fn execute(&self, action: A, state: S, dispatch: Dispatch<A>) -> Result<(), E> {
        (self)(action, state, dispatch).await
    }
}

/// Receives the declared error returned by a side effect.
#[async_trait]
pub trait ErrorHandler<A: Action, S: State, E: Send + 'static>: Send + Sync + 'static {
    async fn on_error(&self, action: A, state: S, error: E);
}

#[async_trait]
impl<A, S, E, F, Fut> ErrorHandler<A, S, E> for F
where
    A: Action,
    S: State,
    E: Send + 'static,
    F: Fn(A, S, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_error(&self, action: A, state: S, error: E) {
        (self)(action, state, error).await
    }
}

/// Receives a [`Fault`] when a side effect panics.
///
/// Kept apart from [`ErrorHandler`] so bugs can be alerted on while domain
/// errors are handled quietly.
#[async_trait]
pub trait FaultHandler<A: Action, S: State>: Send + Sync + 'static {
    async fn on_fault(&self, action: A, state: S, fault: Fault);
}

#[async_trait]
impl<A, S, F, Fut> FaultHandler<A, S> for F
where
    A: Action,
    S: State,
    F: Fn(A, S, Fault) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_fault(&self, action: A, state: S, fault: Fault) {
        (self)(action, state, fault).await
    }
}

/// Observes every dispatched action together with the state it produced.
///
/// Runs as its own task. A panic here is left to the launcher; it never
/// reaches the side effect or its handlers.
#[async_trait]
pub trait ActionLogger<A: Action, S: State>: Send + Sync + 'static {
    async fn log_action(&self, action: A, state: S);
}

#[async_trait]
impl<A, S, F, Fut> ActionLogger<A, S> for F
where
    A: Action,
    S: State,
    F: Fn(A, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn log_action(&self, action: A, state: S) {
        (self)(action, state).await
    }
}
