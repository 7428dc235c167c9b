//! Background side effects layered over the dispatch loop.
//!
//! The orchestrator is a [`CommitHook`] and nothing more. After each commit it
//! launches up to two independent tasks:
//!
//! ```text
//! dispatch(action)
//!   ├─ reduce + commit                       (caller's thread)
//!   ├─ launch: log_action(action, state)     (optional)
//!   └─ launch: side_effect(action, state, dispatch)
//!                ├─ Ok(())   → done
//!                ├─ Err(e)   → on_error(action, state, e)
//!                └─ panic    → on_fault(action, state, fault)
//! ```
//!
//! `dispatch` returns as soon as both tasks are handed to the launcher. There
//! is no ordering between the logging task and the effect task, and none
//! between tasks of different dispatches.

use std::any::type_name;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, trace, Instrument, Span};

use crate::core::{Action, Dispatch, State};
use crate::dispatch::{CommitHook, MviBuilder};
use crate::effect::{ActionLogger, ErrorHandler, FaultHandler, SideEffect};
use crate::error::Fault;
use crate::launcher::Launcher;

/// Commit hook that launches the logging and side-effect tasks.
struct EffectHook<A: Action, S: State, E: Send + 'static> {
    launcher: Arc<dyn Launcher>,
    side_effect: Arc<dyn SideEffect<A, S, Error = E>>,
    on_error: Arc<dyn ErrorHandler<A, S, E>>,
    on_fault: Arc<dyn FaultHandler<A, S>>,
    log_action: Option<Arc<dyn ActionLogger<A, S>>>,
}

impl<A: Action, S: State, E: Send + 'static> CommitHook<A, S> for EffectHook<A, S, E> {
    fn after_commit(&self, action: &A, state: &S, dispatch: &Dispatch<A>) {
        let span = Span::current();

        if let Some(logger) = &self.log_action {
            let logger = Arc::clone(logger);
            let (action, state) = (action.clone(), state.clone());
            self.launcher.launch(
                async move { logger.log_action(action, state).await }
                    .instrument(span.clone())
                    .boxed(),
            );
        }

        let task = run_side_effect(
            Arc::clone(&self.side_effect),
            Arc::clone(&self.on_error),
            Arc::clone(&self.on_fault),
            action.clone(),
            state.clone(),
            dispatch.clone(),
        );
        self.launcher.launch(task.instrument(span).boxed());
    }
}

/// Run one side effect and route its outcome.
///
/// Only the side effect itself is guarded. A panic in `on_error` or
/// `on_fault` unwinds into the launcher like any other task panic.
async fn run_side_effect<A: Action, S: State, E: Send + 'static>(
    side_effect: Arc<dyn SideEffect<A, S, Error = E>>,
    on_error: Arc<dyn ErrorHandler<A, S, E>>,
    on_fault: Arc<dyn FaultHandler<A, S>>,
    action: A,
    state: S,
    dispatch: Dispatch<A>,
) {
    // AssertUnwindSafe is required because the effect and dispatch are not UnwindSafe.
    // The call itself sits inside the guarded future so a panic raised before
    // the first poll is caught as well.
    let outcome = AssertUnwindSafe(async {
        side_effect
            .execute(action.clone(), state.clone(), dispatch)
            .await
    })
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(())) => trace!("side effect succeeded"),
        Ok(Err(err)) => {
            debug!(error_type = type_name::<E>(), "side effect returned error");
            on_error.on_error(action, state, err).await;
        }
        Err(panic_info) => {
            let fault = Fault::from_panic(panic_info);
            error!(action = type_name::<A>(), panic = %fault.message(), "side effect panicked");
            on_fault.on_fault(action, state, fault).await;
        }
    }
}

/// Builder for a dispatcher with background side effects.
///
/// Obtained from [`MviBuilder::with_effects`].
pub struct EffectsBuilder<A: Action, S: State, E: Send + 'static> {
    core: MviBuilder<A, S>,
    hook: EffectHook<A, S, E>,
}

impl<A: Action, S: State> MviBuilder<A, S> {
    /// Run `side_effect` in the background after every commit.
    ///
    /// Declared errors go to `on_error`, panics go to `on_fault`; the two
    /// never fire for the same dispatch. Tasks are handed to `launcher`.
    ///
    /// Replaces any hook set with [`with_hook`](Self::with_hook).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let dispatch = Mvi::builder(store.clone(), reducer)
    ///     .with_effects(
    ///         TokioLauncher::current()?,
    ///         |action: Cmd, state: App, dispatch: Dispatch<Cmd>| async move {
    ///             api::sync(&state).await?;
    ///             Ok::<(), ApiError>(())
    ///         },
    ///         |_: Cmd, _: App, err: ApiError| async move { toast(err.to_string()) },
    ///         |_: Cmd, _: App, fault: Fault| async move { alert(fault) },
    ///     )
    ///     .build();
    /// ```
    pub fn with_effects<L, F, EH, FH>(
        self,
        launcher: L,
        side_effect: F,
        on_error: EH,
        on_fault: FH,
    ) -> EffectsBuilder<A, S, F::Error>
    where
        L: Launcher,
        F: SideEffect<A, S>,
        EH: ErrorHandler<A, S, F::Error>,
        FH: FaultHandler<A, S>,
    {
        EffectsBuilder {
            core: self,
            hook: EffectHook {
                launcher: Arc::new(launcher),
                side_effect: Arc::new(side_effect),
                on_error: Arc::new(on_error),
                on_fault: Arc::new(on_fault),
                log_action: None,
            },
        }
    }
}

impl<A: Action, S: State, E: Send + 'static> EffectsBuilder<A, S, E> {
    /// Also launch `logger` with every action and the state it produced.
    pub fn with_log_action<G>(mut self, logger: G) -> Self
    where
        G: ActionLogger<A, S>,
    {
        self.hook.log_action = Some(Arc::new(logger));
        self
    }

    /// Finish the dispatcher.
    pub fn build(self) -> Dispatch<A> {
        self.core.with_hook(self.hook).build()
    }
}

impl<A: Action, S: State, E: Send + 'static> std::fmt::Debug for EffectsBuilder<A, S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectsBuilder")
            .field("log_action", &self.hook.log_action.is_some())
            .finish_non_exhaustive()
    }
}
