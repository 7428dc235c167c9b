//! # MVI
//!
//! A unidirectional dispatch loop: reducers decide, stores commit, and side
//! effects run in the background and may dispatch again.
//!
//! ## Core Concepts
//!
//! - [`Reducer`] = decision (pure, synchronous, `(action, state) -> state`)
//! - [`StateStore`] = authority (the caller owns state; the loop only reads and replaces it)
//! - [`SideEffect`] = IO (async, after the commit, may dispatch follow-up actions)
//!
//! ## Architecture
//!
//! ```text
//! caller ─► Dispatch::dispatch(action)
//!              │
//!              ├─► store.get_state()
//!              ├─► reducer(action, state) ─► next
//!              ├─► store.set_state(next)
//!              │
//!              └─► CommitHook (optional)
//!                     │
//!                     │  EffectHook, installed by with_effects():
//!                     ├─► launcher ─► log_action(action, next)
//!                     └─► launcher ─► side_effect(action, next, dispatch)
//!                                        ├─ Ok(())  → done
//!                                        ├─ Err(e)  → on_error
//!                                        └─ panic   → on_fault
//!                                        │
//!                                        └─► dispatch(next_action) ─┐
//!              ▲                                                    │
//!              └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Reduce before commit, commit before effects** - hooks and effects only see committed state
//! 2. **One hook call per dispatch** - never before the commit, never twice
//! 3. **Errors and faults never mix** - `on_error` and `on_fault` are mutually exclusive per dispatch
//! 4. **Reducer panics are not caught** - nothing is committed and the panic reaches the caller
//! 5. **No locking** - concurrent dispatchers must be serialized by the store's owner
//!
//! ## Example
//!
//! ```ignore
//! use mvi::{Dispatch, Fault, InMemoryStore, Mvi, StateStore, TokioLauncher};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! enum Action {
//!     Increment,
//!     Saved,
//! }
//!
//! #[derive(Debug, Clone, Default)]
//! struct Counter {
//!     count: u32,
//!     saved: bool,
//! }
//!
//! fn reducer(action: &Action, state: Counter) -> Counter {
//!     match action {
//!         Action::Increment => Counter { count: state.count + 1, saved: false },
//!         Action::Saved => Counter { saved: true, ..state },
//!     }
//! }
//!
//! let store = Arc::new(InMemoryStore::new(Counter::default()));
//!
//! let dispatch = Mvi::builder(store.clone(), reducer)
//!     .with_effects(
//!         TokioLauncher::current()?,
//!         |action: Action, state: Counter, dispatch: Dispatch<Action>| async move {
//!             if let Action::Increment = action {
//!                 backend::save(state.count).await?;
//!                 dispatch.dispatch(Action::Saved);
//!             }
//!             Ok::<(), backend::Error>(())
//!         },
//!         |_: Action, _: Counter, err: backend::Error| async move {
//!             tracing::warn!(error = %err, "save rejected");
//!         },
//!         |_: Action, _: Counter, fault: Fault| async move {
//!             tracing::error!(%fault, "save crashed");
//!         },
//!     )
//!     .with_log_action(|action: Action, state: Counter| async move {
//!         tracing::info!(?action, count = state.count, "dispatched");
//!     })
//!     .build();
//!
//! dispatch.dispatch(Action::Increment);
//! assert_eq!(store.get_state().count, 1);
//! ```
//!
//! ## What This Is Not
//!
//! No serialization, persistence, retries, selectors, or UI binding. Logging
//! goes through `tracing`; installing a subscriber is up to the application.

// Core modules
mod core;
mod dispatch;
mod effect;
mod error;
mod launcher;
mod orchestrator;
mod store;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export core traits and the dispatch handle
pub use crate::core::{Action, Dispatch, Reducer, State};

// Re-export the dispatch loop
pub use dispatch::{CommitHook, Mvi, MviBuilder};

// Re-export side-effect traits
pub use effect::{ActionLogger, ErrorHandler, FaultHandler, SideEffect};

// Re-export orchestrator types
pub use orchestrator::EffectsBuilder;

// Re-export error types
pub use crate::error::{Fault, MviError};

// Re-export launcher types
pub use launcher::{Launcher, ScopeReport, TaskScope, TokioLauncher};

// Re-export store types
pub use store::{store_fn, FnStore, InMemoryStore, StateStore, WatchStore};

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use futures::future::BoxFuture;
