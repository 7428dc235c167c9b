//! Error types for the dispatch loop.
//!
//! Two failure channels exist and are never merged:
//!
//! - A side effect's declared error (`SideEffect::Error`) is a value. It is
//!   handed to the configured [`ErrorHandler`](crate::ErrorHandler).
//! - A panic escaping a side effect is a [`Fault`]. It is handed to the
//!   configured [`FaultHandler`](crate::FaultHandler).
//!
//! Reducer panics are neither: they unwind straight into the caller of
//! [`Dispatch::dispatch`](crate::Dispatch::dispatch).

use std::any::Any;

use thiserror::Error;

/// Errors raised while wiring a dispatcher together.
#[derive(Debug, Error)]
pub enum MviError {
    /// `TokioLauncher::current()` was called outside of a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// An unexpected failure inside a side effect.
///
/// Produced when the side effect panics instead of returning a `Result`.
/// Only the panic message survives; the payload itself is dropped because
/// it is neither `Clone` nor `Sync`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("side effect panicked: {message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    /// Create a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a fault from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(extract_panic_message(&payload))
    }

    /// The panic message, or `"unknown panic"` for non-string payloads.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Extract a human-readable message from a panic payload.
pub(crate) fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
