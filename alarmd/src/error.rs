//! Error types for alarmd
//!
//! User-facing failures (bad input, duplicate ids) are returned as
//! [`AlarmError`] and never stop the process. Broken invariants and resource
//! exhaustion go through [`fatal`], which logs a diagnostic and aborts.

use thiserror::Error;
use tracing::error;

use crate::display::{WorkerId, WorkerState};
use crate::domain::AlarmId;

/// Errors that can occur while submitting or processing alarms
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Alarm ID {0} already exists")]
    DuplicateId(AlarmId),

    #[error("Dispatch thread already running")]
    DispatcherRunning,

    #[error("Alarm system is shutting down")]
    ShuttingDown,

    #[error("Hand-off queue closed")]
    QueueClosed,

    #[error("Display worker {worker} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        worker: WorkerId,
        from: WorkerState,
        to: WorkerState,
    },

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl AlarmError {
    /// Check if this error came from the request itself (discard and continue)
    pub fn is_user_error(&self) -> bool {
        matches!(self, AlarmError::InvalidRequest(_) | AlarmError::DuplicateId(_))
    }
}

/// Report an unrecoverable failure and abort the process
///
/// Used where shared state can no longer be trusted: a thread that cannot be
/// spawned or a lifecycle transition that breaks the state machine.
pub fn fatal(context: &str, err: impl std::fmt::Display) -> ! {
    error!(%context, error = %err, "fatal error, aborting");
    eprintln!("alarmd: fatal: {}: {}", context, err);
    std::process::abort()
}
