//! Display worker identity and lifecycle

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DisplayRecord;
use crate::error::AlarmError;

/// Identifier of a display worker, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Lifecycle of a display worker
///
/// ```text
/// Created -> Running -> Terminating -> Terminated
/// ```
///
/// States are never skipped and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Created,
    Running,
    Terminating,
    Terminated,
}

impl WorkerState {
    pub fn can_advance_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::Created, WorkerState::Running)
                | (WorkerState::Running, WorkerState::Terminating)
                | (WorkerState::Terminating, WorkerState::Terminated)
        )
    }

    /// Validate the move to `next`
    pub fn advance(self, worker: WorkerId, next: WorkerState) -> Result<WorkerState, AlarmError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(AlarmError::InvalidTransition {
                worker,
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminated(self) -> bool {
        self == WorkerState::Terminated
    }
}

/// Time until the next display pass over `shown`
///
/// The shortest repeating interval in the bucket, capped by `poll`; the cap
/// bounds how long a record added to the bucket waits for its first display.
pub fn display_period(shown: &[DisplayRecord], poll: Duration) -> Duration {
    shown
        .iter()
        .filter(|r| !r.is_one_shot())
        .map(|r| Duration::from_secs(r.interval_secs))
        .min()
        .map_or(poll, |interval| interval.min(poll))
}
