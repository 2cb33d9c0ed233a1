//! Result and state types for the scheduler

use crate::domain::Timestamp;

/// Result of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Start request added to the wait list
    Scheduled,

    /// Change request added; `replaced` older entries with the same id were dropped
    Rescheduled { replaced: usize },

    /// Cancel request applied; `removed` pending entries were dropped
    Cancelled { removed: usize },
}

/// What the dispatch thread is currently blocked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitSentinel {
    /// Not waiting on any deadline (list empty, or busy delivering)
    #[default]
    Idle,

    /// Blocked until this expiration time
    Waiting(Timestamp),
}

impl WaitSentinel {
    /// Whether inserting an entry expiring at `expires_at` must wake the dispatcher
    pub fn should_wake_for(&self, expires_at: Timestamp) -> bool {
        match self {
            WaitSentinel::Idle => true,
            WaitSentinel::Waiting(current) => expires_at < *current,
        }
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        match self {
            WaitSentinel::Idle => None,
            WaitSentinel::Waiting(at) => Some(*at),
        }
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_inserted: u64,
    pub total_rejected: u64,
    pub total_cancelled: u64,
    pub total_dispatched: u64,
    /// Insertions that woke the dispatch thread
    pub wakeups_signalled: u64,
    pub peak_pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_idle_always_wakes() {
        assert!(WaitSentinel::Idle.should_wake_for(crate::domain::now()));
        assert_eq!(WaitSentinel::Idle.deadline(), None);
    }

    #[test]
    fn test_waiting_wakes_only_for_strictly_earlier() {
        let at = crate::domain::now();
        let sentinel = WaitSentinel::Waiting(at);
        assert!(sentinel.should_wake_for(at - Duration::seconds(1)));
        assert!(!sentinel.should_wake_for(at));
        assert!(!sentinel.should_wake_for(at + Duration::seconds(1)));
        assert_eq!(sentinel.deadline(), Some(at));
    }
}
