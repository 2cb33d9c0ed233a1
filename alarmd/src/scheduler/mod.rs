//! Scheduler for alarm requests
//!
//! Keeps pending requests in expiration order and runs the single dispatch
//! thread that moves each one into the hand-off queue when it falls due.

mod core;
mod outcome;
mod set;

pub use self::core::Scheduler;
pub use outcome::{SchedulerStats, SubmitOutcome, WaitSentinel};
pub use set::ScheduledSet;
