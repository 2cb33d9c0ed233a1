//! alarmd - threaded alarm scheduler
//!
//! Requests arrive as lines (`Start_Alarm`, `Change_Alarm`, `Cancel_Alarm`),
//! wait in a time-ordered list, and are handed to a display side that keeps
//! one worker thread per distinct expiration time.
//!
//! ```text
//! line ──▶ RequestParser ──▶ Scheduler ──(dispatch thread)──▶ HandoffQueue
//!                                                                  │
//!                        DisplayBoard ◀──(consumer thread)─────────┘
//!                          └── one worker thread per bucket
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Alarm ids, requests and display records
//! - [`scheduler`] - Sorted wait list and the dispatch loop
//! - [`handoff`] - Bounded ring buffer between dispatch and consumer
//! - [`display`] - Display list, consumer and worker pool
//! - [`events`] - Observable activity and its sinks
//! - [`protocol`] - Line parser
//! - [`runtime`] - Wiring into a running [`AlarmSystem`]
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod display;
pub mod domain;
pub mod error;
pub mod events;
pub mod handoff;
pub mod protocol;
pub mod repl;
pub mod runtime;
pub mod scheduler;

// Re-export commonly used types
pub use config::Config;
pub use display::{Consumer, DisplayBoard, DisplayList, WorkerId, WorkerState};
pub use domain::{AlarmId, AlarmRequest, DisplayRecord, RequestKind, Timestamp};
pub use error::{AlarmError, fatal};
pub use events::{AlarmEvent, EventBus, EventLogEntry, EventSink, MemorySink, RemovalReason};
pub use handoff::HandoffQueue;
pub use protocol::RequestParser;
pub use runtime::AlarmSystem;
pub use scheduler::{Scheduler, SchedulerStats, SubmitOutcome, WaitSentinel};
