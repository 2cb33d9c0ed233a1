//! Event system for observing the alarm core
//!
//! Every state change in the core emits an [`AlarmEvent`] through the
//! [`EventBus`]. Sinks decide what to do with it.
//!
//! ```text
//!   Scheduler        Hand-off queue       Display board / workers
//!   - Inserted       - Pushed             - RecordInserted/Updated/Removed
//!   - Cancelled      - Popped             - AlarmDisplayed
//!   - Expired                             - WorkerCreated/Terminated
//!        │                 │                       │
//!        └─────────────────┴───────────┬───────────┘
//!                                   EventBus
//!                    ┌─────────────────┼─────────────────┐
//!               ConsoleSink       EventLogger         MemorySink
//!                (stdout)          (.jsonl)          (inspection)
//! ```

mod bus;
mod console;
mod logger;
mod types;

pub use bus::{EventBus, EventSink, MemorySink};
pub use console::ConsoleSink;
pub use logger::{EventLogger, read_events};
pub use types::{AlarmEvent, EventLogEntry, RemovalReason};
