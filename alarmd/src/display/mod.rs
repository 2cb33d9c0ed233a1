//! Display side of the pipeline
//!
//! ```text
//! HandoffQueue ──▶ Consumer ──▶ DisplayBoard { DisplayList, workers }
//!                                    │
//!                                    ├── worker(bucket t1) ──▶ AlarmDisplayed
//!                                    └── worker(bucket t2) ──▶ AlarmDisplayed
//! ```

mod board;
mod consumer;
mod list;
mod worker;

pub use board::DisplayBoard;
pub use consumer::Consumer;
pub use list::DisplayList;
pub use worker::{WorkerId, WorkerState, display_period};
