//! Domain types for alarmd
//!
//! Core domain types: AlarmRequest (owned by exactly one container at a time)
//! and DisplayRecord (the independent copy kept for rendering).
//!
//! All timestamps are whole UTC seconds so that requests submitted within the
//! same second with the same interval land in the same expiration bucket.

mod id;
mod record;
mod request;

pub use id::AlarmId;
pub use record::DisplayRecord;
pub use request::{AlarmRequest, RequestKind, Timestamp, now, truncate_message};
