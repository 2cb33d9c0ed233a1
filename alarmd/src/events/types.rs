//! Event types for alarmd activity
//!
//! These events are everything an observer can see of the core:
//! - Requests entering, leaving, or being rejected by the scheduler
//! - Hand-off queue traffic (with slot indexes)
//! - Display list changes and per-bucket display output
//! - Display worker lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::WorkerId;
use crate::domain::{AlarmId, RequestKind, Timestamp};

/// Why a display record left the list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalReason {
    /// A Cancel request arrived for it
    Cancelled,
    /// One-shot record after its single display
    Expired,
    /// A Start arrived for an id already on the board
    Replaced,
}

/// Core event enum - the vocabulary of alarmd activity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlarmEvent {
    // === Scheduler ===
    /// A Start/Change request entered the wait list
    RequestInserted {
        alarm_id: AlarmId,
        kind: RequestKind,
        interval_secs: u64,
        message: String,
        /// Entries replaced by a Change
        replaced: usize,
    },
    /// A request was discarded
    RequestRejected { alarm_id: Option<AlarmId>, reason: String },
    /// Entries for an id were removed from the wait list
    RequestCancelled { alarm_id: AlarmId, removed: usize },
    /// The dispatch thread took a request off the wait list
    RequestExpired {
        alarm_id: AlarmId,
        kind: RequestKind,
        interval_secs: u64,
        message: String,
    },

    // === Hand-off queue ===
    QueuePushed {
        alarm_id: AlarmId,
        kind: RequestKind,
        index: usize,
    },
    QueuePopped {
        alarm_id: AlarmId,
        kind: RequestKind,
        index: usize,
    },

    // === Display list ===
    RecordInserted {
        alarm_id: AlarmId,
        interval_secs: u64,
        expires_at: Timestamp,
        message: String,
    },
    RecordUpdated {
        alarm_id: AlarmId,
        interval_secs: u64,
        expires_at: Timestamp,
        message: String,
    },
    RecordRemoved { alarm_id: AlarmId, reason: RemovalReason },
    /// A display worker printed one record of its bucket
    AlarmDisplayed {
        alarm_id: AlarmId,
        worker_id: WorkerId,
        interval_secs: u64,
        message: String,
    },

    // === Display workers ===
    WorkerCreated { worker_id: WorkerId, bucket: Timestamp },
    WorkerTerminated { worker_id: WorkerId, bucket: Timestamp },
}

impl AlarmEvent {
    /// Get the alarm this event concerns, if any
    pub fn alarm_id(&self) -> Option<AlarmId> {
        match self {
            AlarmEvent::RequestInserted { alarm_id, .. }
            | AlarmEvent::RequestCancelled { alarm_id, .. }
            | AlarmEvent::RequestExpired { alarm_id, .. }
            | AlarmEvent::QueuePushed { alarm_id, .. }
            | AlarmEvent::QueuePopped { alarm_id, .. }
            | AlarmEvent::RecordInserted { alarm_id, .. }
            | AlarmEvent::RecordUpdated { alarm_id, .. }
            | AlarmEvent::RecordRemoved { alarm_id, .. }
            | AlarmEvent::AlarmDisplayed { alarm_id, .. } => Some(*alarm_id),
            AlarmEvent::RequestRejected { alarm_id, .. } => *alarm_id,
            AlarmEvent::WorkerCreated { .. } | AlarmEvent::WorkerTerminated { .. } => None,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            AlarmEvent::RequestInserted { .. } => "RequestInserted",
            AlarmEvent::RequestRejected { .. } => "RequestRejected",
            AlarmEvent::RequestCancelled { .. } => "RequestCancelled",
            AlarmEvent::RequestExpired { .. } => "RequestExpired",
            AlarmEvent::QueuePushed { .. } => "QueuePushed",
            AlarmEvent::QueuePopped { .. } => "QueuePopped",
            AlarmEvent::RecordInserted { .. } => "RecordInserted",
            AlarmEvent::RecordUpdated { .. } => "RecordUpdated",
            AlarmEvent::RecordRemoved { .. } => "RecordRemoved",
            AlarmEvent::AlarmDisplayed { .. } => "AlarmDisplayed",
            AlarmEvent::WorkerCreated { .. } => "WorkerCreated",
            AlarmEvent::WorkerTerminated { .. } => "WorkerTerminated",
        }
    }

    /// One-line human rendering (without timestamp)
    pub fn describe(&self) -> String {
        match self {
            AlarmEvent::RequestInserted {
                alarm_id,
                kind,
                interval_secs,
                message,
                replaced,
            } => {
                let mut line = format!(
                    "{} Request({}) inserted into alarm list: Time = {} Message = {}",
                    kind, alarm_id, interval_secs, message
                );
                if *replaced > 0 {
                    line.push_str(&format!(" (replaced {})", replaced));
                }
                line
            }
            AlarmEvent::RequestRejected { alarm_id, reason } => match alarm_id {
                Some(id) => format!("Request({}) rejected: {}", id, reason),
                None => format!("Request rejected: {}", reason),
            },
            AlarmEvent::RequestCancelled { alarm_id, removed } => {
                format!("Cancel_Alarm Request({}) removed {} pending request(s)", alarm_id, removed)
            }
            AlarmEvent::RequestExpired {
                alarm_id,
                kind,
                interval_secs,
                message,
            } => format!(
                "{} Request({}) expired: Time = {} Message = {}",
                kind, alarm_id, interval_secs, message
            ),
            AlarmEvent::QueuePushed { alarm_id, kind, index } => {
                format!("{} Request({}) pushed into hand-off buffer index {}", kind, alarm_id, index)
            }
            AlarmEvent::QueuePopped { alarm_id, kind, index } => {
                format!("{} Request({}) popped from hand-off buffer index {}", kind, alarm_id, index)
            }
            AlarmEvent::RecordInserted {
                alarm_id,
                interval_secs,
                expires_at,
                message,
            } => format!(
                "Alarm({}) inserted into display list: Time = {} Expires = {} Message = {}",
                alarm_id,
                interval_secs,
                expires_at.timestamp(),
                message
            ),
            AlarmEvent::RecordUpdated {
                alarm_id,
                interval_secs,
                expires_at,
                message,
            } => format!(
                "Alarm({}) updated in display list: Time = {} Expires = {} Message = {}",
                alarm_id,
                interval_secs,
                expires_at.timestamp(),
                message
            ),
            AlarmEvent::RecordRemoved { alarm_id, reason } => {
                format!("Alarm({}) removed from display list ({:?})", alarm_id, reason)
            }
            AlarmEvent::AlarmDisplayed {
                alarm_id,
                worker_id,
                interval_secs,
                message,
            } => format!(
                "Alarm({}) printed by display worker {}: Time = {} Message = {}",
                alarm_id, worker_id, interval_secs, message
            ),
            AlarmEvent::WorkerCreated { worker_id, bucket } => {
                format!("Display worker {} created for expiration {}", worker_id, bucket.timestamp())
            }
            AlarmEvent::WorkerTerminated { worker_id, bucket } => {
                format!("Display worker {} terminated for expiration {}", worker_id, bucket.timestamp())
            }
        }
    }
}

/// A timestamped event log entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Wall-clock time the event was emitted
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: AlarmEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: AlarmEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
