//! Alarm requests submitted by the producer

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::id::AlarmId;

/// Absolute expiration time, in whole seconds
pub type Timestamp = DateTime<Utc>;

/// Current wall-clock time truncated to whole seconds
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(0)
}

/// Truncate a message to at most `max_len` bytes without splitting a character
pub fn truncate_message(message: &str, max_len: usize) -> String {
    if message.len() <= max_len {
        return message.to_string();
    }
    let mut end = max_len;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

/// What a request asks the system to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Start,
    Change,
    Cancel,
}

impl RequestKind {
    /// Protocol keyword for this kind
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Start => "Start_Alarm",
            Self::Change => "Change_Alarm",
            Self::Cancel => "Cancel_Alarm",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A Start/Change/Cancel request
///
/// Lives in exactly one place at a time: the scheduler's wait list, the
/// hand-off queue, or the stack of the thread currently moving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRequest {
    pub id: AlarmId,
    pub kind: RequestKind,
    pub interval_secs: u64,
    pub expires_at: Timestamp,
    pub message: String,
}

impl AlarmRequest {
    /// Build a request submitted at `submitted_at`
    pub fn submitted_at(
        id: AlarmId,
        kind: RequestKind,
        interval_secs: u64,
        submitted_at: Timestamp,
        message: impl Into<String>,
    ) -> Self {
        let offset = i64::try_from(interval_secs).unwrap_or(i64::MAX);
        let expires_at = Duration::try_seconds(offset)
            .and_then(|d| submitted_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id,
            kind,
            interval_secs,
            expires_at,
            message: message.into(),
        }
    }

    /// Start request submitted now
    pub fn start(id: AlarmId, interval_secs: u64, message: impl Into<String>) -> Self {
        Self::submitted_at(id, RequestKind::Start, interval_secs, now(), message)
    }

    /// Change request submitted now
    pub fn change(id: AlarmId, interval_secs: u64, message: impl Into<String>) -> Self {
        Self::submitted_at(id, RequestKind::Change, interval_secs, now(), message)
    }

    /// Cancel request, effective immediately
    pub fn cancel(id: AlarmId) -> Self {
        Self::submitted_at(id, RequestKind::Cancel, 0, now(), String::new())
    }
}
