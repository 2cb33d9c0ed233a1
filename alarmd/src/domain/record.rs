//! Display records kept for the live alarm view

use serde::{Deserialize, Serialize};

use super::id::AlarmId;
use super::request::{AlarmRequest, Timestamp};

/// Rendering copy of an active alarm
///
/// Independent of the AlarmRequest it was built from: the request is
/// consumed on delivery, the record lives until cancelled or finally shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub id: AlarmId,
    pub interval_secs: u64,
    pub expires_at: Timestamp,
    pub message: String,
}

impl DisplayRecord {
    /// Overwrite fields from a Change request
    pub fn update_from(&mut self, request: &AlarmRequest) {
        self.interval_secs = request.interval_secs;
        self.expires_at = request.expires_at;
        self.message.clone_from(&request.message);
    }

    /// One-shot records are shown a single time, then dropped
    pub fn is_one_shot(&self) -> bool {
        self.interval_secs == 0
    }
}

impl From<&AlarmRequest> for DisplayRecord {
    fn from(request: &AlarmRequest) -> Self {
        Self {
            id: request.id,
            interval_secs: request.interval_secs,
            expires_at: request.expires_at,
            message: request.message.clone(),
        }
    }
}
