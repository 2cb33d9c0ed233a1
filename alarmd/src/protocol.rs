//! Line protocol for alarm requests
//!
//! ```text
//! Start_Alarm(<id>): <seconds> <message>
//! Change_Alarm(<id>): <seconds> <message>
//! Cancel_Alarm(<id>)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{AlarmId, AlarmRequest, RequestKind, truncate_message};
use crate::error::{AlarmError, fatal};

static TIMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Start|Change)_Alarm\((-?\d+)\):\s*(-?\d+)\s+(\S.*)$")
        .unwrap_or_else(|e| fatal("compile request pattern", e))
});

static CANCEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Cancel_Alarm\((-?\d+)\)\s*$").unwrap_or_else(|e| fatal("compile request pattern", e))
});

const OUT_OF_RANGE: &str = "Alarm ID and Time must be positive";

/// Turns input lines into validated requests
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_message_len: usize,
}

impl RequestParser {
    pub fn new(max_message_len: usize) -> Self {
        Self { max_message_len }
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// Parse one line; `Ok(None)` for a blank line
    pub fn parse(&self, line: &str) -> Result<Option<AlarmRequest>, AlarmError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let line = line.trim_start();
        debug!(%line, "RequestParser::parse: called");

        if let Some(caps) = TIMED.captures(line) {
            let id = parse_id(&caps[2])?;
            let secs: u64 = caps[3]
                .parse()
                .map_err(|_| AlarmError::InvalidRequest(OUT_OF_RANGE.to_string()))?;
            let message = truncate_message(&caps[4], self.max_message_len);
            let request = match &caps[1] {
                "Start" => AlarmRequest::start(id, secs, message),
                _ => AlarmRequest::change(id, secs, message),
            };
            return Ok(Some(request));
        }

        if let Some(caps) = CANCEL.captures(line) {
            return Ok(Some(AlarmRequest::cancel(parse_id(&caps[1])?)));
        }

        let known = [RequestKind::Start, RequestKind::Change, RequestKind::Cancel]
            .iter()
            .any(|kind| line.starts_with(kind.keyword()));
        let reason = if known { "Bad command" } else { "Invalid command" };
        Err(AlarmError::InvalidRequest(reason.to_string()))
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(128)
    }
}

fn parse_id(raw: &str) -> Result<AlarmId, AlarmError> {
    raw.parse()
        .map_err(|_: String| AlarmError::InvalidRequest(OUT_OF_RANGE.to_string()))
}
