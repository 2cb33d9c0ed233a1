//! Event Logger - persists events to a JSONL file
//!
//! One JSON object per line, appended as events are emitted, for history and
//! debugging after the process exits.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::bus::EventSink;
use super::types::EventLogEntry;

/// Event sink that appends events to a JSONL file
pub struct EventLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl EventLogger {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::open: called");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an entry as one JSON line
    pub fn write_entry(&self, entry: &EventLogEntry) -> eyre::Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }
}

impl EventSink for EventLogger {
    fn emit(&self, entry: &EventLogEntry) {
        if let Err(e) = self.write_entry(entry) {
            error!(path = ?self.path, error = %e, "EventLogger: failed to write event");
        }
    }
}

/// Read events back from a JSONL log file
pub fn read_events(path: impl AsRef<Path>) -> eyre::Result<Vec<EventLogEntry>> {
    let path = path.as_ref();
    debug!(?path, "read_events: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_events: loaded entries");
    Ok(entries)
}
