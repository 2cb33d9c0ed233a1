//! Console sink - one colored line per event on stdout

use colored::{ColoredString, Colorize};

use super::bus::EventSink;
use super::types::{AlarmEvent, EventLogEntry};

/// Prints `[unix-ts] description` for each event
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    /// Render an entry as a single console line
    pub fn render(entry: &EventLogEntry) -> String {
        format!("[{}] {}", entry.timestamp.timestamp(), Self::paint(&entry.event))
    }

    fn paint(event: &AlarmEvent) -> ColoredString {
        let line = event.describe();
        match event {
            AlarmEvent::RequestRejected { .. } => line.red(),
            AlarmEvent::RequestExpired { .. } => line.yellow(),
            AlarmEvent::AlarmDisplayed { .. } => line.bright_green(),
            AlarmEvent::WorkerCreated { .. } | AlarmEvent::WorkerTerminated { .. } => line.cyan(),
            AlarmEvent::QueuePushed { .. } | AlarmEvent::QueuePopped { .. } => line.dimmed(),
            _ => line.normal(),
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, entry: &EventLogEntry) {
        println!("{}", Self::render(entry));
    }
}
