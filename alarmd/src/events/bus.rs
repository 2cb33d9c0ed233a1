//! Event Bus - fan-out of core events to every sink
//!
//! Components emit events, sinks (console, JSONL file, memory) receive them.
//! Sinks run on the emitting thread and must never take any of the core
//! locks (scheduler, hand-off queue, display board).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::types::{AlarmEvent, EventLogEntry};

/// Receiver of emitted events
pub trait EventSink: Send + Sync {
    /// Handle one timestamped event
    fn emit(&self, entry: &EventLogEntry);
}

/// Central event bus for alarmd activity
///
/// Cheap to clone; every clone shares the same sinks.
#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    /// Create a bus with no sinks (events are only traced)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Emit an event to all sinks
    pub fn emit(&self, event: AlarmEvent) {
        debug!(
            event_type = event.event_type(),
            alarm_id = ?event.alarm_id(),
            "EventBus::emit"
        );
        let entry = EventLogEntry::new(event);
        for sink in &self.sinks {
            sink.emit(&entry);
        }
    }

    /// Get the number of attached sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// In-memory sink that records every event
///
/// Used by tests and by callers that want to inspect the event history.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<EventLogEntry>>,
    changed: Condvar,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> Vec<AlarmEvent> {
        self.entries.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// All recorded entries with timestamps
    pub fn entries(&self) -> Vec<EventLogEntry> {
        self.entries.lock().clone()
    }

    /// Block until `pred` holds over the recorded events or `timeout` passes
    ///
    /// Returns whether the predicate was satisfied.
    pub fn wait_for<F>(&self, timeout: Duration, mut pred: F) -> bool
    where
        F: FnMut(&[EventLogEntry]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut entries = self.entries.lock();
        loop {
            if pred(&entries) {
                return true;
            }
            if self.changed.wait_until(&mut entries, deadline).timed_out() {
                return pred(&entries);
            }
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, entry: &EventLogEntry) {
        self.entries.lock().push(entry.clone());
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AlarmId;

    fn cancelled(n: u32) -> AlarmEvent {
        AlarmEvent::RequestCancelled {
            alarm_id: AlarmId::new(n).expect("positive id"),
            removed: 0,
        }
    }

    #[test]
    fn test_bus_fans_out_to_all_sinks() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let bus = EventBus::new().with_sink(a.clone()).with_sink(b.clone());
        assert_eq!(bus.sink_count(), 2);

        bus.emit(cancelled(1));
        bus.emit(cancelled(2));

        assert_eq!(a.events(), vec![cancelled(1), cancelled(2)]);
        assert_eq!(b.events().len(), 2);
    }

    #[test]
    fn test_bus_without_sinks_is_fine() {
        EventBus::new().emit(cancelled(1));
    }

    #[test]
    fn test_wait_for_sees_event_from_other_thread() {
        let sink = MemorySink::new();
        let bus = EventBus::new().with_sink(sink.clone());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            bus.emit(cancelled(9));
        });

        let seen = sink.wait_for(Duration::from_secs(5), |entries| !entries.is_empty());
        handle.join().expect("emitter thread");
        assert!(seen);
    }

    #[test]
    fn test_wait_for_times_out() {
        let sink = MemorySink::new();
        assert!(!sink.wait_for(Duration::from_millis(20), |entries| !entries.is_empty()));
    }
}
