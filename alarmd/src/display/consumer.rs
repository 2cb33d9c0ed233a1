//! Consumer: drains the hand-off queue into the display board

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::AlarmRequest;
use crate::events::{AlarmEvent, EventBus};
use crate::handoff::HandoffQueue;

use super::board::DisplayBoard;

/// Single consumer of the hand-off queue
pub struct Consumer {
    queue: Arc<HandoffQueue<AlarmRequest>>,
    board: Arc<DisplayBoard>,
    events: EventBus,
}

impl Consumer {
    pub fn new(queue: Arc<HandoffQueue<AlarmRequest>>, board: Arc<DisplayBoard>, events: EventBus) -> Self {
        Self { queue, board, events }
    }

    /// Apply requests in queue order until the queue is closed
    ///
    /// Returns how many requests were applied.
    pub fn run(&self) -> usize {
        info!("Consumer::run: started");
        let mut applied = 0;
        while let Some((index, request)) = self.queue.pop() {
            debug!(id = %request.id, index, "Consumer::run: popped");
            self.events.emit(AlarmEvent::QueuePopped {
                alarm_id: request.id,
                kind: request.kind,
                index,
            });
            self.board.apply(request);
            applied += 1;
        }
        info!(applied, "Consumer::run: queue closed, stopping");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use crate::domain::{AlarmId, RequestKind};
    use crate::events::MemorySink;

    #[test]
    fn test_applies_in_queue_order() {
        let sink = MemorySink::new();
        let bus = EventBus::new().with_sink(sink.clone());
        let queue = Arc::new(HandoffQueue::new(4));
        let board = Arc::new(DisplayBoard::new(Duration::from_secs(60), bus.clone()));
        let consumer = Consumer::new(queue.clone(), board.clone(), bus);

        let handle = thread::spawn(move || consumer.run());

        let id = AlarmId::new(3).unwrap();
        queue.push(AlarmRequest::start(id, 120, "first")).unwrap();
        queue.push(AlarmRequest::change(id, 240, "second")).unwrap();
        queue.push(AlarmRequest::cancel(id)).unwrap();

        assert!(sink.wait_for(Duration::from_secs(5), |entries| {
            entries.iter().any(|e| matches!(e.event, AlarmEvent::RecordRemoved { .. }))
        }));
        queue.close();
        assert_eq!(handle.join().unwrap(), 3);

        let popped: Vec<(RequestKind, usize)> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                AlarmEvent::QueuePopped { kind, index, .. } => Some((kind, index)),
                _ => None,
            })
            .collect();
        assert_eq!(
            popped,
            vec![(RequestKind::Start, 0), (RequestKind::Change, 1), (RequestKind::Cancel, 2)]
        );
        assert!(board.records().is_empty());
        board.shutdown();
    }
}
