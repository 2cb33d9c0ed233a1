//! Scheduler implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::domain::{AlarmId, AlarmRequest, RequestKind};
use crate::error::AlarmError;
use crate::events::{AlarmEvent, EventBus};
use crate::handoff::HandoffQueue;

use super::outcome::{SchedulerStats, SubmitOutcome, WaitSentinel};
use super::set::ScheduledSet;

/// Internal state protected by mutex
struct SchedulerInner {
    /// Pending Start/Change requests in expiration order
    scheduled: ScheduledSet,

    /// Deadline the dispatch thread is blocked on
    sentinel: WaitSentinel,

    /// Cancel notices waiting to be forwarded downstream
    cancellations: VecDeque<AlarmRequest>,

    /// Stop flag observed by the dispatch loop
    shutdown: bool,

    stats: SchedulerStats,
}

/// The Scheduler owns the wait list and moves due requests downstream.
///
/// Callers submit from any thread; exactly one dispatch thread runs
/// [`Scheduler::run`], sleeping until the earliest deadline and waking early
/// when an earlier request arrives.
pub struct Scheduler {
    inner: Mutex<SchedulerInner>,
    wakeup: Condvar,
    dispatching: AtomicBool,
    events: EventBus,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(events: EventBus) -> Self {
        debug!(sinks = events.sink_count(), "Scheduler::new: called");
        Self {
            inner: Mutex::new(SchedulerInner {
                scheduled: ScheduledSet::new(),
                sentinel: WaitSentinel::Idle,
                cancellations: VecDeque::new(),
                shutdown: false,
                stats: SchedulerStats::default(),
            }),
            wakeup: Condvar::new(),
            dispatching: AtomicBool::new(false),
            events,
        }
    }

    /// Submit a Start, Change or Cancel request
    pub fn submit(&self, request: AlarmRequest) -> Result<SubmitOutcome, AlarmError> {
        debug!(id = %request.id, kind = ?request.kind, "Scheduler::submit: called");
        match request.kind {
            RequestKind::Cancel => {
                let removed = self.cancel(request.id);
                Ok(SubmitOutcome::Cancelled { removed })
            }
            RequestKind::Start | RequestKind::Change => self.insert(request),
        }
    }

    fn insert(&self, request: AlarmRequest) -> Result<SubmitOutcome, AlarmError> {
        let id = request.id;
        let kind = request.kind;
        let expires_at = request.expires_at;
        let mut inner = self.inner.lock();

        if inner.shutdown {
            debug!(%id, "Scheduler::insert: shutting down, rejecting");
            return Err(AlarmError::ShuttingDown);
        }

        let old_head = inner.scheduled.head().map(|h| h.expires_at);
        let replaced = if kind == RequestKind::Change {
            inner.scheduled.remove_id(id)
        } else if inner.scheduled.contains_id(id) {
            debug!(%id, "Scheduler::insert: duplicate start, rejecting");
            inner.stats.total_rejected += 1;
            self.events.emit(AlarmEvent::RequestRejected {
                alarm_id: Some(id),
                reason: "alarm id already scheduled".to_string(),
            });
            return Err(AlarmError::DuplicateId(id));
        } else {
            0
        };

        // Emitted under the lock so the dispatcher cannot log this entry first
        self.events.emit(AlarmEvent::RequestInserted {
            alarm_id: id,
            kind,
            interval_secs: request.interval_secs,
            message: request.message.clone(),
            replaced,
        });
        let position = inner.scheduled.insert(request);

        inner.stats.total_inserted += 1;
        inner.stats.peak_pending = inner.stats.peak_pending.max(inner.scheduled.len());

        let new_head = inner.scheduled.head().map(|h| h.expires_at);
        let wake = if inner.sentinel.should_wake_for(expires_at) {
            debug!(%id, position, "Scheduler::insert: earlier than current wait, signalling");
            inner.sentinel = WaitSentinel::Waiting(expires_at);
            true
        } else if replaced > 0 && new_head != old_head {
            // A Change moved the head the dispatcher is waiting on to a later time
            debug!(%id, "Scheduler::insert: head rescheduled, signalling");
            inner.sentinel = new_head.map_or(WaitSentinel::Idle, WaitSentinel::Waiting);
            true
        } else {
            false
        };
        if wake {
            inner.stats.wakeups_signalled += 1;
        }
        drop(inner);

        if wake {
            self.wakeup.notify_one();
        }

        Ok(match kind {
            RequestKind::Change => SubmitOutcome::Rescheduled { replaced },
            _ => SubmitOutcome::Scheduled,
        })
    }

    /// Remove every pending entry for `id` and forward a cancel notice
    ///
    /// Never fails; an unknown id removes nothing and returns 0.
    pub fn cancel(&self, id: AlarmId) -> usize {
        debug!(%id, "Scheduler::cancel: called");
        let mut inner = self.inner.lock();
        let removed = inner.scheduled.remove_id(id);
        self.events.emit(AlarmEvent::RequestCancelled { alarm_id: id, removed });
        if !inner.shutdown {
            inner.cancellations.push_back(AlarmRequest::cancel(id));
        }
        inner.stats.total_cancelled += 1;
        drop(inner);

        self.wakeup.notify_one();
        removed
    }

    /// Dispatch loop: deliver due requests into `queue` until shutdown
    ///
    /// Only one thread may run this at a time.
    pub fn run(&self, queue: &HandoffQueue<AlarmRequest>) -> Result<(), AlarmError> {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            return Err(AlarmError::DispatcherRunning);
        }
        info!("Scheduler::run: dispatch loop started");

        while let Some(request) = self.next_due() {
            let id = request.id;
            let kind = request.kind;

            // Scheduler lock is not held here; the event is logged inside the
            // queue's critical section, before the consumer can pop the slot
            let pushed = queue.push_with(request, |index, _| {
                self.events.emit(AlarmEvent::QueuePushed {
                    alarm_id: id,
                    kind,
                    index,
                });
            });
            if let Err(e) = pushed {
                debug!(%id, error = %e, "Scheduler::run: hand-off queue closed");
                break;
            }
        }

        self.dispatching.store(false, Ordering::SeqCst);
        info!("Scheduler::run: dispatch loop stopped");
        Ok(())
    }

    /// Block until a request is due (or a cancel notice is pending)
    ///
    /// Returns `None` on shutdown. Re-evaluates the head after every wake, so
    /// early signals and spurious wakeups never count as expirations.
    fn next_due(&self) -> Option<AlarmRequest> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                inner.sentinel = WaitSentinel::Idle;
                return None;
            }

            if let Some(notice) = inner.cancellations.pop_front() {
                return Some(notice);
            }

            let Some(head_at) = inner.scheduled.head().map(|h| h.expires_at) else {
                inner.sentinel = WaitSentinel::Idle;
                self.wakeup.wait(&mut inner);
                continue;
            };

            match (head_at - Utc::now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => {
                    inner.sentinel = WaitSentinel::Waiting(head_at);
                    let deadline = Instant::now() + remaining;
                    self.wakeup.wait_until(&mut inner, deadline);
                }
                _ => {
                    inner.sentinel = WaitSentinel::Idle;
                    inner.stats.total_dispatched += 1;
                    let request = inner.scheduled.pop_head();
                    if let Some(request) = &request {
                        self.events.emit(AlarmEvent::RequestExpired {
                            alarm_id: request.id,
                            kind: request.kind,
                            interval_secs: request.interval_secs,
                            message: request.message.clone(),
                        });
                    }
                    return request;
                }
            }
        }
    }

    /// Ask the dispatch loop to exit
    pub fn shutdown(&self) {
        debug!("Scheduler::shutdown: called");
        self.inner.lock().shutdown = true;
        self.wakeup.notify_all();
    }

    /// Copy of the wait list in dispatch order
    pub fn snapshot(&self) -> Vec<AlarmRequest> {
        self.inner.lock().scheduled.iter().cloned().collect()
    }

    /// Current wait sentinel
    pub fn wait_sentinel(&self) -> WaitSentinel {
        self.inner.lock().sentinel
    }

    /// Number of pending Start/Change requests
    pub fn len(&self) -> usize {
        self.inner.lock().scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a dispatch loop is currently running
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.lock().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;

    use crate::domain::{Timestamp, now};

    fn id(n: u32) -> AlarmId {
        AlarmId::new(n).unwrap()
    }

    fn start_at(n: u32, secs: u64, at: Timestamp) -> AlarmRequest {
        AlarmRequest::submitted_at(id(n), RequestKind::Start, secs, at, format!("alarm {}", n))
    }

    fn change_at(n: u32, secs: u64, at: Timestamp) -> AlarmRequest {
        AlarmRequest::submitted_at(id(n), RequestKind::Change, secs, at, format!("changed {}", n))
    }

    fn spawn_dispatcher(
        scheduler: &Arc<Scheduler>,
        queue: &Arc<HandoffQueue<AlarmRequest>>,
    ) -> thread::JoinHandle<Result<(), AlarmError>> {
        let scheduler = scheduler.clone();
        let queue = queue.clone();
        thread::spawn(move || scheduler.run(&queue))
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();

        assert_eq!(scheduler.submit(start_at(1, 10, at)).unwrap(), SubmitOutcome::Scheduled);
        let err = scheduler.submit(start_at(1, 20, at)).unwrap_err();
        assert!(matches!(err, AlarmError::DuplicateId(dup) if dup == id(1)));

        // Original entry untouched
        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].interval_secs, 10);
        assert_eq!(scheduler.stats().total_rejected, 1);
    }

    #[test]
    fn test_change_reschedules() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();
        scheduler.submit(start_at(1, 10, at)).unwrap();
        scheduler.submit(start_at(2, 20, at)).unwrap();

        let outcome = scheduler.submit(change_at(1, 30, at)).unwrap();
        assert_eq!(outcome, SubmitOutcome::Rescheduled { replaced: 1 });

        let snapshot = scheduler.snapshot();
        let ids: Vec<u32> = snapshot.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(snapshot[1].kind, RequestKind::Change);
        assert_eq!(snapshot[1].message, "changed 1");
    }

    #[test]
    fn test_change_without_pending_entry() {
        let scheduler = Scheduler::new(EventBus::new());
        let outcome = scheduler.submit(change_at(5, 10, now())).unwrap();
        assert_eq!(outcome, SubmitOutcome::Rescheduled { replaced: 0 });
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();
        scheduler.submit(start_at(1, 10, at)).unwrap();
        scheduler.submit(start_at(2, 20, at)).unwrap();
        let before = scheduler.snapshot();

        assert_eq!(scheduler.cancel(id(99)), 0);
        assert_eq!(scheduler.snapshot(), before);

        assert_eq!(scheduler.cancel(id(1)), 1);
        assert_eq!(scheduler.cancel(id(1)), 0);
        assert_eq!(scheduler.len(), 1);

        let outcome = scheduler.submit(AlarmRequest::cancel(id(2))).unwrap();
        assert_eq!(outcome, SubmitOutcome::Cancelled { removed: 1 });
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancelled_id_can_start_again() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();
        scheduler.submit(start_at(1, 10, at)).unwrap();
        scheduler.cancel(id(1));
        assert_eq!(scheduler.submit(start_at(1, 10, at)).unwrap(), SubmitOutcome::Scheduled);
    }

    #[test]
    fn test_signal_only_for_earlier_insertions() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();

        // Idle sentinel: first insertion always signals
        scheduler.submit(start_at(1, 50, at)).unwrap();
        assert_eq!(scheduler.stats().wakeups_signalled, 1);
        assert_eq!(scheduler.wait_sentinel().deadline(), Some(at + ChronoDuration::seconds(50)));

        // Later (and equal) deadlines do not
        scheduler.submit(start_at(2, 60, at)).unwrap();
        scheduler.submit(start_at(3, 50, at)).unwrap();
        assert_eq!(scheduler.stats().wakeups_signalled, 1);

        // Strictly earlier does
        scheduler.submit(start_at(4, 10, at)).unwrap();
        assert_eq!(scheduler.stats().wakeups_signalled, 2);
        assert_eq!(scheduler.wait_sentinel().deadline(), Some(at + ChronoDuration::seconds(10)));
    }

    #[test]
    fn test_change_of_head_retargets_sentinel() {
        let scheduler = Scheduler::new(EventBus::new());
        let at = now();
        scheduler.submit(start_at(1, 10, at)).unwrap();
        scheduler.submit(start_at(2, 20, at)).unwrap();
        assert_eq!(scheduler.wait_sentinel().deadline(), Some(at + ChronoDuration::seconds(10)));
        assert_eq!(scheduler.stats().wakeups_signalled, 1);

        // Head moves behind id 2: the wait follows the new head
        scheduler.submit(change_at(1, 30, at)).unwrap();
        assert_eq!(scheduler.wait_sentinel().deadline(), Some(at + ChronoDuration::seconds(20)));
        assert_eq!(scheduler.stats().wakeups_signalled, 2);

        // Changing a non-head entry leaves the wait alone
        scheduler.submit(change_at(1, 40, at)).unwrap();
        assert_eq!(scheduler.wait_sentinel().deadline(), Some(at + ChronoDuration::seconds(20)));
        assert_eq!(scheduler.stats().wakeups_signalled, 2);
    }

    #[test]
    fn test_events_logged_under_scheduler_lock() {
        let sink = crate::events::MemorySink::new();
        let scheduler = Arc::new(Scheduler::new(EventBus::new().with_sink(sink.clone())));
        let queue = Arc::new(HandoffQueue::new(4));
        let dispatcher = spawn_dispatcher(&scheduler, &queue);

        for n in 1..=30 {
            scheduler.submit(start_at(n, 0, now())).unwrap();
            assert_eq!(queue.pop().unwrap().1.kind, RequestKind::Start);
            scheduler.cancel(id(n));
            assert_eq!(queue.pop().unwrap().1.kind, RequestKind::Cancel);
        }

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();

        let events = sink.events();
        let at = |pred: &dyn Fn(&AlarmEvent) -> bool| events.iter().position(pred);
        for n in 1..=30 {
            let alarm = id(n);
            let inserted = at(&|e| matches!(e, AlarmEvent::RequestInserted { alarm_id, .. } if *alarm_id == alarm));
            let expired = at(&|e| matches!(e, AlarmEvent::RequestExpired { alarm_id, .. } if *alarm_id == alarm));
            let cancelled = at(&|e| matches!(e, AlarmEvent::RequestCancelled { alarm_id, .. } if *alarm_id == alarm));
            let notice = at(&|e| {
                matches!(e, AlarmEvent::QueuePushed { alarm_id, kind: RequestKind::Cancel, .. } if *alarm_id == alarm)
            });
            assert!(inserted.unwrap() < expired.unwrap(), "alarm {} expired before inserted", n);
            assert!(cancelled.unwrap() < notice.unwrap(), "alarm {} notice before cancel", n);
        }
    }

    #[test]
    fn test_submit_after_shutdown() {
        let scheduler = Scheduler::new(EventBus::new());
        scheduler.shutdown();
        assert!(matches!(
            scheduler.submit(start_at(1, 1, now())),
            Err(AlarmError::ShuttingDown)
        ));
    }

    #[test]
    fn test_dispatch_order_follows_expiration() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(4));

        // Both already due; B expires earlier even though A was submitted first
        let past = now() - ChronoDuration::seconds(10);
        scheduler.submit(start_at(1, 5, past)).unwrap();
        scheduler.submit(start_at(2, 2, past)).unwrap();

        let dispatcher = spawn_dispatcher(&scheduler, &queue);
        let first = queue.pop().unwrap().1;
        let second = queue.pop().unwrap().1;
        assert_eq!(first.id, id(2));
        assert_eq!(second.id, id(1));

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();
    }

    #[test]
    fn test_dispatch_order_when_earlier_submitted_first() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(4));

        let past = now() - ChronoDuration::seconds(10);
        scheduler.submit(start_at(2, 2, past)).unwrap();
        scheduler.submit(start_at(1, 5, past)).unwrap();

        let dispatcher = spawn_dispatcher(&scheduler, &queue);
        assert_eq!(queue.pop().unwrap().1.id, id(2));
        assert_eq!(queue.pop().unwrap().1.id, id(1));

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();
    }

    #[test]
    fn test_early_wake_for_earlier_insertion() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(4));
        let dispatcher = spawn_dispatcher(&scheduler, &queue);

        let at = now();
        let a = start_at(1, 3, at);
        let a_deadline = a.expires_at;
        scheduler.submit(a).unwrap();

        // Dispatcher is blocked on A's deadline
        assert!(wait_until(Duration::from_secs(2), || {
            scheduler.is_dispatching() && scheduler.wait_sentinel() == WaitSentinel::Waiting(a_deadline)
        }));

        scheduler.submit(start_at(2, 1, at)).unwrap();

        let (_, first) = queue.pop().unwrap();
        assert_eq!(first.id, id(2));
        assert!(Utc::now() < a_deadline, "A must not be delivered with B");

        let (_, second) = queue.pop().unwrap();
        assert_eq!(second.id, id(1));
        assert!(Utc::now() >= a_deadline, "A delivered at its own deadline");

        // Nothing duplicated
        thread::sleep(Duration::from_millis(100));
        assert!(queue.is_empty());
        assert_eq!(scheduler.stats().total_dispatched, 2);

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();
    }

    #[test]
    fn test_cancel_notice_is_forwarded() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(4));
        scheduler.submit(start_at(1, 60, now())).unwrap();
        let dispatcher = spawn_dispatcher(&scheduler, &queue);

        assert_eq!(scheduler.cancel(id(1)), 1);
        let (_, notice) = queue.pop().unwrap();
        assert_eq!(notice.kind, RequestKind::Cancel);
        assert_eq!(notice.id, id(1));
        assert!(scheduler.is_empty());

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();
    }

    #[test]
    fn test_single_dispatcher() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(4));
        let dispatcher = spawn_dispatcher(&scheduler, &queue);

        assert!(wait_until(Duration::from_secs(2), || scheduler.is_dispatching()));
        assert!(matches!(scheduler.run(&queue), Err(AlarmError::DispatcherRunning)));

        scheduler.shutdown();
        dispatcher.join().unwrap().unwrap();
        assert!(!scheduler.is_dispatching());
    }

    #[test]
    fn test_dispatcher_stops_when_queue_closes() {
        let scheduler = Arc::new(Scheduler::new(EventBus::new()));
        let queue = Arc::new(HandoffQueue::new(1));
        let past = now() - ChronoDuration::seconds(5);
        scheduler.submit(start_at(1, 0, past)).unwrap();
        scheduler.submit(start_at(2, 0, past)).unwrap();

        let dispatcher = spawn_dispatcher(&scheduler, &queue);
        // Second push blocks on the full queue until it closes
        assert!(wait_until(Duration::from_secs(2), || scheduler.is_empty() && queue.len() == 1));
        queue.close();
        dispatcher.join().unwrap().unwrap();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Start(u32, u64),
        Change(u32, u64),
        Cancel(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..8, 0u64..30).prop_map(|(i, s)| Op::Start(i, s)),
            (1u32..8, 0u64..30).prop_map(|(i, s)| Op::Change(i, s)),
            (1u32..8).prop_map(Op::Cancel),
        ]
    }

    proptest! {
        #[test]
        fn prop_wait_list_sorted_and_unique(ops in proptest::collection::vec(op(), 0..60)) {
            let scheduler = Scheduler::new(EventBus::new());
            let at = now();
            for op in ops {
                let _ = match op {
                    Op::Start(i, s) => scheduler.submit(start_at(i, s, at)),
                    Op::Change(i, s) => scheduler.submit(change_at(i, s, at)),
                    Op::Cancel(i) => scheduler.submit(AlarmRequest::cancel(id(i))),
                };

                let snapshot = scheduler.snapshot();
                prop_assert!(snapshot.windows(2).all(|w| w[0].expires_at <= w[1].expires_at));

                let mut ids: Vec<u32> = snapshot.iter().map(|r| r.id.get()).collect();
                ids.sort_unstable();
                let before = ids.len();
                ids.dedup();
                prop_assert_eq!(before, ids.len());
            }
        }
    }
}
