//! Display board: the display list plus its per-bucket worker pool
//!
//! The list and the pool share one lock. Each worker owns one expiration
//! bucket; the consumer applies requests, then reconciles the pool so every
//! non-empty bucket has exactly one live worker.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::domain::{AlarmId, AlarmRequest, DisplayRecord, RequestKind, Timestamp};
use crate::error::fatal;
use crate::events::{AlarmEvent, EventBus, RemovalReason};

use super::list::DisplayList;
use super::worker::{WorkerId, WorkerState, display_period};

/// Bookkeeping for one worker thread, live or retiring
struct WorkerEntry {
    bucket: Timestamp,
    state: WorkerState,
    /// Wakes this worker for retirement or shutdown
    signal: Arc<Condvar>,
    handle: Option<JoinHandle<()>>,
}

struct BoardInner {
    records: DisplayList,

    /// Bucket -> the one live worker displaying it
    live: BTreeMap<Timestamp, WorkerId>,

    /// Every worker not yet joined
    workers: HashMap<WorkerId, WorkerEntry>,

    next_worker_id: u64,
    shutdown: bool,
}

impl BoardInner {
    fn is_live(&self, bucket: Timestamp, id: WorkerId) -> bool {
        !self.shutdown && self.live.get(&bucket) == Some(&id)
    }

    fn transition(&mut self, id: WorkerId, next: WorkerState) {
        let Some(entry) = self.workers.get_mut(&id) else {
            fatal("display worker lifecycle", format!("unknown worker {}", id));
        };
        match entry.state.advance(id, next) {
            Ok(state) => entry.state = state,
            Err(e) => fatal("display worker lifecycle", e),
        }
    }

    /// Detach the live worker of `bucket` and wake it so it can exit
    fn retire(&mut self, bucket: Timestamp) {
        if let Some(id) = self.live.remove(&bucket)
            && let Some(entry) = self.workers.get(&id)
        {
            debug!(worker = %id, %bucket, "BoardInner::retire: signalling worker");
            entry.signal.notify_all();
        }
    }

    /// Remove terminated workers whose threads have finished
    fn take_finished(&mut self) -> Vec<JoinHandle<()>> {
        let done: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|(_, e)| e.state.is_terminated() && e.handle.as_ref().is_none_or(|h| h.is_finished()))
            .map(|(id, _)| *id)
            .collect();
        done.into_iter()
            .filter_map(|id| self.workers.remove(&id).and_then(|e| e.handle))
            .collect()
    }
}

/// Shared display list and worker pool
pub struct DisplayBoard {
    inner: Mutex<BoardInner>,
    poll_interval: Duration,
    events: EventBus,
}

impl DisplayBoard {
    /// Create an empty board; `poll_interval` caps the gap between display passes
    pub fn new(poll_interval: Duration, events: EventBus) -> Self {
        debug!(?poll_interval, "DisplayBoard::new: called");
        Self {
            inner: Mutex::new(BoardInner {
                records: DisplayList::new(),
                live: BTreeMap::new(),
                workers: HashMap::new(),
                next_worker_id: 1,
                shutdown: false,
            }),
            poll_interval,
            events,
        }
    }

    /// Apply one dispatched request to the list, then reconcile workers
    ///
    /// Events are emitted under the board lock, so a worker's output for a
    /// record is always logged after the record itself.
    pub fn apply(self: &Arc<Self>, request: AlarmRequest) {
        debug!(id = %request.id, kind = ?request.kind, "DisplayBoard::apply: called");
        let mut inner = self.inner.lock();
        if inner.shutdown {
            debug!(id = %request.id, "DisplayBoard::apply: shut down, dropping request");
            return;
        }

        let id = request.id;
        match request.kind {
            RequestKind::Start => {
                for replaced in inner.records.remove_id(id) {
                    warn!(%id, "DisplayBoard::apply: start for displayed id, replacing record");
                    self.events.emit(AlarmEvent::RecordRemoved {
                        alarm_id: replaced.id,
                        reason: RemovalReason::Replaced,
                    });
                }
                self.events.emit(record_event(&request, false));
                inner.records.insert(DisplayRecord::from(&request));
            }
            RequestKind::Change => {
                let updated = inner.records.update(&request);
                if !updated {
                    debug!(%id, "DisplayBoard::apply: change for unknown id, inserting");
                    inner.records.insert(DisplayRecord::from(&request));
                }
                self.events.emit(record_event(&request, updated));
            }
            RequestKind::Cancel => {
                for removed in inner.records.remove_id(id) {
                    self.events.emit(AlarmEvent::RecordRemoved {
                        alarm_id: removed.id,
                        reason: RemovalReason::Cancelled,
                    });
                }
            }
        }

        self.reconcile(&mut inner);
        let finished = inner.take_finished();
        drop(inner);

        for handle in finished {
            join_worker(handle);
        }
    }

    /// Retire workers of empty buckets, start workers for uncovered ones
    fn reconcile(self: &Arc<Self>, inner: &mut BoardInner) {
        let buckets = inner.records.buckets();

        let stale: Vec<Timestamp> = inner.live.keys().filter(|b| !buckets.contains(*b)).copied().collect();
        for bucket in stale {
            inner.retire(bucket);
        }

        for bucket in buckets {
            if !inner.live.contains_key(&bucket) {
                let id = self.spawn_worker(inner, bucket);
                self.events.emit(AlarmEvent::WorkerCreated { worker_id: id, bucket });
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, inner: &mut BoardInner, bucket: Timestamp) -> WorkerId {
        let id = WorkerId::new(inner.next_worker_id);
        inner.next_worker_id += 1;

        let signal = Arc::new(Condvar::new());
        inner.workers.insert(
            id,
            WorkerEntry {
                bucket,
                state: WorkerState::Created,
                signal: signal.clone(),
                handle: None,
            },
        );
        inner.live.insert(bucket, id);

        // The new thread blocks on our lock until the caller releases it
        let board = self.clone();
        let handle = thread::Builder::new()
            .name(format!("display-{}", id))
            .spawn(move || board.run_worker(id, bucket, signal))
            .unwrap_or_else(|e| fatal("spawn display worker", e));

        if let Some(entry) = inner.workers.get_mut(&id) {
            entry.handle = Some(handle);
        }
        debug!(worker = %id, %bucket, "DisplayBoard::spawn_worker: started");
        id
    }

    /// Body of a display worker thread
    fn run_worker(&self, id: WorkerId, bucket: Timestamp, signal: Arc<Condvar>) {
        let mut inner = self.inner.lock();
        inner.transition(id, WorkerState::Running);
        debug!(worker = %id, %bucket, "DisplayBoard::run_worker: running");

        let mut next_pass = Instant::now();
        while inner.is_live(bucket, id) {
            if let Ok(until) = (bucket - Utc::now()).to_std()
                && !until.is_zero()
            {
                signal.wait_until(&mut inner, Instant::now() + until);
                continue;
            }
            if Instant::now() < next_pass {
                signal.wait_until(&mut inner, next_pass);
                continue;
            }

            let period = self.display_pass(&mut inner, id, bucket);
            next_pass = Instant::now() + period;
        }

        inner.transition(id, WorkerState::Terminating);
        inner.transition(id, WorkerState::Terminated);
        self.events.emit(AlarmEvent::WorkerTerminated { worker_id: id, bucket });
        debug!(worker = %id, %bucket, "DisplayBoard::run_worker: terminated");
    }

    /// Show every record of `bucket` once and drop the one-shot ones
    ///
    /// Returns the time until the next pass.
    fn display_pass(&self, inner: &mut BoardInner, id: WorkerId, bucket: Timestamp) -> Duration {
        let shown: Vec<DisplayRecord> = inner.records.bucket(bucket).cloned().collect();
        for record in &shown {
            self.events.emit(AlarmEvent::AlarmDisplayed {
                alarm_id: record.id,
                worker_id: id,
                interval_secs: record.interval_secs,
                message: record.message.clone(),
            });
            if record.is_one_shot() {
                for expired in inner.records.remove_id(record.id) {
                    self.events.emit(AlarmEvent::RecordRemoved {
                        alarm_id: expired.id,
                        reason: RemovalReason::Expired,
                    });
                }
            }
        }
        if inner.records.bucket(bucket).next().is_none() {
            inner.retire(bucket);
        }

        display_period(&shown, self.poll_interval)
    }

    /// Stop every worker and wait for them to exit
    pub fn shutdown(&self) {
        debug!("DisplayBoard::shutdown: called");
        let handles: Vec<JoinHandle<()>> = {
            let mut inner = self.inner.lock();
            inner.shutdown = true;
            inner.live.clear();
            for entry in inner.workers.values() {
                entry.signal.notify_all();
            }
            inner.workers.values_mut().filter_map(|e| e.handle.take()).collect()
        };

        let count = handles.len();
        for handle in handles {
            join_worker(handle);
        }
        self.inner.lock().workers.clear();
        info!(workers = count, "DisplayBoard::shutdown: all workers joined");
    }

    /// Copy of the display list in expiration order
    pub fn records(&self) -> Vec<DisplayRecord> {
        self.inner.lock().records.iter().cloned().collect()
    }

    pub fn contains(&self, id: AlarmId) -> bool {
        self.inner.lock().records.contains(id)
    }

    /// Bucket -> live worker
    pub fn live_workers(&self) -> BTreeMap<Timestamp, WorkerId> {
        self.inner.lock().live.clone()
    }

    /// Lifecycle state of a worker that has not been joined yet
    pub fn worker_state(&self, id: WorkerId) -> Option<WorkerState> {
        self.inner.lock().workers.get(&id).map(|e| e.state)
    }

    /// Bucket a not-yet-joined worker was started for
    pub fn worker_bucket(&self, id: WorkerId) -> Option<Timestamp> {
        self.inner.lock().workers.get(&id).map(|e| e.bucket)
    }
}

/// A panicked worker may have left the board half-updated
fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        fatal("display worker", "thread panicked");
    }
}

fn record_event(request: &AlarmRequest, updated: bool) -> AlarmEvent {
    let alarm_id = request.id;
    let interval_secs = request.interval_secs;
    let expires_at = request.expires_at;
    let message = request.message.clone();
    if updated {
        AlarmEvent::RecordUpdated {
            alarm_id,
            interval_secs,
            expires_at,
            message,
        }
    } else {
        AlarmEvent::RecordInserted {
            alarm_id,
            interval_secs,
            expires_at,
            message,
        }
    }
}
