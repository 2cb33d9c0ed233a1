//! Fixed-capacity ring buffer with blocking push/pop

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{AlarmError, fatal};

/// Default number of slots
pub const DEFAULT_CAPACITY: usize = 4;

/// Internal state protected by mutex
struct RingState<T> {
    slots: Box<[Option<T>]>,
    insert_at: usize,
    remove_at: usize,
    count: usize,
    closed: bool,
}

/// Bounded FIFO between the dispatch thread and the consumer
///
/// `push` blocks while every slot is full and `pop` blocks while none is, so
/// a slow consumer throttles the producer instead of growing memory.
pub struct HandoffQueue<T> {
    state: Mutex<RingState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> HandoffQueue<T> {
    /// Create a queue with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, "HandoffQueue::new: called");
        Self {
            state: Mutex::new(RingState {
                slots: (0..capacity).map(|_| None).collect(),
                insert_at: 0,
                remove_at: 0,
                count: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Insert at the tail, waiting for a free slot
    ///
    /// Returns the slot index the item was written to.
    pub fn push(&self, item: T) -> Result<usize, AlarmError> {
        self.push_with(item, |_, _| {})
    }

    /// Like [`push`](Self::push), running `on_insert` with the slot index
    /// while the queue lock is still held
    ///
    /// Anything `on_insert` records happens before the matching `pop` returns.
    pub fn push_with<F>(&self, item: T, on_insert: F) -> Result<usize, AlarmError>
    where
        F: FnOnce(usize, &T),
    {
        let mut state = self.state.lock();
        while state.count == self.capacity && !state.closed {
            debug!("HandoffQueue::push: full, waiting");
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(AlarmError::QueueClosed);
        }

        let index = state.insert_at;
        on_insert(index, &item);
        state.slots[index] = Some(item);
        state.insert_at = (index + 1) % self.capacity;
        state.count += 1;
        drop(state);

        self.not_empty.notify_one();
        Ok(index)
    }

    /// Remove from the head, waiting for an item
    ///
    /// Returns the slot index and the item, or `None` once the queue is closed.
    pub fn pop(&self) -> Option<(usize, T)> {
        let mut state = self.state.lock();
        while state.count == 0 && !state.closed {
            self.not_empty.wait(&mut state);
        }
        if state.closed {
            return None;
        }

        let index = state.remove_at;
        let Some(item) = state.slots[index].take() else {
            fatal("HandoffQueue::pop", format!("slot {} empty with count {}", index, state.count));
        };
        state.remove_at = (index + 1) % self.capacity;
        state.count -= 1;
        drop(state);

        self.not_full.notify_one();
        Some((index, item))
    }

    /// Close the queue and wake every waiter
    ///
    /// Pending and future pushes fail; pops return `None`.
    pub fn close(&self) {
        debug!("HandoffQueue::close: called");
        self.state.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
