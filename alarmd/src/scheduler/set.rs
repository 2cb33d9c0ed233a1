//! Time-ordered wait list

use std::collections::VecDeque;

use crate::domain::{AlarmId, AlarmRequest};

/// Pending requests, ascending by `expires_at`, ties in insertion order
#[derive(Debug, Default, Clone)]
pub struct ScheduledSet {
    entries: VecDeque<AlarmRequest>,
}

impl ScheduledSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every entry expiring at or before this one
    ///
    /// Returns the position the request landed at.
    pub fn insert(&mut self, request: AlarmRequest) -> usize {
        let position = self.entries.partition_point(|e| e.expires_at <= request.expires_at);
        self.entries.insert(position, request);
        position
    }

    /// Remove every entry with `id`, returning how many were removed
    pub fn remove_id(&mut self, id: AlarmId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before - self.entries.len()
    }

    pub fn contains_id(&self, id: AlarmId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Earliest entry
    pub fn head(&self) -> Option<&AlarmRequest> {
        self.entries.front()
    }

    pub fn pop_head(&mut self) -> Option<AlarmRequest> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlarmRequest> {
        self.entries.iter()
    }

    /// Check the ordering invariant
    pub fn is_sorted(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.expires_at <= b.expires_at)
    }
}
