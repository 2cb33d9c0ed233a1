//! Display list: active alarm records in expiration order

use std::collections::BTreeSet;

use crate::domain::{AlarmId, AlarmRequest, DisplayRecord, Timestamp};

/// Records ascending by `expires_at`, ties in insertion order
#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    records: Vec<DisplayRecord>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: DisplayRecord) {
        let position = self.records.partition_point(|r| r.expires_at <= record.expires_at);
        self.records.insert(position, record);
    }

    /// Overwrite the record for `request.id`, moving it if its expiration changed
    ///
    /// Returns false when no record has that id.
    pub fn update(&mut self, request: &AlarmRequest) -> bool {
        let Some(index) = self.records.iter().position(|r| r.id == request.id) else {
            return false;
        };
        if self.records[index].expires_at == request.expires_at {
            self.records[index].update_from(request);
        } else {
            let mut record = self.records.remove(index);
            record.update_from(request);
            self.insert(record);
        }
        true
    }

    /// Remove every record with `id`
    pub fn remove_id(&mut self, id: AlarmId) -> Vec<DisplayRecord> {
        let (removed, kept) = std::mem::take(&mut self.records).into_iter().partition(|r| r.id == id);
        self.records = kept;
        removed
    }

    pub fn get(&self, id: AlarmId) -> Option<&DisplayRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: AlarmId) -> bool {
        self.get(id).is_some()
    }

    /// Records sharing exactly this expiration time
    pub fn bucket(&self, expires_at: Timestamp) -> impl Iterator<Item = &DisplayRecord> {
        self.records.iter().filter(move |r| r.expires_at == expires_at)
    }

    /// Distinct expiration times present
    pub fn buckets(&self) -> BTreeSet<Timestamp> {
        self.records.iter().map(|r| r.expires_at).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
