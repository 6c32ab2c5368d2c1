use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::adaptive::types::AttemptRecord;

/// Append-only attempt history capped at `capacity`, oldest dropped first.
///
/// Readers take a snapshot (`Arc` clone) and never observe a partial append;
/// writers copy on write when a snapshot is still alive.
pub struct AttemptLog {
    capacity: usize,
    records: RwLock<Arc<VecDeque<AttemptRecord>>>,
}

impl AttemptLog {
    pub fn new(capacity: usize) -> Self {
        Self::with_records(capacity, Vec::new())
    }

    /// Seeds the log, keeping only the most recent `capacity` records.
    pub fn with_records(capacity: usize, records: Vec<AttemptRecord>) -> Self {
        let capacity = capacity.max(1);
        let skip = records.len().saturating_sub(capacity);
        let records: VecDeque<AttemptRecord> = records.into_iter().skip(skip).collect();
        Self {
            capacity,
            records: RwLock::new(Arc::new(records)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, record: AttemptRecord) {
        let mut guard = self.records.write();
        let records = Arc::make_mut(&mut guard);
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn snapshot(&self) -> Arc<VecDeque<AttemptRecord>> {
        Arc::clone(&self.records.read())
    }

    pub fn to_vec(&self) -> Vec<AttemptRecord> {
        self.snapshot().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.records.write() = Arc::new(VecDeque::new());
    }
}
