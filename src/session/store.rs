//! Bounded store of recent readings

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::types::Reading;

/// Default number of readings kept for display and export
pub const DEFAULT_SAMPLE_CAPACITY: usize = 100;

/// Store shared between the session (single writer) and the UI (snapshots)
pub type SharedSampleStore = Arc<RwLock<SampleStore>>;

/// Create a shared store with the given capacity
pub fn share_sample_store(capacity: usize) -> SharedSampleStore {
    Arc::new(RwLock::new(SampleStore::with_capacity(capacity)))
}

/// Ordered, capacity-bounded buffer of readings.
///
/// Appending past capacity evicts the oldest reading. Order is always
/// arrival order.
#[derive(Debug, Clone)]
pub struct SampleStore {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SAMPLE_CAPACITY)
    }
}

impl SampleStore {
    /// Create a store holding at most `capacity` readings (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Append a reading, evicting the oldest if full.
    ///
    /// Returns the evicted reading, if any.
    pub fn append(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.readings.len() >= self.capacity {
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        evicted
    }

    /// Owned copy of the current contents, oldest first.
    ///
    /// Later appends or clears do not affect the returned vector.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    /// The newest `n` readings, oldest first
    pub fn tail(&self, n: usize) -> Vec<Reading> {
        let skip = self.readings.len().saturating_sub(n);
        self.readings.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
