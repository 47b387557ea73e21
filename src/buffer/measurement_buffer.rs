use super::BufferError;
use crate::domain::{Measurement, ReportBatch};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

/// Bounded FIFO of measurements shared by the sampling and flush tasks.
///
/// Every operation takes the same lock, so `append` from the sampler and
/// `snapshot_and_hold` from the flusher observe a single consistent order.
/// When full, the oldest entry is evicted to make room for the newest.
#[derive(Debug)]
pub struct MeasurementBuffer {
    capacity: usize,
    inner: Mutex<BufferInner>,
}

#[derive(Debug)]
struct BufferInner {
    entries: VecDeque<Measurement>,
    /// Sequence number of `entries[0]`; increases by one per removed entry.
    head_seq: u64,
    evicted_total: u64,
}

/// Entries observed by `snapshot_and_hold`, plus the position they end at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    measurements: Vec<Measurement>,
    end_seq: u64,
}

impl BufferSnapshot {
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn to_batch(&self) -> ReportBatch {
        ReportBatch::new(self.measurements.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    pub evicted_total: u64,
}

impl MeasurementBuffer {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity { capacity });
        }

        Ok(Self {
            capacity,
            inner: Mutex::new(BufferInner {
                entries: VecDeque::with_capacity(capacity),
                head_seq: 0,
                evicted_total: 0,
            }),
        })
    }

    /// Adds to the tail. Returns the evicted entry if the buffer was full.
    pub fn append(&self, measurement: Measurement) -> Option<Measurement> {
        let mut inner = self.inner.lock();

        let evicted = if inner.entries.len() >= self.capacity {
            let oldest = inner.entries.pop_front();
            inner.head_seq += 1;
            inner.evicted_total += 1;
            oldest
        } else {
            None
        };

        inner.entries.push_back(measurement);
        evicted
    }

    /// Copies the current sequence without removing anything.
    pub fn snapshot_and_hold(&self) -> BufferSnapshot {
        let inner = self.inner.lock();
        BufferSnapshot {
            measurements: inner.entries.iter().copied().collect(),
            end_seq: inner.head_seq + inner.entries.len() as u64,
        }
    }

    /// Removes the first `n` entries (or all of them if fewer remain).
    /// Returns how many were removed.
    pub fn clear_through(&self, n: usize) -> usize {
        let mut inner = self.inner.lock();
        Self::clear_front(&mut inner, n)
    }

    /// Removes exactly the entries covered by `snapshot`.
    ///
    /// Entries evicted between the snapshot and this call are no longer at
    /// the front, so the count to remove is derived from sequence positions
    /// rather than from `snapshot.len()`. Measurements appended after the
    /// snapshot are never removed.
    pub fn release(&self, snapshot: &BufferSnapshot) -> usize {
        let mut inner = self.inner.lock();
        let covered = snapshot.end_seq.saturating_sub(inner.head_seq) as usize;
        let removed = Self::clear_front(&mut inner, covered);

        debug!(
            snapshot_len = snapshot.len(),
            removed,
            remaining = inner.entries.len(),
            "Released reported measurements"
        );
        removed
    }

    fn clear_front(inner: &mut BufferInner, n: usize) -> usize {
        let count = n.min(inner.entries.len());
        inner.entries.drain(..count);
        inner.head_seq += count as u64;
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock();
        BufferStats {
            len: inner.entries.len(),
            capacity: self.capacity,
            evicted_total: inner.evicted_total,
        }
    }
}
