//! Bounded rolling buffer for one telemetry stream
//!
//! A stream holds the samples of a single device/source id in arrival order
//! with a hard capacity limit. Arrival order is deliberately not timestamp
//! order: the transport does not guarantee monotonic timestamps, and the
//! buffer preserves whatever order the caller fed in.

use crate::telemetry::Sample;
use std::collections::VecDeque;

/// Default maximum number of samples retained per stream
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded ordered sequence of samples for one stream
///
/// Invariant: `len() <= capacity`. When an append would exceed the capacity,
/// the oldest entries are evicted from the front (FIFO) until the invariant
/// holds again.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StreamBuffer {
    /// Create an empty buffer with the given capacity
    ///
    /// A zero capacity is clamped to 1 so that the buffer always retains at
    /// least the latest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting from the front if the capacity is exceeded
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Configured maximum length
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recently appended sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate over samples in arrival order (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Cloned snapshot of the samples in arrival order
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    /// The last `n` samples in arrival order (fewer if the stream is shorter)
    pub fn tail(&self, n: usize) -> Vec<&Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).collect()
    }
}
