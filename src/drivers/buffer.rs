use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};
use log::trace;
use crate::drivers::ScopeError;
/// Ring size used when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 20_000;
/// One decoded amplitude and the microsecond it was captured at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub value: u16,
    pub timestamp_us: u64,
}
/// Fixed-capacity circular store of samples with overwrite-oldest eviction.
///
/// `head` is the oldest retained sample and `tail` the next write slot. One
/// slot is always left unused so that `head == tail` means empty, which caps
/// the live count at `capacity - 1`.
#[derive(Clone, Debug)]
pub struct SampleRing {
    values: Vec<u16>,
    timestamps: Vec<u64>, // non-decreasing from head to tail
    head: usize,
    tail: usize,
}
impl SampleRing {
    pub fn with_capacity(capacity: usize) -> Result<Self, ScopeError> {
        if capacity < 2 {
            return Err(ScopeError::InvalidCapacity(capacity));
        }
        Ok(Self {
            values: vec![0; capacity],
            timestamps: vec![0; capacity],
            head: 0,
            tail: 0,
        })
    }
    pub fn capacity(&self) -> usize {
        self.values.len()
    }
    pub fn head(&self) -> usize {
        self.head
    }
    pub fn tail(&self) -> usize {
        self.tail
    }
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }
    pub fn len(&self) -> usize {
        self.snapshot_range(self.tail)
    }
    /// Writes at `tail`; evicts the oldest sample when the ring is full.
    pub fn push(&mut self, value: u16, timestamp_us: u64) {
        self.values[self.tail] = value;
        self.timestamps[self.tail] = timestamp_us;
        self.tail = self.next_index(self.tail);
        if self.tail == self.head {
            self.head = self.next_index(self.head);
        }
    }
    /// Number of live samples between `head` (inclusive) and `end` (exclusive),
    /// walking forward around the ring.
    pub fn snapshot_range(&self, end: usize) -> usize {
        let capacity = self.capacity();
        (end + capacity - self.head) % capacity
    }
    pub fn next_index(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.capacity() {
            0
        } else {
            next
        }
    }
    pub fn sample(&self, index: usize) -> Sample {
        Sample {
            value: self.values[index],
            timestamp_us: self.timestamps[index],
        }
    }
    pub fn timestamp(&self, index: usize) -> u64 {
        self.timestamps[index]
    }
    /// Samples from `start` up to, not including, `end`.
    pub fn iter_range(&self, start: usize, end: usize) -> impl Iterator<Item = Sample> + '_ {
        let mut index = start;
        std::iter::from_fn(move || {
            if index == end {
                return None;
            }
            let sample = self.sample(index);
            index = self.next_index(index);
            Some(sample)
        })
    }
    /// Drops everything before `end`; the render side calls this after drawing.
    pub fn consume_to(&mut self, end: usize) {
        debug_assert!(end < self.capacity());
        self.head = end;
    }
}
/// Ring shared between the ingest and render threads.
///
/// The mutex plays the advisory busy flag: the producer only ever calls
/// `try_lock` and drops the sample when the render side holds the ring, so
/// ingest never blocks on rendering.
pub struct SharedRing {
    ring: Mutex<SampleRing>,
    dropped: AtomicU64,
}
impl SharedRing {
    pub fn new(ring: SampleRing) -> Self {
        Self {
            ring: Mutex::new(ring),
            dropped: AtomicU64::new(0),
        }
    }
    /// Pushes unless the ring is busy. Returns whether the sample was stored.
    pub fn offer(&self, value: u16, timestamp_us: u64) -> bool {
        match self.ring.try_lock() {
            Ok(mut ring) => {
                ring.push(value, timestamp_us);
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().push(value, timestamp_us);
                true
            }
            Err(TryLockError::WouldBlock) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("ring busy, dropped sample {value} ({dropped} total)");
                false
            }
        }
    }
    /// Runs `f` with exclusive access; pushes arriving meanwhile are dropped.
    pub fn with_ring<R>(&self, f: impl FnOnce(&mut SampleRing) -> R) -> R {
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ring)
    }
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
