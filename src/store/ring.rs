//! Fixed-capacity ring buffer shared between probe tasks and readers.

use std::sync::{PoisonError, RwLock};

use super::Sample;

/// Number of samples kept per target.
pub const SAMPLE_CAPACITY: usize = 50;

/// Recent probe history for one target.
pub type SampleStore = RingBuffer<Sample, SAMPLE_CAPACITY>;

#[derive(Debug)]
struct Slots<T, const N: usize> {
    items: [Option<T>; N],
    next: usize,
    wrapped: bool,
}

/// Thread-safe circular buffer holding the `N` most recent items.
///
/// Writers take an exclusive lock for a single slot assignment; readers
/// share a lock and copy the items out in insertion order.
#[derive(Debug)]
pub struct RingBuffer<T, const N: usize> {
    slots: RwLock<Slots<T, N>>,
}

impl<T: Clone, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "ring buffer capacity must be non-zero") };
        Self {
            slots: RwLock::new(Slots {
                items: std::array::from_fn(|_| None),
                next: 0,
                wrapped: false,
            }),
        }
    }

    /// Insert an item, overwriting the oldest once full.
    pub fn add(&self, item: T) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let next = slots.next;
        slots.items[next] = Some(item);
        slots.next = (next + 1) % N;
        if slots.next == 0 {
            slots.wrapped = true;
        }
    }

    /// Snapshot of the stored items, oldest first.
    pub fn get(&self) -> Vec<T> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = Vec::with_capacity(N);
        if slots.wrapped {
            out.extend(slots.items[slots.next..].iter().flatten().cloned());
        }
        out.extend(slots.items[..slots.next].iter().flatten().cloned());
        out
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        if slots.wrapped {
            N
        } else {
            slots.next
        }
    }
}

impl<T: Clone, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
