//! Pre-allocated, power-of-two-sized ring buffer storage
//!
//! The ring buffer owns exactly one thing: a fixed array of event slots,
//! addressed by sequence number modulo capacity. It has no notion of
//! producers, consumers, or publication — those live in `sequencer` and
//! `barrier`. Slot access is `unsafe` because exclusivity during the
//! claim-to-publish window is a protocol enforced by the sequencer, not by
//! the type system; every caller in this crate honors that protocol.

use std::cell::UnsafeCell;

use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::handler::EventFactory;

/// Fixed-capacity, pre-allocated storage for ring buffer entries.
///
/// `N` (the capacity) must be a positive power of two so that
/// `sequence & index_mask` is equivalent to `sequence % N` (spec.md §3).
pub struct RingBuffer<E> {
    entries: Box<[UnsafeCell<E>]>,
    index_mask: usize,
    index_shift: u32,
}

// SAFETY: access to individual slots is synchronized by the claim/publish
// protocol implemented in `sequencer` and `barrier`, never by locking the
// buffer itself. The buffer is never reallocated after construction.
unsafe impl<E: Send> Send for RingBuffer<E> {}
unsafe impl<E: Send> Sync for RingBuffer<E> {}

impl<E> RingBuffer<E> {
    /// Create a new ring buffer of the given power-of-two capacity, filling
    /// every slot via the user-supplied event factory (spec.md §6), called
    /// `capacity` times.
    pub fn new(capacity: usize, factory: impl EventFactory<E>) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(DisruptorError::config("ring buffer capacity must be a power of 2 greater than zero"));
        }

        let entries = (0..capacity)
            .map(|_| UnsafeCell::new(factory.new_instance()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            entries,
            index_mask: capacity - 1,
            index_shift: capacity.ilog2(),
        })
    }

    /// Buffer capacity (always a power of two).
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// `log2(capacity)`; the shift used to derive the availability lap number
    /// in the multi-producer sequencer (spec.md §4.4).
    #[inline(always)]
    pub fn index_shift(&self) -> u32 {
        self.index_shift
    }

    /// Bitmask equivalent to `capacity - 1`.
    #[inline(always)]
    pub fn index_mask(&self) -> usize {
        self.index_mask
    }

    #[inline(always)]
    fn index_of(&self, sequence: i64) -> usize {
        (sequence as usize) & self.index_mask
    }

    /// Borrow the slot for `sequence` immutably.
    ///
    /// # Safety
    /// The caller must ensure the slot has been published (the producer's
    /// cursor/availability entry for `sequence` is visible) before reading;
    /// otherwise the read races with the producer's write.
    #[inline(always)]
    pub unsafe fn get(&self, sequence: i64) -> &E {
        &*self.entries[self.index_of(sequence)].get()
    }

    /// Borrow the slot for `sequence` mutably.
    ///
    /// # Safety
    /// The caller must hold an exclusive claim on `sequence` (returned by a
    /// sequencer's `next`/`try_next`) and must not have published it yet;
    /// otherwise this races with a concurrent reader or another claimant.
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut E {
        &mut *self.entries[self.index_of(sequence)].get()
    }
}
