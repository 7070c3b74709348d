//! Cache-line padded atomic sequence counter
//!
//! This is the single coordination primitive the rest of the core is built
//! from: sequencer cursors, consumer cursors, and gating sequences are all a
//! `Sequence`. Padding on both sides of the atomic prevents false sharing
//! with whatever field happens to land on the same cache line in an
//! embedding struct.

use std::sync::atomic::{AtomicI64, Ordering};

/// Initial value of a freshly constructed sequence, per spec: "Initial value -1".
pub const INITIAL_VALUE: i64 = -1;

/// A cache-line padded atomic 64-bit signed counter.
///
/// 128 bytes of alignment (rather than a single 64-byte cache line) follows
/// the teacher's padding convention, which accounts for CPUs that prefetch
/// two adjacent cache lines together.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
}

impl Sequence {
    /// Create a new sequence with the given initial value.
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
        }
    }

    /// Plain relaxed load — for single-writer-thread reads of its own sequence.
    #[inline(always)]
    pub fn get_relaxed(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Acquire load — for cross-thread reads that must observe a prior release.
    #[inline(always)]
    pub fn get_acquire(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Plain relaxed store — for single-writer-thread updates not yet published.
    #[inline(always)]
    pub fn set_relaxed(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Release store — publishes prior writes to any thread that acquire-loads
    /// this sequence afterwards.
    #[inline(always)]
    pub fn set_release(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Volatile store followed by a store-load fence.
    ///
    /// Used where a thread must publish a value *and* then observe another
    /// counter whose updater used a release store — draining the store
    /// buffer so the subsequent read cannot be reordered ahead of this store.
    #[inline(always)]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
        std::sync::atomic::fence(Ordering::SeqCst);
    }

    /// Compare-and-swap; returns the previous value on success.
    #[inline(always)]
    pub fn compare_and_swap(&self, expected: i64, new: i64) -> std::result::Result<i64, i64> {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Atomically add `delta` and return the value *before* the add.
    #[inline(always)]
    pub fn fetch_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel)
    }

    /// Atomically add `delta` and return the value *after* the add.
    #[inline(always)]
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.fetch_and_add(delta) + delta
    }

    /// Atomically add `delta` and return the value *before* the add (alias
    /// kept for readability at call sites that want "get, then add").
    #[inline(always)]
    pub fn get_and_add(&self, delta: i64) -> i64 {
        self.fetch_and_add(delta)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get_acquire())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_minus_one() {
        let seq = Sequence::default();
        assert_eq!(seq.get_relaxed(), -1);
    }

    #[test]
    fn release_acquire_round_trips() {
        let seq = Sequence::new(0);
        seq.set_release(42);
        assert_eq!(seq.get_acquire(), 42);
    }

    #[test]
    fn fetch_and_add_returns_previous_value() {
        let seq = Sequence::new(10);
        let prev = seq.fetch_and_add(5);
        assert_eq!(prev, 10);
        assert_eq!(seq.get_relaxed(), 15);
    }

    #[test]
    fn add_and_get_returns_new_value() {
        let seq = Sequence::new(10);
        assert_eq!(seq.add_and_get(5), 15);
    }

    #[test]
    fn compare_and_swap_succeeds_on_match() {
        let seq = Sequence::new(1);
        assert_eq!(seq.compare_and_swap(1, 2), Ok(1));
        assert_eq!(seq.get_relaxed(), 2);
    }

    #[test]
    fn compare_and_swap_fails_on_mismatch() {
        let seq = Sequence::new(1);
        assert_eq!(seq.compare_and_swap(99, 2), Err(1));
        assert_eq!(seq.get_relaxed(), 1);
    }
}
