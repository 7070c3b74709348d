//! Claim/publish protocols for single- and multi-producer access
//!
//! Both variants hand out claims against the same gating invariant
//! (`claimed − min(gating set) ≤ N`) but differ in how they track
//! publication: a single producer can simply advance a cursor, since nobody
//! else races it; concurrent producers may finish claims out of order, so
//! publication visibility is tracked per-slot in an availability buffer
//! (spec.md §4.3, §4.4).

use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use crate::disruptor::availability_buffer::AvailabilityBuffer;
use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::sequence::Sequence;
use crate::disruptor::sequence_group::SequenceGroup;
use crate::disruptor::wait_strategy::WaitStrategy;

/// The read-only view of a sequencer a `SequenceBarrier` needs: its
/// published cursor, and the contiguous-prefix scan used after the wait
/// strategy reports that some cursor has advanced.
pub trait Sequenced: Send + Sync {
    /// The sequencer's cursor (highest published sequence).
    fn cursor(&self) -> &Sequence;

    /// Highest sequence in `[low, available]` for which everything from
    /// `low` onward is actually published (see spec.md §4.3/§4.4).
    fn highest_published(&self, low: i64, available: i64) -> i64;
}

/// Full claim/publish protocol implemented by both sequencer variants.
pub trait Sequencer: Sequenced {
    /// Claim the next `n` sequences, blocking until capacity is available.
    fn next(&self, n: i64) -> Result<i64>;

    /// As `next`, but fails `InsufficientCapacity` instead of blocking.
    fn try_next(&self, n: i64) -> Result<i64>;

    /// Publish a single claimed sequence.
    fn publish(&self, sequence: i64);

    /// Publish every sequence in `[low, high]`.
    fn publish_range(&self, low: i64, high: i64);

    /// Whether `sequence` has been published and not yet overwritten by a
    /// later lap (multi-producer) or is within the single producer's
    /// published window.
    fn is_available(&self, sequence: i64) -> bool;

    /// Administrative cursor reset for buffer priming. Caller-responsible:
    /// behavior when data already exists past the new cursor is undefined.
    fn claim(&self, sequence: i64);

    /// Register consumer cursors this sequencer must not overrun.
    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]);

    /// Deregister every occurrence of a consumer cursor (by identity).
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;
}

fn validate_n(n: i64, capacity: i64) -> Result<()> {
    if n < 1 || n > capacity {
        return Err(DisruptorError::config(format!(
            "claim size must be between 1 and {capacity}, got {n}"
        )));
    }
    Ok(())
}

/// Park duration used while polling the gating set for room. Matches the
/// "1-nanosecond park" spec.md §4.3/§4.4 describe; in practice this floors
/// at the OS scheduler's minimum sleep granularity, which is the intent —
/// a minimal yield, not a precise delay.
const GATING_POLL: Duration = Duration::from_nanos(1);

/// Claim/publish protocol for exactly one producer thread.
///
/// `cursor` doubles as the published sequence; because there is only one
/// writer, claiming and publishing can be almost the same operation, and
/// `highest_published` never finds a gap.
pub struct SingleProducerSequencer {
    capacity: i64,
    cursor: Sequence,
    next_value: Sequence,
    cached_gating: Sequence,
    gating: SequenceGroup,
    wait_strategy: Arc<dyn WaitStrategy>,
    #[cfg(debug_assertions)]
    owner: std::sync::OnceLock<ThreadId>,
}

impl SingleProducerSequencer {
    pub fn new(capacity: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self {
            capacity: capacity as i64,
            cursor: Sequence::default(),
            next_value: Sequence::default(),
            cached_gating: Sequence::default(),
            gating: SequenceGroup::new(),
            wait_strategy,
            #[cfg(debug_assertions)]
            owner: std::sync::OnceLock::new(),
        }
    }

    #[cfg(debug_assertions)]
    fn assert_single_owner(&self) {
        let current = std::thread::current().id();
        let owner = self.owner.get_or_init(|| current);
        assert_eq!(
            *owner, current,
            "SingleProducerSequencer::next called from more than one thread"
        );
    }
}

impl Sequenced for SingleProducerSequencer {
    fn cursor(&self) -> &Sequence {
        &self.cursor
    }

    fn highest_published(&self, _low: i64, available: i64) -> i64 {
        available
    }
}

impl Sequencer for SingleProducerSequencer {
    fn next(&self, n: i64) -> Result<i64> {
        #[cfg(debug_assertions)]
        self.assert_single_owner();
        validate_n(n, self.capacity)?;

        let current = self.next_value.get_relaxed();
        let next_seq = current + n;
        let wrap = next_seq - self.capacity;
        let cached = self.cached_gating.get_relaxed();

        if wrap > cached || cached > current {
            self.cursor.set_volatile(current);
            loop {
                let min = self.gating.minimum(i64::MAX);
                if wrap <= min {
                    self.cached_gating.set_relaxed(min);
                    break;
                }
                std::thread::sleep(GATING_POLL);
            }
        }

        self.next_value.set_relaxed(next_seq);
        Ok(next_seq)
    }

    fn try_next(&self, n: i64) -> Result<i64> {
        #[cfg(debug_assertions)]
        self.assert_single_owner();
        validate_n(n, self.capacity)?;

        let current = self.next_value.get_relaxed();
        let next_seq = current + n;
        let wrap = next_seq - self.capacity;
        let cached = self.cached_gating.get_relaxed();

        if wrap > cached || cached > current {
            let min = self.gating.minimum(i64::MAX);
            if wrap > min {
                return Err(DisruptorError::InsufficientCapacity { requested: n as usize });
            }
            self.cached_gating.set_relaxed(min);
        }

        self.next_value.set_relaxed(next_seq);
        Ok(next_seq)
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set_release(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _low: i64, high: i64) {
        self.publish(high);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let cursor = self.cursor.get_acquire();
        sequence <= cursor && sequence > cursor - self.capacity
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set_release(sequence);
    }

    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.gating.add(sequences, &self.cursor);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating.remove(sequence)
    }
}

/// Claim/publish protocol for concurrently racing producer threads.
///
/// `cursor` tracks the highest *claimed* sequence, advanced via
/// fetch-and-add from `next` or CAS from `try_next` — the two can race each
/// other, which is safe but means `try_next` may fail spuriously against a
/// concurrent `next` even when capacity would ultimately be available
/// (spec.md §9). Publication is tracked separately in the availability
/// buffer, since claims can complete (and publish) out of order.
pub struct MultiProducerSequencer {
    capacity: i64,
    cursor: Sequence,
    cached_gating: Sequence,
    availability: AvailabilityBuffer,
    gating: SequenceGroup,
    wait_strategy: Arc<dyn WaitStrategy>,
}

impl MultiProducerSequencer {
    pub fn new(capacity: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self {
            capacity: capacity as i64,
            cursor: Sequence::default(),
            cached_gating: Sequence::default(),
            availability: AvailabilityBuffer::new(capacity),
            gating: SequenceGroup::new(),
            wait_strategy,
        }
    }
}

impl Sequenced for MultiProducerSequencer {
    fn cursor(&self) -> &Sequence {
        &self.cursor
    }

    fn highest_published(&self, low: i64, available: i64) -> i64 {
        self.availability.get_available(low, available)
    }
}

impl Sequencer for MultiProducerSequencer {
    fn next(&self, n: i64) -> Result<i64> {
        validate_n(n, self.capacity)?;

        let current = self.cursor.fetch_and_add(n);
        let next_seq = current + n;
        let wrap = next_seq - self.capacity;
        let cached = self.cached_gating.get_relaxed();

        if wrap > cached || cached > current {
            loop {
                let min = self.gating.minimum(i64::MAX);
                if wrap <= min {
                    self.cached_gating.set_relaxed(min);
                    break;
                }
                std::thread::sleep(GATING_POLL);
            }
        }

        Ok(next_seq)
    }

    fn try_next(&self, n: i64) -> Result<i64> {
        validate_n(n, self.capacity)?;

        loop {
            let current = self.cursor.get_acquire();
            let next_seq = current + n;
            let wrap = next_seq - self.capacity;
            let min = self.gating.minimum(i64::MAX);

            if wrap > min {
                return Err(DisruptorError::InsufficientCapacity { requested: n as usize });
            }

            if self.cursor.compare_and_swap(current, next_seq).is_ok() {
                self.cached_gating.set_relaxed(min);
                return Ok(next_seq);
            }
            // Lost the race against a concurrent `next`/`try_next`; retry.
            // This may fail spuriously even when capacity would ultimately
            // suffice — preserved intentionally (spec.md §9).
        }
    }

    fn publish(&self, sequence: i64) {
        self.availability.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, low: i64, high: i64) {
        self.availability.set_range(low, high);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, sequence: i64) -> bool {
        self.availability.is_available(sequence)
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set_release(sequence);
    }

    fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) {
        self.gating.add(sequences, &self.cursor);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating.remove(sequence)
    }
}
