//! Consumer-side coordination: cursor, dependents, wait strategy, alert flag
//!
//! A `SequenceBarrier` is what a `BatchEventProcessor` waits on. It knows
//! how far the barrier's "dependent sequence" — either the sequencer's own
//! cursor, or the minimum over a fixed set of upstream consumer cursors —
//! has advanced, and how to make a processor's wait fail promptly once the
//! barrier is alerted (spec.md §4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::sequence::Sequence;
use crate::disruptor::sequencer::Sequenced;
use crate::disruptor::wait_strategy::WaitStrategy;

/// The minimal capability a `WaitStrategy` needs from its enclosing barrier:
/// a way to check (and fail on) the sticky alert flag at every resume point.
pub trait AlertGate: Send + Sync {
    fn check_alert(&self) -> Result<()>;
}

/// What a barrier must not overrun: either the sequencer's own cursor (no
/// upstream consumers) or the minimum across a fixed set of upstream
/// consumer cursors.
enum Dependent {
    SequencerCursor(Arc<dyn Sequenced>),
    Upstream(Vec<Arc<Sequence>>),
}

impl Dependent {
    fn value(&self) -> i64 {
        match self {
            Dependent::SequencerCursor(sequencer) => sequencer.cursor().get_acquire(),
            Dependent::Upstream(sequences) => sequences.iter().map(|s| s.get_acquire()).min().unwrap_or(i64::MAX),
        }
    }
}

pub struct SequenceBarrier {
    sequencer: Arc<dyn Sequenced>,
    wait_strategy: Arc<dyn WaitStrategy>,
    dependent: Dependent,
    alerted: AtomicBool,
}

impl SequenceBarrier {
    /// A barrier with no upstream consumers: its dependent sequence is the
    /// sequencer's own published cursor.
    pub fn new(sequencer: Arc<dyn Sequenced>, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self {
            dependent: Dependent::SequencerCursor(sequencer.clone()),
            sequencer,
            wait_strategy,
            alerted: AtomicBool::new(false),
        }
    }

    /// A barrier for a downstream consumer that must not overrun a fixed set
    /// of upstream consumer cursors.
    pub fn with_upstream(sequencer: Arc<dyn Sequenced>, wait_strategy: Arc<dyn WaitStrategy>, upstream: Vec<Arc<Sequence>>) -> Self {
        Self {
            sequencer,
            wait_strategy,
            dependent: Dependent::Upstream(upstream),
            alerted: AtomicBool::new(false),
        }
    }

    /// Wait for `target` to become available, then return the highest
    /// contiguously published sequence the caller may safely consume up to
    /// (which may be less than what the wait strategy itself returned, once
    /// gaps in multi-producer publication are accounted for).
    pub fn wait_for(&self, target: i64) -> Result<i64> {
        self.check_alert()?;
        let cursor = self.sequencer.cursor();
        let dependent = || self.dependent.value();
        let available = self.wait_strategy.wait_for(target, cursor, &dependent, self)?;

        if available < target {
            return Ok(available);
        }

        Ok(self.sequencer.highest_published(target, available))
    }

    /// Set the alert flag and wake any parked waiter so it rechecks.
    pub fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// The barrier's own "how far can I go" value — the dependent sequence,
    /// not the sequencer's cursor.
    pub fn get_cursor(&self) -> i64 {
        self.dependent.value()
    }
}

impl AlertGate for SequenceBarrier {
    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            return Err(DisruptorError::Alert);
        }
        Ok(())
    }
}
