//! Validating builder-style configuration for the coordination fabric
//!
//! spec.md §6 lists buffer capacity, max batch size, and wait-strategy
//! parameters as the core's only configuration surface. This module
//! follows the teacher's `RingBufferConfig` builder idiom (validating
//! `with_*` methods returning `Result<Self>`) scaled down to exactly that
//! surface — no NUMA/huge-page/SIMD knobs, since those belong to the
//! transport layer this spec excludes.

use std::time::Duration;

use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, LiteBlockingWaitStrategy, LiteTimeoutBlockingWaitStrategy,
    PhasedBackoffWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};

/// Which of spec.md §4.2's eight wait strategy variants to build, plus
/// whatever parameters that variant takes.
#[derive(Debug, Clone)]
pub enum WaitStrategyType {
    Blocking,
    LiteBlocking,
    TimeoutBlocking { timeout: Duration },
    LiteTimeoutBlocking { timeout: Duration },
    Sleeping { spin_retries: u32, yield_retries: u32, park_duration: Duration },
    Yielding { spin_retries: u32 },
    BusySpin,
    PhasedBackoff { spin_duration: Duration, yield_duration: Duration },
}

impl Default for WaitStrategyType {
    fn default() -> Self {
        Self::BusySpin
    }
}

impl WaitStrategyType {
    /// Instantiate the concrete strategy this variant names.
    pub fn build(&self) -> Box<dyn WaitStrategy> {
        match self {
            Self::Blocking => Box::new(BlockingWaitStrategy::new()),
            Self::LiteBlocking => Box::new(LiteBlockingWaitStrategy::new()),
            Self::TimeoutBlocking { timeout } => Box::new(TimeoutBlockingWaitStrategy::new(*timeout)),
            Self::LiteTimeoutBlocking { timeout } => Box::new(LiteTimeoutBlockingWaitStrategy::new(*timeout)),
            Self::Sleeping { spin_retries, yield_retries, park_duration } => {
                Box::new(SleepingWaitStrategy::new(*spin_retries, *yield_retries, *park_duration))
            }
            Self::Yielding { spin_retries } => Box::new(YieldingWaitStrategy::new(*spin_retries)),
            Self::BusySpin => Box::new(BusySpinWaitStrategy::new()),
            Self::PhasedBackoff { spin_duration, yield_duration } => {
                Box::new(PhasedBackoffWaitStrategy::with_blocking_fallback(*spin_duration, *yield_duration))
            }
        }
    }
}

/// Configuration for a ring buffer + sequencer pair.
#[derive(Debug, Clone)]
pub struct RingBufferConfig {
    pub capacity: usize,
    pub wait_strategy: WaitStrategyType,
}

impl RingBufferConfig {
    /// A new configuration with the given power-of-two capacity and the
    /// default `BusySpin` wait strategy.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(DisruptorError::config("ring buffer capacity must be a power of 2 greater than zero"));
        }
        Ok(Self {
            capacity,
            wait_strategy: WaitStrategyType::default(),
        })
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyType) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }
}

/// Configuration for a `BatchEventProcessor`: how large a batch it will
/// dispatch in one pass before yielding back to wait for more.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    pub max_batch_offset: i64,
}

impl ProcessorConfig {
    /// `max_batch_size` must be at least 1 (spec.md §6: "max batch size ≥ 1").
    pub fn new(max_batch_size: i64) -> Result<Self> {
        if max_batch_size < 1 {
            return Err(DisruptorError::config("max batch size must be at least 1"));
        }
        Ok(Self {
            // batch_end = next_sequence + max_batch_offset, so the offset is
            // one less than the size the caller asked for.
            max_batch_offset: max_batch_size - 1,
        })
    }

    /// No cap beyond whatever the wait strategy reports as available.
    pub fn unbounded() -> Self {
        Self { max_batch_offset: i64::MAX }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_BATCH_SIZE).expect("default max batch size is valid")
    }
}
