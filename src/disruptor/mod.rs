//! The coordination fabric: sequencing, waiting, and batch dispatch
//!
//! This module tree is the entire core spec.md describes: a pre-allocated
//! ring buffer addressed by sequence number, single- and multi-producer
//! sequencers that hand out and publish claims, a pluggable wait strategy
//! family consumers park on, a sequence barrier combining a wait strategy
//! with an alert flag, and the batch event processor that drives a
//! consumer's dedicated thread. None of it takes a lock on the hot path;
//! coordination is atomics and memory fences only.

pub mod availability_buffer;
pub mod barrier;
pub mod config;
pub mod error;
pub mod handler;
pub mod processor;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_group;
pub mod sequencer;
pub mod wait_strategy;

pub use barrier::{AlertGate, SequenceBarrier};
pub use config::{ProcessorConfig, RingBufferConfig, WaitStrategyType};
pub use error::{DisruptorError, Result};
pub use handler::{
    BatchRewindStrategy, BoundedBatchRewindStrategy, EventFactory, EventHandler, EventTranslator, ExceptionHandler,
    LoggingExceptionHandler, NoOpEventHandler, RewindDecision, RewindableEventHandler, RewindableException,
    SimpleBatchRewindStrategy,
};
pub use processor::BatchEventProcessor;
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequence_group::SequenceGroup;
pub use sequencer::{MultiProducerSequencer, Sequenced, Sequencer, SingleProducerSequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, LiteBlockingWaitStrategy, LiteTimeoutBlockingWaitStrategy,
    PhasedBackoffWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy, WaitStrategyFactory,
    YieldingWaitStrategy,
};
