//! flux-disruptor: a lock-free, in-process event-exchange engine
//!
//! This crate is the coordination fabric of an LMAX Disruptor-style ring
//! buffer: producers claim slots from a [`disruptor::Sequencer`], write
//! into them, and publish; consumers drive a
//! [`disruptor::BatchEventProcessor`] against a [`disruptor::SequenceBarrier`],
//! which combines a pluggable [`disruptor::WaitStrategy`] with a sticky
//! alert flag. No slot is ever locked and steady-state operation allocates
//! nothing; all coordination is atomic sequence counters and explicit
//! memory fences.
//!
//! What this crate is not: a builder/DSL that wires producers and
//! consumers together, event-object factories for a specific domain, or a
//! demo program. Those are left to the embedding application, which
//! supplies an [`disruptor::EventFactory`], an [`disruptor::EventHandler`],
//! and (optionally) an [`disruptor::ExceptionHandler`] and
//! [`disruptor::BatchRewindStrategy`].

pub mod constants;
pub mod disruptor;

pub use disruptor::{
    BatchEventProcessor, BatchRewindStrategy, DisruptorError, EventFactory, EventHandler, EventTranslator,
    ExceptionHandler, MultiProducerSequencer, ProcessorConfig, Result, RewindDecision, RewindableEventHandler,
    RingBuffer, RingBufferConfig, Sequence, SequenceBarrier, SequenceGroup, Sequenced, Sequencer,
    SingleProducerSequencer, WaitStrategy, WaitStrategyType,
};

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
