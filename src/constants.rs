//! Core tuning constants
//!
//! Defaults referenced by [`crate::disruptor::config`] when the caller does
//! not specify a value explicitly. Everything UDP/NUMA/SIMD-flavored that
//! the teacher crate carried alongside these lived outside this spec's
//! scope and was dropped rather than carried forward unused.

/// Default ring buffer capacity if a caller does not pick one explicitly.
pub const DEFAULT_RING_BUFFER_SIZE: usize = 1024 * 1024;

/// Largest ring buffer capacity the default configuration path accepts;
/// callers building their own `RingBuffer` directly are not bound by this.
pub const MAX_RING_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Cache line size assumed by [`crate::disruptor::sequence::Sequence`]'s
/// padding (in practice padded to double this, see that module's doc
/// comment).
pub const CACHE_LINE_SIZE: usize = 64;

/// Default max batch size a [`crate::disruptor::processor::BatchEventProcessor`]
/// will dispatch in one pass, if the caller does not cap it lower.
pub const DEFAULT_MAX_BATCH_SIZE: i64 = 1000;
