//! Error types for the disruptor core
//!
//! The taxonomy mirrors the error kinds a production Disruptor port needs to
//! distinguish: some are recoverable at the call site (`InsufficientCapacity`),
//! some are internal signals caught by the processor loop (`Alert`, `Timeout`,
//! `Rewindable`), and some are programmer errors (`IllegalState`, `Unsupported`).

use thiserror::Error;

/// Result type alias for disruptor operations
pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Main error type for the disruptor core
#[derive(Error, Debug)]
pub enum DisruptorError {
    /// Raised only by `try_next`; the caller may retry or back off.
    #[error("insufficient capacity to claim {requested} slot(s)")]
    InsufficientCapacity {
        /// Number of slots the caller attempted to claim
        requested: usize,
    },

    /// A barrier was alerted; caught by the processor loop.
    #[error("sequence barrier was alerted")]
    Alert,

    /// Raised by timing wait strategies when no sequence became available
    /// within the configured deadline.
    #[error("wait timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Thread interruption while parked in a wait strategy.
    ///
    /// Rust has no checked interruption signal the way the source language
    /// does; nothing in this crate constructs this variant on its own, but it
    /// is kept in the taxonomy for parity with the documented error model and
    /// so a caller driving its own cancellation can surface it uniformly.
    #[error("wait was interrupted")]
    Interrupted,

    /// Raised by a rewindable event handler to request the current batch be
    /// reprocessed from its first sequence.
    #[error("handler requested a rewind")]
    Rewindable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `run()` was called on a processor that is already `Running`.
    #[error("processor is already running")]
    IllegalState,

    /// A rewindable error was raised by a handler that does not support
    /// rewinding.
    #[error("handler does not support rewind")]
    Unsupported,

    /// An arbitrary error from `on_event`, routed to the exception handler.
    #[error("event handler failed: {0}")]
    HandlerError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid configuration (non-power-of-two capacity, zero batch size, ...).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DisruptorError {
    /// Construct a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Construct a rewind request from a handler error marked
    /// [`crate::disruptor::handler::RewindableException`].
    pub fn rewindable(source: impl crate::disruptor::handler::RewindableException) -> Self {
        Self::Rewindable(Box::new(source))
    }

    /// Construct a handler error from an arbitrary handler error.
    pub fn handler(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::HandlerError(Box::new(source))
    }

    /// Whether this error is expected/recoverable rather than a programmer
    /// error or fatal condition.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity { .. } | Self::Alert | Self::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_message() {
        let err = DisruptorError::config("capacity must be a power of two");
        assert!(matches!(err, DisruptorError::Config(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn recoverable_classification() {
        assert!(DisruptorError::InsufficientCapacity { requested: 4 }.is_recoverable());
        assert!(DisruptorError::Alert.is_recoverable());
        assert!(DisruptorError::Timeout(std::time::Duration::from_millis(1)).is_recoverable());
        assert!(!DisruptorError::IllegalState.is_recoverable());
        assert!(!DisruptorError::Unsupported.is_recoverable());
    }
}
