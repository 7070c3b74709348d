//! The consumer driver loop: wait, batch, dispatch, rewind, halt
//!
//! A `BatchEventProcessor` is the thing that actually runs on a consumer's
//! dedicated thread, typically behind an `Arc` so its cursor and `halt()`
//! are reachable from other threads while `run()` is in progress. It drives
//! batches of events through a user handler, routing rewindable failures,
//! timeouts, alerts, and arbitrary handler errors per spec.md §4.7.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::handler::{BatchRewindStrategy, EventHandler, ExceptionHandler, RewindDecision, RewindableEventHandler};
use crate::disruptor::ring_buffer::RingBuffer;
use crate::disruptor::sequence::Sequence;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const HALTED: u8 = 2;

fn is_rewindable(error: &DisruptorError) -> bool {
    matches!(error, DisruptorError::Rewindable(_))
}

/// The consumer driver loop described in spec.md §4.7.
///
/// The rewind strategy is stored as a trait object: it is only present when
/// `H` additionally implements [`RewindableEventHandler`] (selected via
/// [`BatchEventProcessor::with_rewind_strategy`]); processors built via
/// [`BatchEventProcessor::new`] carry none and escalate any rewindable
/// failure to `DisruptorError::Unsupported`.
///
/// `run()` takes `&self` so a processor can be shared (typically behind an
/// `Arc`) between the thread that drives it and any thread that needs to
/// read its cursor or call `halt()`. The handler is only ever touched by
/// whichever thread currently owns the Idle→Running transition, so
/// `UnsafeCell` access to it never races.
pub struct BatchEventProcessor<E, H, X> {
    ring_buffer: Arc<RingBuffer<E>>,
    barrier: Arc<SequenceBarrier>,
    handler: UnsafeCell<H>,
    exception_handler: X,
    rewind_strategy: Option<Box<dyn BatchRewindStrategy>>,
    cursor: Arc<Sequence>,
    state: AtomicU8,
    max_batch_offset: i64,
}

// SAFETY: `handler` is only accessed by the thread that currently owns the
// Idle->Running transition (enforced by the `state` CAS in `run`), never
// concurrently by two threads.
unsafe impl<E: Send, H: Send, X: Send> Sync for BatchEventProcessor<E, H, X> {}

impl<E, H, X> BatchEventProcessor<E, H, X>
where
    H: EventHandler<E>,
    X: ExceptionHandler<E>,
{
    /// A processor whose handler does not support rewinding: any rewindable
    /// error it raises fails with `Unsupported`.
    pub fn new(ring_buffer: Arc<RingBuffer<E>>, barrier: Arc<SequenceBarrier>, handler: H, exception_handler: X, max_batch_offset: i64) -> Self {
        Self::build(ring_buffer, barrier, handler, exception_handler, None, max_batch_offset)
    }

    fn build(
        ring_buffer: Arc<RingBuffer<E>>,
        barrier: Arc<SequenceBarrier>,
        handler: H,
        exception_handler: X,
        rewind_strategy: Option<Box<dyn BatchRewindStrategy>>,
        max_batch_offset: i64,
    ) -> Self {
        Self {
            ring_buffer,
            barrier,
            handler: UnsafeCell::new(handler),
            exception_handler,
            rewind_strategy,
            cursor: Arc::new(Sequence::default()),
            state: AtomicU8::new(IDLE),
            max_batch_offset,
        }
    }

    #[allow(clippy::mut_from_ref)]
    fn handler_mut(&self) -> &mut H {
        unsafe { &mut *self.handler.get() }
    }

    /// `run()` atomically transitions Idle→Running; fails `IllegalState` if
    /// already Running. If the processor was halted before ever running, it
    /// performs the start/shutdown notifications without processing any
    /// events. On exit the state always resets to Idle, so the processor may
    /// be restarted.
    #[tracing::instrument(skip_all)]
    pub fn run(&self) -> Result<()> {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return match self.state.load(Ordering::Acquire) {
                RUNNING => Err(DisruptorError::IllegalState),
                _ => {
                    self.notify_start();
                    self.notify_shutdown();
                    self.state.store(IDLE, Ordering::Release);
                    Ok(())
                }
            };
        }

        self.notify_start();
        let result = self.process_loop();
        self.notify_shutdown();
        self.state.store(IDLE, Ordering::Release);
        result
    }

    /// Runs the handler's `on_start`; a failure is routed to the exception
    /// handler rather than aborting the run (spec.md §7: start/shutdown
    /// errors use their dedicated handler methods and do not prevent the
    /// opposite lifecycle callback from running).
    fn notify_start(&self) {
        if let Err(error) = self.handler_mut().on_start() {
            self.exception_handler.handle_start_exception(&error);
        }
    }

    /// Runs the handler's `on_shutdown`; a failure is routed to the
    /// exception handler.
    fn notify_shutdown(&self) {
        if let Err(error) = self.handler_mut().on_shutdown() {
            self.exception_handler.handle_shutdown_exception(&error);
        }
    }

    fn process_loop(&self) -> Result<()> {
        let mut next_sequence = self.cursor.get_relaxed() + 1;
        let mut retry_attempts: u32 = 0;

        loop {
            if self.state.load(Ordering::Acquire) != RUNNING {
                return Ok(());
            }

            let batch_start = next_sequence;
            let available = match self.barrier.wait_for(next_sequence) {
                Ok(available) => available,
                Err(DisruptorError::Alert) => {
                    if self.state.load(Ordering::Acquire) != RUNNING {
                        return Ok(());
                    }
                    continue;
                }
                Err(DisruptorError::Timeout(_)) => {
                    self.handler_mut().on_timeout(self.cursor.get_acquire());
                    continue;
                }
                Err(other) => return Err(other),
            };

            if available < next_sequence {
                continue;
            }

            let batch_end = std::cmp::min(next_sequence + self.max_batch_offset, available);
            let batch_size = batch_end - next_sequence + 1;
            let queue_depth = available - next_sequence;
            self.handler_mut().on_batch_start(batch_size, queue_depth);

            let mut sequence = next_sequence;
            let mut rewound = false;

            while sequence <= batch_end {
                // SAFETY: `sequence` is within `[next_sequence, batch_end]`,
                // which the barrier guaranteed is contiguously published and
                // not yet passed by this processor's own cursor.
                let event = unsafe { self.ring_buffer.get(sequence) };

                match self.handler_mut().on_event(event, sequence, sequence == batch_end) {
                    Ok(()) => sequence += 1,
                    Err(error) if is_rewindable(&error) => match &self.rewind_strategy {
                        None => return Err(DisruptorError::Unsupported),
                        Some(strategy) => match strategy.handle(&error, retry_attempts) {
                            RewindDecision::Rewind => {
                                retry_attempts += 1;
                                next_sequence = batch_start;
                                rewound = true;
                                break;
                            }
                            RewindDecision::Throw => {
                                retry_attempts = 0;
                                self.exception_handler.handle_event_exception(&error, sequence, Some(event));
                                sequence += 1;
                            }
                        },
                    },
                    Err(error) => {
                        self.exception_handler.handle_event_exception(&error, sequence, Some(event));
                        sequence += 1;
                    }
                }
            }

            if rewound {
                continue;
            }

            retry_attempts = 0;
            self.cursor.set_release(batch_end);
            next_sequence = batch_end + 1;
        }
    }

    /// The processor's cursor: the highest sequence it has fully processed.
    /// Exposed so an upstream sequencer's gating set or a downstream
    /// processor's barrier can depend on it.
    pub fn get_sequence(&self) -> i64 {
        self.cursor.get_acquire()
    }

    /// The `Arc<Sequence>` backing this processor's cursor.
    pub fn sequence_handle(&self) -> Arc<Sequence> {
        self.cursor.clone()
    }

    /// Cooperative stop request. Processing stops at the next barrier
    /// interaction; `run()` then returns `Ok(())`. Idempotent.
    pub fn halt(&self) {
        self.state.store(HALTED, Ordering::Release);
        self.barrier.alert();
    }
}

impl<E, H, X> BatchEventProcessor<E, H, X>
where
    H: RewindableEventHandler<E>,
    X: ExceptionHandler<E>,
{
    /// A processor whose handler supports rewinding: a `Rewindable` error
    /// from `on_event` is routed through `rewind_strategy` instead of
    /// failing outright.
    pub fn with_rewind_strategy(
        ring_buffer: Arc<RingBuffer<E>>,
        barrier: Arc<SequenceBarrier>,
        handler: H,
        exception_handler: X,
        rewind_strategy: impl BatchRewindStrategy + 'static,
        max_batch_offset: i64,
    ) -> Self {
        Self::build(ring_buffer, barrier, handler, exception_handler, Some(Box::new(rewind_strategy)), max_batch_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::handler::{LoggingExceptionHandler, SimpleBatchRewindStrategy};
    use crate::disruptor::sequencer::{Sequenced, Sequencer, SingleProducerSequencer};
    use crate::disruptor::wait_strategy::BusySpinWaitStrategy;

    struct RecordingHandler {
        seen: Vec<(i32, i64, bool)>,
    }

    impl EventHandler<i32> for RecordingHandler {
        fn on_event(&mut self, event: &i32, sequence: i64, end_of_batch: bool) -> Result<()> {
            self.seen.push((*event, sequence, end_of_batch));
            Ok(())
        }
    }

    fn busy_spin() -> Arc<dyn crate::disruptor::wait_strategy::WaitStrategy> {
        Arc::new(BusySpinWaitStrategy::new())
    }

    fn single_producer_barrier() -> (Arc<SingleProducerSequencer>, Arc<SequenceBarrier>) {
        let sequencer = Arc::new(SingleProducerSequencer::new(8, busy_spin()));
        let sequenced: Arc<dyn Sequenced> = sequencer.clone();
        let barrier = Arc::new(SequenceBarrier::new(sequenced, busy_spin()));
        (sequencer, barrier)
    }

    #[test]
    fn processes_published_events_in_order() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (sequencer, barrier) = single_producer_barrier();

        for i in 0..5i32 {
            let seq = sequencer.next(1).unwrap();
            unsafe {
                *ring_buffer.get_mut(seq) = i * i;
            }
            sequencer.publish(seq);
        }

        let processor = Arc::new(BatchEventProcessor::new(
            ring_buffer,
            barrier,
            RecordingHandler { seen: Vec::new() },
            LoggingExceptionHandler,
            i64::MAX,
        ));

        let p2 = processor.clone();
        let thread_handle = std::thread::spawn(move || p2.run());
        std::thread::sleep(std::time::Duration::from_millis(20));
        processor.halt();
        thread_handle.join().unwrap().unwrap();
        assert_eq!(processor.get_sequence(), 4);
    }

    #[test]
    fn run_fails_illegal_state_when_already_running() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (_sequencer, barrier) = single_producer_barrier();
        let processor = Arc::new(BatchEventProcessor::new(
            ring_buffer,
            barrier,
            RecordingHandler { seen: Vec::new() },
            LoggingExceptionHandler,
            i64::MAX,
        ));

        let p2 = processor.clone();
        let thread_handle = std::thread::spawn(move || p2.run());
        std::thread::sleep(std::time::Duration::from_millis(10));

        let err = processor.run().unwrap_err();
        assert!(matches!(err, DisruptorError::IllegalState));

        processor.halt();
        thread_handle.join().unwrap().unwrap();
    }

    #[test]
    fn halt_before_run_skips_processing() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (_sequencer, barrier) = single_producer_barrier();
        let processor = BatchEventProcessor::new(
            ring_buffer,
            barrier,
            RecordingHandler { seen: Vec::new() },
            LoggingExceptionHandler,
            i64::MAX,
        );

        processor.halt();
        processor.run().unwrap();
        assert_eq!(processor.get_sequence(), -1);
    }

    #[test]
    fn repeated_halt_is_idempotent() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (_sequencer, barrier) = single_producer_barrier();
        let processor = BatchEventProcessor::new(
            ring_buffer,
            barrier,
            RecordingHandler { seen: Vec::new() },
            LoggingExceptionHandler,
            i64::MAX,
        );

        processor.halt();
        processor.halt();
        processor.run().unwrap();
    }

    struct FailingLifecycleHandler {
        start_called: Arc<std::sync::atomic::AtomicBool>,
        shutdown_called: Arc<std::sync::atomic::AtomicBool>,
    }

    impl EventHandler<i32> for FailingLifecycleHandler {
        fn on_event(&mut self, _event: &i32, _sequence: i64, _end_of_batch: bool) -> Result<()> {
            Ok(())
        }

        fn on_start(&mut self) -> Result<()> {
            self.start_called.store(true, Ordering::Relaxed);
            Err(DisruptorError::config("on_start failed"))
        }

        fn on_shutdown(&mut self) -> Result<()> {
            self.shutdown_called.store(true, Ordering::Relaxed);
            Err(DisruptorError::config("on_shutdown failed"))
        }
    }

    struct RecordingLifecycleExceptionHandler {
        start_exceptions: Arc<std::sync::atomic::AtomicUsize>,
        shutdown_exceptions: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ExceptionHandler<i32> for RecordingLifecycleExceptionHandler {
        fn handle_event_exception(&self, _error: &DisruptorError, _sequence: i64, _event: Option<&i32>) {}

        fn handle_start_exception(&self, _error: &DisruptorError) {
            self.start_exceptions.fetch_add(1, Ordering::Relaxed);
        }

        fn handle_shutdown_exception(&self, _error: &DisruptorError) {
            self.shutdown_exceptions.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn failing_lifecycle_callbacks_route_through_run_to_the_exception_handler() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (_sequencer, barrier) = single_producer_barrier();

        let start_called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let shutdown_called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let start_exceptions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let shutdown_exceptions = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let processor = BatchEventProcessor::new(
            ring_buffer,
            barrier,
            FailingLifecycleHandler {
                start_called: start_called.clone(),
                shutdown_called: shutdown_called.clone(),
            },
            RecordingLifecycleExceptionHandler {
                start_exceptions: start_exceptions.clone(),
                shutdown_exceptions: shutdown_exceptions.clone(),
            },
            i64::MAX,
        );

        // No producer activity; halt before run so process_loop exits
        // immediately after on_start, still exercising both callbacks.
        processor.halt();
        processor.run().unwrap();

        assert!(start_called.load(Ordering::Relaxed));
        assert!(shutdown_called.load(Ordering::Relaxed));
        assert_eq!(start_exceptions.load(Ordering::Relaxed), 1);
        assert_eq!(shutdown_exceptions.load(Ordering::Relaxed), 1);
    }

    #[derive(Debug)]
    struct FakeRewindableError;
    impl std::fmt::Display for FakeRewindableError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake rewindable error")
        }
    }
    impl std::error::Error for FakeRewindableError {}
    impl crate::disruptor::handler::RewindableException for FakeRewindableError {}

    struct RewindTwiceThenSucceedHandler {
        attempts_at_fail_sequence: u32,
    }

    impl EventHandler<i32> for RewindTwiceThenSucceedHandler {
        fn on_event(&mut self, _event: &i32, sequence: i64, _end_of_batch: bool) -> Result<()> {
            if sequence == 2 && self.attempts_at_fail_sequence < 2 {
                self.attempts_at_fail_sequence += 1;
                return Err(DisruptorError::rewindable(FakeRewindableError));
            }
            Ok(())
        }
    }
    impl RewindableEventHandler<i32> for RewindTwiceThenSucceedHandler {}

    #[test]
    fn rewindable_handler_retries_and_then_succeeds() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (sequencer, barrier) = single_producer_barrier();

        for i in 0..5i32 {
            let seq = sequencer.next(1).unwrap();
            unsafe {
                *ring_buffer.get_mut(seq) = i;
            }
            sequencer.publish(seq);
        }

        let processor = Arc::new(BatchEventProcessor::with_rewind_strategy(
            ring_buffer,
            barrier,
            RewindTwiceThenSucceedHandler { attempts_at_fail_sequence: 0 },
            LoggingExceptionHandler,
            SimpleBatchRewindStrategy,
            i64::MAX,
        ));

        let p2 = processor.clone();
        let thread_handle = std::thread::spawn(move || p2.run());
        std::thread::sleep(std::time::Duration::from_millis(20));
        processor.halt();
        thread_handle.join().unwrap().unwrap();
        assert_eq!(processor.get_sequence(), 4);
    }

    #[test]
    fn non_rewindable_handler_fails_unsupported_on_rewindable_error() {
        let ring_buffer = Arc::new(RingBuffer::new(8, || 0i32).unwrap());
        let (sequencer, barrier) = single_producer_barrier();

        struct AlwaysRewindableHandler;
        impl EventHandler<i32> for AlwaysRewindableHandler {
            fn on_event(&mut self, _event: &i32, _sequence: i64, _end_of_batch: bool) -> Result<()> {
                Err(DisruptorError::rewindable(FakeRewindableError))
            }
        }

        let seq = sequencer.next(1).unwrap();
        unsafe {
            *ring_buffer.get_mut(seq) = 0;
        }
        sequencer.publish(seq);

        let processor = BatchEventProcessor::new(ring_buffer, barrier, AlwaysRewindableHandler, LoggingExceptionHandler, i64::MAX);

        let err = processor.run().unwrap_err();
        assert!(matches!(err, DisruptorError::Unsupported));
    }
}
