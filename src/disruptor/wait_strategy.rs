//! Pluggable policies for a consumer waiting on a target sequence
//!
//! Every variant implements the same two-phase wait: first for the producer
//! cursor to pass `target` (the "new work exists" signal, delivered via
//! whatever mechanism `signal_all_when_blocking` uses), then for the
//! dependent sequence — the slowest upstream consumer, or the producer
//! cursor itself when there is none — to also reach `target`. The second
//! phase has no signal to wait on and is always a spin loop (spec.md §4.2).
//! `dependent` is passed as a closure rather than a concrete `Sequence`
//! because a downstream consumer's dependent value is often the minimum
//! across several upstream cursors, not a single counter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::disruptor::barrier::AlertGate;
use crate::disruptor::error::{DisruptorError, Result};
use crate::disruptor::sequence::Sequence;

/// A policy governing how a consumer waits for a target sequence to become
/// available.
pub trait WaitStrategy: Send + Sync {
    /// Wait until `dependent() >= target`, or fail with `Alert`, `Timeout`,
    /// or (in principle) `Interrupted`.
    ///
    /// `cursor` is the producer/sequencer cursor this strategy's signal
    /// mechanism is keyed to; `dependent` yields the sequence value the
    /// caller may not proceed past (the barrier's composite upstream
    /// minimum, or the sequencer cursor itself when there are no upstream
    /// consumers).
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64>;

    /// Wake any thread parked on this strategy's signal mechanism. Called by
    /// the sequencer after every publish; a no-op for purely spinning
    /// strategies.
    fn signal_all_when_blocking(&self);
}

/// Spin on the dependent sequence until it reaches `target`, checking the
/// alert on every iteration.
fn spin_on_dependent(target: i64, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
    loop {
        let available = dependent();
        if available >= target {
            return Ok(available);
        }
        alert.check_alert()?;
        std::hint::spin_loop();
    }
}

struct ParkGate {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl ParkGate {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Block until `cursor` reaches `target`, re-checking the alert and
    /// waking periodically rather than trusting a single notification.
    fn wait_for_cursor(&self, target: i64, cursor: &Sequence, alert: &dyn AlertGate, poll: Duration) -> Result<()> {
        let mut guard = self.mutex.lock();
        while cursor.get_acquire() < target {
            alert.check_alert()?;
            self.condvar.wait_for(&mut guard, poll);
        }
        Ok(())
    }

    /// As above, but fails `Timeout` if `deadline` passes before the cursor
    /// reaches `target`.
    fn wait_for_cursor_with_deadline(
        &self,
        target: i64,
        cursor: &Sequence,
        alert: &dyn AlertGate,
        poll: Duration,
        deadline: Instant,
        budget: Duration,
    ) -> Result<()> {
        let mut guard = self.mutex.lock();
        while cursor.get_acquire() < target {
            alert.check_alert()?;
            if Instant::now() >= deadline {
                return Err(DisruptorError::Timeout(budget));
            }
            self.condvar.wait_for(&mut guard, poll);
        }
        Ok(())
    }

    fn signal(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

const DEFAULT_POLL: Duration = Duration::from_micros(100);

/// Parks on a mutex/condvar until the producer cursor advances, then spins on
/// the dependent sequence. CPU-frugal; adds wakeup latency.
pub struct BlockingWaitStrategy {
    gate: ParkGate,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self { gate: ParkGate::new() }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        alert.check_alert()?;
        if cursor.get_acquire() < target {
            self.gate.wait_for_cursor(target, cursor, alert, DEFAULT_POLL)?;
        }
        spin_on_dependent(target, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        self.gate.signal();
    }
}

/// As `Blocking`, but tracks whether any waiter is parked so
/// `signal_all_when_blocking` can skip acquiring the mutex when nobody is
/// listening.
pub struct LiteBlockingWaitStrategy {
    gate: ParkGate,
    waiting: AtomicBool,
}

impl LiteBlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            gate: ParkGate::new(),
            waiting: AtomicBool::new(false),
        }
    }
}

impl Default for LiteBlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for LiteBlockingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        alert.check_alert()?;
        if cursor.get_acquire() < target {
            self.waiting.store(true, Ordering::Release);
            let result = self.gate.wait_for_cursor(target, cursor, alert, DEFAULT_POLL);
            self.waiting.store(false, Ordering::Release);
            result?;
        }
        spin_on_dependent(target, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        if self.waiting.load(Ordering::Acquire) {
            self.gate.signal();
        }
    }
}

/// Blocks with a deadline; fails `Timeout` rather than waiting forever.
pub struct TimeoutBlockingWaitStrategy {
    gate: ParkGate,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            gate: ParkGate::new(),
            timeout,
        }
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        alert.check_alert()?;
        let deadline = Instant::now() + self.timeout;
        if cursor.get_acquire() < target {
            self.gate
                .wait_for_cursor_with_deadline(target, cursor, alert, DEFAULT_POLL, deadline, self.timeout)?;
        }
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if Instant::now() >= deadline {
                return Err(DisruptorError::Timeout(self.timeout));
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        self.gate.signal();
    }
}

/// Combines `TimeoutBlocking`'s deadline with `LiteBlocking`'s
/// signal-needed optimization.
pub struct LiteTimeoutBlockingWaitStrategy {
    gate: ParkGate,
    waiting: AtomicBool,
    timeout: Duration,
}

impl LiteTimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            gate: ParkGate::new(),
            waiting: AtomicBool::new(false),
            timeout,
        }
    }
}

impl WaitStrategy for LiteTimeoutBlockingWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        alert.check_alert()?;
        let deadline = Instant::now() + self.timeout;
        if cursor.get_acquire() < target {
            self.waiting.store(true, Ordering::Release);
            let result = self
                .gate
                .wait_for_cursor_with_deadline(target, cursor, alert, DEFAULT_POLL, deadline, self.timeout);
            self.waiting.store(false, Ordering::Release);
            result?;
        }
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if Instant::now() >= deadline {
                return Err(DisruptorError::Timeout(self.timeout));
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        if self.waiting.load(Ordering::Acquire) {
            self.gate.signal();
        }
    }
}

/// `spin_retries` iterations of check-alert-and-spin, then `yield_retries`
/// of yield-hint, then repeated short parks of `park_duration`. Balances
/// latency against CPU usage; never blocks on a condvar so
/// `signal_all_when_blocking` is a no-op.
pub struct SleepingWaitStrategy {
    spin_retries: u32,
    yield_retries: u32,
    park_duration: Duration,
}

impl SleepingWaitStrategy {
    pub fn new(spin_retries: u32, yield_retries: u32, park_duration: Duration) -> Self {
        Self {
            spin_retries,
            yield_retries,
            park_duration,
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new(100, 100, Duration::from_nanos(100))
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(&self, target: i64, _cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        let mut counter = self.spin_retries + self.yield_retries;
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if counter > self.yield_retries {
                std::hint::spin_loop();
            } else if counter > 0 {
                std::thread::yield_now();
            } else {
                std::thread::sleep(self.park_duration);
            }
            counter = counter.saturating_sub(1);
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// `spin_retries` iterations of check-alert-and-spin, then yield-hint
/// thereafter. Low latency, high CPU usage; never blocks on a condvar.
pub struct YieldingWaitStrategy {
    spin_retries: u32,
}

impl YieldingWaitStrategy {
    pub fn new(spin_retries: u32) -> Self {
        Self { spin_retries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(&self, target: i64, _cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        let mut counter = self.spin_retries;
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if counter > 0 {
                counter -= 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Pure spin-hint loop, checking alert every iteration. Lowest latency;
/// dedicates a core.
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BusySpinWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(&self, target: i64, _cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        spin_on_dependent(target, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spins for `spin_duration`, then yields for `yield_duration`, then
/// delegates to a configured fallback strategy. Adaptive: cheap under light
/// idle periods, falls back to the fallback's behavior (often `Blocking` or
/// `Sleeping`) when waits run long.
pub struct PhasedBackoffWaitStrategy {
    spin_duration: Duration,
    yield_duration: Duration,
    fallback: Box<dyn WaitStrategy>,
}

impl PhasedBackoffWaitStrategy {
    pub fn new(spin_duration: Duration, yield_duration: Duration, fallback: Box<dyn WaitStrategy>) -> Self {
        Self {
            spin_duration,
            yield_duration,
            fallback,
        }
    }

    /// Convenience constructor matching the teacher's "balanced" preset:
    /// a short spin/yield phase backed by a blocking fallback.
    pub fn with_blocking_fallback(spin_duration: Duration, yield_duration: Duration) -> Self {
        Self::new(spin_duration, yield_duration, Box::new(BlockingWaitStrategy::new()))
    }
}

impl WaitStrategy for PhasedBackoffWaitStrategy {
    fn wait_for(&self, target: i64, cursor: &Sequence, dependent: &dyn Fn() -> i64, alert: &dyn AlertGate) -> Result<i64> {
        let spin_deadline = Instant::now() + self.spin_duration;
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if Instant::now() >= spin_deadline {
                break;
            }
            std::hint::spin_loop();
        }

        let yield_deadline = Instant::now() + self.yield_duration;
        loop {
            let available = dependent();
            if available >= target {
                return Ok(available);
            }
            alert.check_alert()?;
            if Instant::now() >= yield_deadline {
                break;
            }
            std::thread::yield_now();
        }

        self.fallback.wait_for(target, cursor, dependent, alert)
    }

    fn signal_all_when_blocking(&self) {
        self.fallback.signal_all_when_blocking();
    }
}

/// Convenience constructors for common presets, mirroring the teacher's
/// `WaitStrategyFactory`.
pub struct WaitStrategyFactory;

impl WaitStrategyFactory {
    /// Lowest latency, dedicates a core to spinning.
    pub fn low_latency() -> Box<dyn WaitStrategy> {
        Box::new(BusySpinWaitStrategy::new())
    }

    /// Spin briefly, then yield, then park — a reasonable default.
    pub fn balanced() -> Box<dyn WaitStrategy> {
        Box::new(SleepingWaitStrategy::default())
    }

    /// Minimizes CPU usage at the cost of wakeup latency.
    pub fn low_cpu() -> Box<dyn WaitStrategy> {
        Box::new(BlockingWaitStrategy::new())
    }

    /// Blocking with a bounded wait, surfacing idle periods as `on_timeout`.
    pub fn with_timeout(timeout: Duration) -> Box<dyn WaitStrategy> {
        Box::new(TimeoutBlockingWaitStrategy::new(timeout))
    }
}
