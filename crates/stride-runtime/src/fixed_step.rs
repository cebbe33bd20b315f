//! Fixed-step loop
//!
//! A [`FixedStepLoop`] wakes itself through the host timer once per tick
//! interval. Each wake-up is a scheduling cycle:
//!
//! 1. bail out if the loop was stopped or restarted since the wake-up was armed
//! 2. arm the next wake-up, before any step runs
//! 3. add the elapsed wall-clock time to the residual delay
//! 4. emit [`LoopEvent::StepDropped`] for any backlog above the clamp, then clamp
//! 5. run the step function once per whole tick interval in the residual
//! 6. emit [`LoopEvent::Update`] with the remaining fraction of a tick
//!
//! A failing step aborts the rest of its cycle and the error surfaces through
//! the host pump. The next wake-up is already armed, so stepping resumes on
//! the following cycle.

use crate::accumulator::StepAccumulator;
use crate::event::{EventKind, LoopEvent};
use crate::event_bus::{EventBus, Subscription};
use crate::host::Host;
use crate::system::StepFn;
use crate::timer::TimerHandle;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use stride_core::{LoopOptions, Result, StrideError};
use tracing::{debug, trace, warn};

/// Counters for the current run, reset by every `start()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Scheduling cycles that got past the running check
    pub cycles: u64,
    /// Step function calls that returned Ok
    pub steps: u64,
    /// Step function calls that returned an error
    pub step_failures: u64,
    /// Times the delay clamp discarded backlog
    pub drop_events: u64,
    /// Total wall-clock time discarded by the clamp
    pub dropped_ms: f64,
}

struct LoopInner<H: Host> {
    host: Rc<H>,
    step: RefCell<Box<dyn StepFn>>,
    step_rate_hz: f64,
    accumulator: RefCell<StepAccumulator>,
    running: Cell<bool>,
    /// Bumped on every start and stop; wake-ups from older chains are ignored
    epoch: Cell<u64>,
    in_cycle: Cell<bool>,
    pending_wake: Cell<Option<TimerHandle>>,
    events: EventBus,
    stats: Cell<LoopStats>,
}

/// Drives a step function at a constant logical rate.
///
/// Cloning yields another handle to the same loop. Timer callbacks hold only
/// weak references, so dropping every handle ends the chain.
pub struct FixedStepLoop<H: Host + 'static> {
    inner: Rc<LoopInner<H>>,
}

impl<H: Host + 'static> Clone for FixedStepLoop<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct CycleGuard<'a>(&'a Cell<bool>);

impl<'a> CycleGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<H: Host + 'static> FixedStepLoop<H> {
    /// Create a stopped loop calling `step` at `step_rate_hz`.
    pub fn new(
        host: Rc<H>,
        step: impl StepFn + 'static,
        step_rate_hz: f64,
        options: LoopOptions,
    ) -> Result<Self> {
        if !step_rate_hz.is_finite() || step_rate_hz <= 0.0 {
            return Err(StrideError::InvalidStepRate(step_rate_hz));
        }
        options.validate()?;

        let tick_interval_ms = 1000.0 / step_rate_hz;
        // Subnormal rates overflow the interval to infinity.
        if !tick_interval_ms.is_finite() {
            return Err(StrideError::InvalidStepRate(step_rate_hz));
        }
        if options.delay_clamp_ms < tick_interval_ms {
            warn!(
                delay_clamp_ms = options.delay_clamp_ms,
                tick_interval_ms,
                "delay clamp is shorter than one tick; the loop can never step"
            );
        }

        Ok(Self {
            inner: Rc::new(LoopInner {
                host,
                step: RefCell::new(Box::new(step)),
                step_rate_hz,
                accumulator: RefCell::new(StepAccumulator::new(
                    tick_interval_ms,
                    options.delay_clamp_ms,
                )),
                running: Cell::new(false),
                epoch: Cell::new(0),
                in_cycle: Cell::new(false),
                pending_wake: Cell::new(None),
                events: EventBus::new(),
                stats: Cell::new(LoopStats::default()),
            }),
        })
    }

    /// Create a stopped loop with default options
    pub fn with_defaults(
        host: Rc<H>,
        step: impl StepFn + 'static,
        step_rate_hz: f64,
    ) -> Result<Self> {
        Self::new(host, step, step_rate_hz, LoopOptions::default())
    }

    /// Start (or restart) the loop and run the first cycle immediately.
    ///
    /// Any existing chain is cancelled and the residual delay is reset first.
    /// Called from inside a running cycle, the first cycle of the new chain is
    /// deferred to a zero-delay wake-up instead of nesting.
    pub fn start(&self) -> Result<()> {
        let inner = &self.inner;
        inner.halt();

        let now = inner.host.now_ms();
        inner.accumulator.borrow_mut().reset(now);
        inner.stats.set(LoopStats::default());
        inner.running.set(true);
        let epoch = inner.epoch.get();
        debug!(
            step_rate_hz = inner.step_rate_hz,
            delay_clamp_ms = self.delay_clamp_ms(),
            "fixed-step loop started"
        );

        if inner.in_cycle.get() {
            LoopInner::arm_wake(inner, epoch, 0.0);
            return Ok(());
        }
        LoopInner::run_cycle(inner, epoch)
    }

    /// Stop the loop. Safe to call when already stopped.
    pub fn stop(&self) {
        let was_running = self.inner.running.get();
        self.inner.halt();
        if was_running {
            debug!(stats = ?self.stats(), "fixed-step loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Fractional progress toward the next tick, in `[0, 1)` between cycles
    pub fn residual_delay_alpha(&self) -> f64 {
        self.inner.accumulator.borrow().alpha()
    }

    pub fn residual_delay_ms(&self) -> f64 {
        self.inner.accumulator.borrow().residual_delay_ms()
    }

    pub fn step_rate_hz(&self) -> f64 {
        self.inner.step_rate_hz
    }

    pub fn tick_interval_ms(&self) -> f64 {
        self.inner.accumulator.borrow().tick_interval_ms()
    }

    pub fn delay_clamp_ms(&self) -> f64 {
        self.inner.accumulator.borrow().delay_clamp_ms()
    }

    pub fn stats(&self) -> LoopStats {
        self.inner.stats.get()
    }

    /// The loop's event bus, for subscribing by [`EventKind`]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Called after every cycle with the residual alpha
    pub fn on_update(&self, handler: impl FnMut(f64) + 'static) -> Subscription {
        self.inner.events.subscribe(EventKind::Update, handler)
    }

    /// Called with the discarded milliseconds whenever the clamp triggers
    pub fn on_step_dropped(&self, handler: impl FnMut(f64) + 'static) -> Subscription {
        self.inner.events.subscribe(EventKind::StepDropped, handler)
    }
}

impl<H: Host + 'static> LoopInner<H> {
    fn halt(&self) {
        self.running.set(false);
        self.epoch.set(self.epoch.get().wrapping_add(1));
        if let Some(handle) = self.pending_wake.take() {
            self.host.cancel(handle);
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.running.get() && self.epoch.get() == epoch
    }

    fn update_stats(&self, f: impl FnOnce(&mut LoopStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn arm_wake(this: &Rc<Self>, epoch: u64, delay_ms: f64) {
        let weak = Rc::downgrade(this);
        let handle = this.host.schedule(
            delay_ms,
            Box::new(move || match weak.upgrade() {
                Some(inner) => LoopInner::run_cycle(&inner, epoch),
                None => Ok(()),
            }),
        );
        this.pending_wake.set(Some(handle));
    }

    fn run_cycle(this: &Rc<Self>, epoch: u64) -> Result<()> {
        if !this.is_current(epoch) {
            trace!(epoch, "ignoring wake-up from a stopped chain");
            return Ok(());
        }
        let tick_interval_ms = this.accumulator.borrow().tick_interval_ms();

        // The host was pumped from inside a step; try again next tick.
        if this.in_cycle.get() {
            Self::arm_wake(this, epoch, tick_interval_ms);
            return Ok(());
        }
        let _guard = CycleGuard::enter(&this.in_cycle);

        Self::arm_wake(this, epoch, tick_interval_ms);

        let now = this.host.now_ms();
        let overflow = {
            let mut acc = this.accumulator.borrow_mut();
            acc.accumulate(now);
            acc.overflow()
        };
        this.update_stats(|s| s.cycles += 1);

        if let Some(overflow_ms) = overflow {
            warn!(
                overflow_ms,
                delay_clamp_ms = this.accumulator.borrow().delay_clamp_ms(),
                "fixed-step loop fell behind; dropping backlog"
            );
            this.update_stats(|s| {
                s.drop_events += 1;
                s.dropped_ms += overflow_ms;
            });
            // Handlers still see the unclamped residual.
            this.events
                .emit_while(LoopEvent::StepDropped { overflow_ms }, || this.is_current(epoch));
            if this.epoch.get() != epoch {
                return Ok(());
            }
            this.accumulator.borrow_mut().apply_clamp();
        }

        loop {
            if !this.is_current(epoch) {
                return Ok(());
            }
            if !this.accumulator.borrow().should_step() {
                break;
            }

            let result = this.step.borrow_mut().step();
            if !this.is_current(epoch) {
                return result;
            }
            this.accumulator.borrow_mut().consume_step();

            if let Err(err) = result {
                this.update_stats(|s| s.step_failures += 1);
                warn!(error = %err, "step failed; abandoning the rest of this cycle");
                return Err(err);
            }
            this.update_stats(|s| s.steps += 1);
        }

        if !this.is_current(epoch) {
            return Ok(());
        }
        let alpha = this.accumulator.borrow().alpha();
        trace!(alpha, "cycle complete");
        this.events
            .emit_while(LoopEvent::Update { alpha }, || this.is_current(epoch));
        Ok(())
    }
}
