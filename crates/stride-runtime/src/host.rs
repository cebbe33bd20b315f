//! Host environments that own a clock and a timer queue
//!
//! `ManualHost` is a simulated host: time only moves when the caller says so,
//! which makes loop behaviour reproducible in tests. `RealtimeHost` pumps
//! timers against the wall clock on the calling thread.

use crate::clock::{Clock, SystemClock};
use crate::timer::{Timer, TimerCallback, TimerHandle, TimerQueue};
use std::cell::{Cell, RefCell};
use std::time::Duration;
use stride_core::Result;

/// Everything a fixed-step loop needs from its environment
pub trait Host: Clock + Timer {}

impl<T: Clock + Timer + ?Sized> Host for T {}

fn sanitize_delay(delay_ms: f64) -> f64 {
    if delay_ms.is_nan() {
        0.0
    } else {
        delay_ms.max(0.0)
    }
}

/// Simulated host with a hand-driven clock
pub struct ManualHost {
    now_ms: Cell<f64>,
    timers: RefCell<TimerQueue>,
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualHost {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(now_ms: f64) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
            timers: RefCell::new(TimerQueue::new()),
        }
    }

    /// Move the clock forward without firing anything.
    ///
    /// Models work that blocks the host thread, e.g. a slow step function.
    pub fn sleep(&self, ms: f64) {
        self.now_ms.set(self.now_ms.get() + sanitize_delay(ms));
    }

    /// Advance the clock by `ms`, firing every timer that falls due on the way.
    pub fn advance(&self, ms: f64) -> Result<()> {
        self.advance_to(self.now_ms.get() + sanitize_delay(ms))
    }

    /// Advance the clock to `target_ms`, firing due timers in deadline order.
    ///
    /// A timer whose deadline has already passed (because a callback slept)
    /// fires at the current time; the clock never runs backwards. If a
    /// callback fails, the clock stays at that callback's firing time and
    /// the error is returned. Later timers stay queued.
    pub fn advance_to(&self, target_ms: f64) -> Result<()> {
        loop {
            let due = self.timers.borrow_mut().pop_due(target_ms);
            let Some((deadline_ms, callback)) = due else {
                break;
            };
            if deadline_ms > self.now_ms.get() {
                self.now_ms.set(deadline_ms);
            }
            callback()?;
        }
        if target_ms > self.now_ms.get() {
            self.now_ms.set(target_ms);
        }
        Ok(())
    }

    /// Number of callbacks waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Deadline of the next callback, if any
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.borrow().next_deadline()
    }
}

impl Clock for ManualHost {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }
}

impl Timer for ManualHost {
    fn schedule(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle {
        let deadline = self.now_ms.get() + sanitize_delay(delay_ms);
        self.timers.borrow_mut().insert(deadline, callback)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.timers.borrow_mut().remove(handle)
    }
}

/// Wall-clock host driven from the calling thread
pub struct RealtimeHost {
    clock: SystemClock,
    timers: RefCell<TimerQueue>,
}

impl Default for RealtimeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHost {
    pub fn new() -> Self {
        Self {
            clock: SystemClock::new(),
            timers: RefCell::new(TimerQueue::new()),
        }
    }

    /// Fire timers as they fall due for `duration`, sleeping in between.
    ///
    /// Returns early with the first callback error. Calling it again picks
    /// up the remaining timers.
    pub fn run_for(&self, duration: Duration) -> Result<()> {
        let end_ms = self.clock.now_ms() + duration.as_secs_f64() * 1000.0;
        loop {
            let now_ms = self.clock.now_ms();
            if now_ms >= end_ms {
                break;
            }

            let due = self.timers.borrow_mut().pop_due(now_ms);
            if let Some((_, callback)) = due {
                callback()?;
                continue;
            }

            let wake_ms = self
                .timers
                .borrow()
                .next_deadline()
                .map_or(end_ms, |deadline| deadline.min(end_ms));
            let wait_ms = (wake_ms - now_ms).max(0.0);
            std::thread::sleep(Duration::from_secs_f64(wait_ms / 1000.0));
        }
        Ok(())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Clock for RealtimeHost {
    fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }
}

impl Timer for RealtimeHost {
    fn schedule(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle {
        let deadline = self.clock.now_ms() + sanitize_delay(delay_ms);
        self.timers.borrow_mut().insert(deadline, callback)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.timers.borrow_mut().remove(handle)
    }
}
