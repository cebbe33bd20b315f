//! Residual-delay accumulator with a backlog clamp

/// Converts measured wall-clock time into whole fixed steps.
///
/// Elapsed time is added to a residual; whole tick intervals are drained from
/// it one step at a time and the remainder carries into the next cycle. The
/// residual is capped at the delay clamp so a long stall cannot trigger an
/// unbounded burst of catch-up steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAccumulator {
    tick_interval_ms: f64,
    delay_clamp_ms: f64,
    /// Wall-clock time not yet converted into steps
    residual_delay_ms: f64,
    /// Clock reading at the last measurement
    previous_wake_ms: f64,
}

impl StepAccumulator {
    pub fn new(tick_interval_ms: f64, delay_clamp_ms: f64) -> Self {
        Self {
            tick_interval_ms,
            delay_clamp_ms,
            residual_delay_ms: 0.0,
            previous_wake_ms: 0.0,
        }
    }

    /// Forget any backlog and measure from `now_ms` onwards
    pub fn reset(&mut self, now_ms: f64) {
        self.residual_delay_ms = 0.0;
        self.previous_wake_ms = now_ms;
    }

    /// Add the time since the previous measurement. Returns the elapsed time.
    ///
    /// A clock reading earlier than the previous one counts as zero elapsed.
    pub fn accumulate(&mut self, now_ms: f64) -> f64 {
        let elapsed = (now_ms - self.previous_wake_ms).max(0.0);
        self.previous_wake_ms = now_ms;
        self.residual_delay_ms += elapsed;
        elapsed
    }

    /// Backlog above the delay clamp, if any. Does not modify the residual.
    pub fn overflow(&self) -> Option<f64> {
        if self.residual_delay_ms > self.delay_clamp_ms {
            Some(self.residual_delay_ms - self.delay_clamp_ms)
        } else {
            None
        }
    }

    /// Cap the residual at the delay clamp
    pub fn apply_clamp(&mut self) {
        self.residual_delay_ms = self.residual_delay_ms.min(self.delay_clamp_ms);
    }

    /// Returns true if a whole tick is waiting to be simulated
    pub fn should_step(&self) -> bool {
        self.residual_delay_ms >= self.tick_interval_ms
    }

    /// Consume one tick interval from the residual
    pub fn consume_step(&mut self) {
        self.residual_delay_ms -= self.tick_interval_ms;
    }

    /// Fractional progress toward the next tick, for render interpolation
    pub fn alpha(&self) -> f64 {
        self.residual_delay_ms / self.tick_interval_ms
    }

    pub fn residual_delay_ms(&self) -> f64 {
        self.residual_delay_ms
    }

    pub fn previous_wake_ms(&self) -> f64 {
        self.previous_wake_ms
    }

    pub fn tick_interval_ms(&self) -> f64 {
        self.tick_interval_ms
    }

    pub fn delay_clamp_ms(&self) -> f64 {
        self.delay_clamp_ms
    }
}
