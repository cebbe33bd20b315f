//! Loop notifications

/// Which notification a handler listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Update,
    StepDropped,
}

/// A notification emitted by a fixed-step loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopEvent {
    /// End of a scheduling cycle. `alpha` is the fractional progress toward
    /// the next tick, in `[0, 1)`.
    Update { alpha: f64 },
    /// Backlog exceeded the delay clamp; `overflow_ms` of wall-clock time was
    /// discarded without being simulated.
    StepDropped { overflow_ms: f64 },
}

impl LoopEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LoopEvent::Update { .. } => EventKind::Update,
            LoopEvent::StepDropped { .. } => EventKind::StepDropped,
        }
    }

    /// The numeric payload handed to subscribers
    pub fn value(&self) -> f64 {
        match *self {
            LoopEvent::Update { alpha } => alpha,
            LoopEvent::StepDropped { overflow_ms } => overflow_ms,
        }
    }
}
