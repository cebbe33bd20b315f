//! Stride Runtime - Fixed-timestep scheduling
//!
//! Provides the building blocks for driving a simulation at a constant rate:
//! - `FixedStepLoop` — self-rescheduling loop that turns wall-clock time into fixed steps
//! - `StepAccumulator` — residual-delay bookkeeping with a backlog clamp
//! - `LoopEvent` / `EventBus` — update and step-dropped notifications
//! - `StepFn` — trait for the per-tick simulation callback
//! - `Clock` / `Timer` / `Host` — injected time sources, with `ManualHost` and `RealtimeHost`

mod accumulator;
mod clock;
mod event;
mod event_bus;
mod fixed_step;
mod host;
mod system;
mod timer;

pub use accumulator::StepAccumulator;
pub use clock::{Clock, SystemClock};
pub use event::{EventKind, LoopEvent};
pub use event_bus::{EventBus, Subscription};
pub use fixed_step::{FixedStepLoop, LoopStats};
pub use host::{Host, ManualHost, RealtimeHost};
pub use system::StepFn;
pub use timer::{Timer, TimerCallback, TimerHandle, TimerQueue};

pub use stride_core::{LoopOptions, Result, StrideError};
