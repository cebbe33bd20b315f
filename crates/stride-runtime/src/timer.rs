//! Single-shot timers
//!
//! Hosts hand out a [`TimerHandle`] for every scheduled callback so the
//! caller can cancel it before it fires. [`TimerQueue`] is the shared
//! bookkeeping behind both bundled hosts.

use stride_core::Result;

/// Callback run when a timer fires. Errors propagate out of the host pump.
pub type TimerCallback = Box<dyn FnOnce() -> Result<()>>;

/// Identifies one scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Schedules callbacks after an approximate delay.
pub trait Timer {
    /// Run `callback` once, no earlier than `delay_ms` from now.
    /// Negative or NaN delays are treated as zero.
    fn schedule(&self, delay_ms: f64, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending callback. Returns false if it already fired or was
    /// cancelled before.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

struct PendingTimer {
    handle: TimerHandle,
    deadline_ms: f64,
    callback: TimerCallback,
}

/// Pending callbacks ordered by deadline, ties broken by scheduling order
#[derive(Default)]
pub struct TimerQueue {
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback due at an absolute deadline
    pub fn insert(&mut self, deadline_ms: f64, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            handle,
            deadline_ms,
            callback,
        });
        handle
    }

    /// Drop a pending callback without running it
    pub fn remove(&mut self, handle: TimerHandle) -> bool {
        match self.pending.iter().position(|t| t.handle == handle) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Earliest deadline still pending
    pub fn next_deadline(&self) -> Option<f64> {
        self.earliest().map(|index| self.pending[index].deadline_ms)
    }

    /// Take the earliest callback whose deadline is at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, TimerCallback)> {
        let index = self.earliest()?;
        if self.pending[index].deadline_ms > now_ms {
            return None;
        }
        let timer = self.pending.remove(index);
        Some((timer.deadline_ms, timer.callback))
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn earliest(&self) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.deadline_ms
                    .total_cmp(&b.deadline_ms)
                    .then(a.handle.cmp(&b.handle))
            })
            .map(|(index, _)| index)
    }
}
