//! Step function trait

use stride_core::Result;

/// The simulation advanced by a fixed-step loop.
///
/// `step` is called once per tick, synchronously, and should return quickly
/// relative to the tick interval. Time it spends is charged to the next
/// cycle's residual delay. Any `FnMut() -> Result<()>` closure is a `StepFn`.
pub trait StepFn {
    /// Advance the simulation by exactly one tick
    fn step(&mut self) -> Result<()>;
}

impl<F> StepFn for F
where
    F: FnMut() -> Result<()>,
{
    fn step(&mut self) -> Result<()> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u32,
    }

    impl StepFn for Counter {
        fn step(&mut self) -> Result<()> {
            self.ticks += 1;
            Ok(())
        }
    }

    #[test]
    fn structs_and_closures_both_step() {
        let mut counter = Counter { ticks: 0 };
        counter.step().unwrap();
        assert_eq!(counter.ticks, 1);

        let mut n = 0;
        let mut closure = || -> Result<()> {
            n += 2;
            Ok(())
        };
        closure.step().unwrap();
        closure.step().unwrap();
        drop(closure);
        assert_eq!(n, 4);
    }
}
