//! Time base of the sampling loop.

use std::time::{Duration, Instant};

/// Milliseconds elapsed since the loop started.
pub trait Clock {
    fn now_millis(&mut self) -> u64;
}

/// Wall clock, counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&mut self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock advancing by a fixed step on every read.
///
/// Makes the loop deterministic regardless of how the thread gets scheduled.
#[derive(Debug, Clone, Copy)]
pub struct SteppedClock {
    now: u64,
    step: u64,
}

impl SteppedClock {
    #[must_use]
    pub fn new(step: Duration) -> Self {
        Self {
            now: 0,
            step: u64::try_from(step.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Clock for SteppedClock {
    fn now_millis(&mut self) -> u64 {
        self.now = self.now.saturating_add(self.step);
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_read_stepped_clock_advances_by_step() {
        let mut clock = SteppedClock::new(Duration::from_millis(5));
        assert_eq!(clock.now_millis(), 5);
        assert_eq!(clock.now_millis(), 10);
        assert_eq!(clock.now_millis(), 15);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let mut clock = MonotonicClock::new();
        let mut last = clock.now_millis();
        for _ in 0..1000 {
            let now = clock.now_millis();
            assert!(now >= last);
            last = now;
        }
    }
}
