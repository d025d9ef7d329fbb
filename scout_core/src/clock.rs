// scout_core/src/clock.rs

use std::time::{Duration, Instant};

/// Monotonic time source shared by every wait loop.
///
/// Real hardware uses [`SystemClock`]; the simulator supplies a virtual clock
/// whose `sleep` advances the simulated world instead of blocking the thread.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Blocks the calling control loop for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time measured from process start.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances_across_sleep() {
        let clock = SystemClock::new();
        let before = clock.elapsed();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.elapsed() >= before + Duration::from_millis(5));
    }
}
