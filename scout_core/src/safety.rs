// scout_core/src/safety.rs

//! Timeouts, cooperative shutdown, the hardware-stop finalizer and the bump poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::Clock;
use crate::context::RobotContext;
use crate::error::{MissionFailure, Result, Side};

// --- Timeout ---

/// A wall-clock budget for one blocking activity.
#[derive(Clone)]
pub struct Timeout {
    activity: String,
    started: Duration,
    budget: Duration,
    clock: Arc<dyn Clock>,
}

impl Timeout {
    pub fn new(activity: impl Into<String>, budget: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.elapsed();
        Self {
            activity: activity.into(),
            started,
            budget,
            clock,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed().saturating_sub(self.started)
    }

    /// Fails with `MissionFailure::Timeout` once the budget has been exceeded.
    pub fn check(&self) -> Result<()> {
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            return Err(MissionFailure::Timeout {
                activity: self.activity.clone(),
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        Ok(())
    }
}

// --- Shutdown ---

/// Cooperative cancellation flag shared by every control loop and the signal handler.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.requested)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Called at the head of every loop iteration.
    pub fn check(&self) -> Result<()> {
        if self.is_requested() {
            let thread = std::thread::current();
            let name = thread.name().unwrap_or("mission");
            return Err(MissionFailure::Shutdown(format!("{name} thread")));
        }
        Ok(())
    }
}

// --- Finalizer ---

/// De-energizes every motor when dropped, whether the mission returned,
/// failed, or unwound from a panic. Safe to hold more than one; the
/// context only performs the stop once.
pub struct StopGuard {
    context: Arc<RobotContext>,
}

impl StopGuard {
    pub fn new(context: Arc<RobotContext>) -> Self {
        Self { context }
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.context.de_energize();
    }
}

// --- Bump ---

/// Staggered touch-sensor poll, invoked once per forward-motion tick.
///
/// Over every `period` ticks the left sensor is read once (tick `0 mod period`)
/// and the right sensor once (tick `period/2 mod period`).
#[derive(Debug, Clone)]
pub struct Bump {
    count: u32,
    period: u32,
}

impl Bump {
    pub fn new(period: u32) -> Self {
        Self {
            count: 0,
            period: period.max(2),
        }
    }

    /// Returns the sensor due on the next tick, advancing the counter.
    fn next_due(&mut self) -> Option<Side> {
        self.count = self.count.wrapping_add(1);
        let phase = self.count % self.period;
        if phase == 0 {
            Some(Side::Left)
        } else if phase == self.period / 2 {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn check(&mut self, context: &RobotContext) -> Result<()> {
        if let Some(side) = self.next_due() {
            if context.touch(side) {
                debug!("........ bump ({side} touch sensor pressed)");
                return Err(MissionFailure::Bump(side));
            }
        }
        Ok(())
    }
}
