// scout_core/src/perception/head_turner.rs

use std::time::Duration;
use tracing::debug;

use crate::context::RobotContext;
use crate::error::{MissionFailure, Result};
use crate::safety::Timeout;

/// Minimum head speed while scanning, in degrees per second.
const MIN_SCAN_SPEED: u32 = 100;
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Ready,
    Scanning,
    Stopping,
}

/// Oscillates the head between `-angle` and `+angle`, sampling pan position and
/// range once per `sensor_tick`.
///
/// The turner is driven cooperatively: the owning control loop calls
/// `sensor_tick` once per iteration, so scan samples and drive samples are
/// strictly interleaved on the same thread.
pub struct HeadTurner<'a> {
    context: &'a RobotContext,
    state: ScanState,
    current_angle: i32,
    obstacle_distance: Option<f32>,
    target_angle: i32,
    next_target: Option<i32>,
    turn_timeout: Option<Timeout>,
    last_full_scan_started: Option<Duration>,
    minimum_full_scan_time: Option<Duration>,
}

impl<'a> HeadTurner<'a> {
    /// Prepares the head motor for a sweep of half-angle `angle` at `power` percent.
    ///
    /// # Arguments
    /// * `angle`: Sweep half-angle in degrees; must lie in the configured scan range.
    /// * `power`: Head power in percent (1..=100). Speed is `max(power × 10, 100)` deg/s.
    pub fn new(context: &'a RobotContext, angle: i32, power: i32) -> Result<Self> {
        validate_angle(context, angle)?;
        if !(1..=100).contains(&power) {
            return Err(MissionFailure::InvalidArgument(format!(
                "HeadTurner power should be in range 1 to 100 percent (found {power})!"
            )));
        }
        let speed = context.config().power_to_speed(power).max(MIN_SCAN_SPEED);
        {
            let mut head = context.hardware().head();
            head.brake();
            head.set_speed(speed);
        }
        Ok(Self {
            context,
            state: ScanState::Ready,
            current_angle: 0,
            obstacle_distance: None,
            target_angle: -angle,
            next_target: None,
            turn_timeout: None,
            last_full_scan_started: None,
            minimum_full_scan_time: None,
        })
    }

    pub fn current_angle(&self) -> i32 {
        self.current_angle
    }

    pub fn obstacle_distance(&self) -> Option<f32> {
        self.obstacle_distance
    }

    /// Latest `(pan angle, range)` pair.
    pub fn sample(&self) -> (i32, Option<f32>) {
        (self.current_angle, self.obstacle_distance)
    }

    pub fn target_angle(&self) -> i32 {
        self.target_angle
    }

    /// Takes the first sample and starts the head towards the nearer extreme's opposite side.
    pub fn start_scanning(&mut self) -> Result<()> {
        if self.state != ScanState::Ready {
            return Err(MissionFailure::InvalidArgument(
                "HeadTurner: startScanning may only be called once!".to_string(),
            ));
        }
        self.sample_sensors();
        if self.current_angle < self.target_angle {
            self.target_angle = -self.target_angle;
        }
        self.start_leg();
        self.state = ScanState::Scanning;
        Ok(())
    }

    /// Sets the half-angle used from the next reversal on. Applied once.
    pub fn change_angle(&mut self, angle: i32) -> Result<()> {
        validate_angle(self.context, angle)?;
        self.next_target = Some(angle);
        Ok(())
    }

    /// Samples the head once and reverses the sweep at either extreme.
    pub fn sensor_tick(&mut self) -> Result<()> {
        match self.state {
            ScanState::Ready => {
                return Err(MissionFailure::InvalidArgument(
                    "HeadTurner: Please call startScanning before calling sensorTick!".to_string(),
                ))
            }
            ScanState::Stopping => {
                return Err(MissionFailure::InvalidArgument(
                    "HeadTurner: Please do not call sensorTick after calling stopScanning!"
                        .to_string(),
                ))
            }
            ScanState::Scanning => {}
        }
        if self.target_angle == 0 {
            return Ok(());
        }
        self.sample_sensors();

        let close_enough = self.context.config().head.close_enough;
        let mut reverse = (self.current_angle - self.target_angle).abs() <= close_enough;
        if !reverse && self.may_query_motion() && !self.context.head_is_moving() {
            reverse = true;
        }

        if reverse {
            let now = self.context.elapsed();
            if let Some(started) = self.last_full_scan_started {
                let scan_time = now.saturating_sub(started);
                self.minimum_full_scan_time = Some(
                    self.minimum_full_scan_time
                        .map_or(scan_time, |fastest| fastest.min(scan_time)),
                );
            }
            let amplitude = self
                .next_target
                .take()
                .unwrap_or_else(|| self.target_angle.abs());
            self.target_angle = -self.target_angle.signum() * amplitude;
            self.last_full_scan_started = Some(now);
            self.start_leg();
        } else if let Some(timeout) = &self.turn_timeout {
            timeout.check()?;
        }

        debug!(
            "........ headTurning (current angle: {} degrees, target angle: {} degrees, obstacle distance: {})",
            self.current_angle,
            self.target_angle,
            self.obstacle_distance
                .map_or("unknown".to_string(), |d| format!("{d:.1} cm"))
        );
        Ok(())
    }

    /// Commands the head back to centre. No further ticks are accepted.
    pub fn stop_scanning(&mut self) {
        self.target_angle = 0;
        self.start_leg();
        self.state = ScanState::Stopping;
    }

    /// Blocks until the head is centred, then de-energizes it.
    pub fn wait_until_stopped(&mut self) -> Result<()> {
        if self.state != ScanState::Stopping {
            return Err(MissionFailure::InvalidArgument(
                "HeadTurner: Please call stopScanning before calling waitUntilStopped!"
                    .to_string(),
            ));
        }
        while self.context.head_is_moving() {
            self.context.check_shutdown()?;
            if let Some(timeout) = &self.turn_timeout {
                timeout.check()?;
            }
            self.context.sleep(STOP_POLL_INTERVAL);
        }
        self.context.hardware().head().coast();
        Ok(())
    }

    // --- Internals ---

    fn sample_sensors(&mut self) {
        self.current_angle = self.context.head_angle();
        self.obstacle_distance = self.context.head_distance();
    }

    /// Querying the motor too often starves the sampling rate, so within one
    /// sweep leg motion is only queried once the fastest full sweep seen so far has elapsed.
    fn may_query_motion(&self) -> bool {
        match (self.last_full_scan_started, self.minimum_full_scan_time) {
            (Some(started), Some(fastest)) => {
                self.context.elapsed().saturating_sub(started) >= fastest
            }
            _ => true,
        }
    }

    fn start_leg(&mut self) {
        self.turn_timeout = Some(self.context.timeout(
            format!("turning head to {} degrees", self.target_angle),
            self.context.config().timeouts.head_leg,
        ));
        self.context.hardware().head().rotate_to(self.target_angle);
    }
}

fn validate_angle(context: &RobotContext, angle: i32) -> Result<()> {
    let head = &context.config().head;
    if angle < head.min_scan_angle || angle > head.max_scan_angle {
        return Err(MissionFailure::InvalidArgument(format!(
            "HeadTurner angle should be in range {} to {} degrees (found {angle})!",
            head.min_scan_angle, head.max_scan_angle
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_context;

    #[test]
    fn rejects_malformed_arguments() {
        let (context, _) = fake_context();
        assert!(HeadTurner::new(&context, 4, 50).is_err());
        assert!(HeadTurner::new(&context, 121, 50).is_err());
        assert!(HeadTurner::new(&context, 30, 0).is_err());
        assert!(HeadTurner::new(&context, 30, 101).is_err());
        let mut turner = HeadTurner::new(&context, 30, 5).unwrap();
        assert!(turner.change_angle(200).is_err());
    }

    #[test]
    fn ticks_require_scanning_state() {
        let (context, _) = fake_context();
        let mut turner = HeadTurner::new(&context, 30, 5).unwrap();
        assert!(turner.sensor_tick().is_err());
        assert!(turner.wait_until_stopped().is_err());
        turner.start_scanning().unwrap();
        turner.stop_scanning();
        assert!(turner.sensor_tick().is_err());
    }

    #[test]
    fn sweep_reverses_and_applies_changed_angle_once() {
        let (context, handles) = fake_context();
        handles.sonar.set(42.0);
        let mut turner = HeadTurner::new(&context, 30, 5).unwrap();
        turner.start_scanning().unwrap();
        // The fake head reaches every target instantly.
        assert_eq!(turner.target_angle(), -30);
        assert_eq!(handles.head.position(), -30);

        turner.change_angle(10).unwrap();
        turner.sensor_tick().unwrap();
        assert_eq!(turner.target_angle(), 10);
        assert_eq!(turner.sample(), (-30, Some(42.0)));

        turner.sensor_tick().unwrap();
        assert_eq!(turner.target_angle(), -10);

        turner.stop_scanning();
        assert_eq!(handles.head.position(), 0);
        turner.wait_until_stopped().unwrap();
        assert!(handles.head.count("coast") >= 1);
    }

    #[test]
    fn starts_towards_the_far_side() {
        let (context, handles) = fake_context();
        handles.head.set_position(-50);
        let mut turner = HeadTurner::new(&context, 20, 5).unwrap();
        turner.start_scanning().unwrap();
        assert_eq!(turner.target_angle(), 20);
    }

    #[test]
    fn stuck_leg_times_out() {
        let (context, handles) = fake_context();
        let mut turner = HeadTurner::new(&context, 30, 5).unwrap();
        turner.start_scanning().unwrap();
        // Hold the head away from the target while it claims to be moving.
        handles.head.set_position(0);
        handles.head.set_moving(true);
        handles.clock.advance(Duration::from_secs(6));
        let err = turner.sensor_tick().unwrap_err();
        assert!(matches!(err, MissionFailure::Timeout { .. }));
    }
}
