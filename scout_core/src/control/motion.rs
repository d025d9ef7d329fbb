// scout_core/src/control/motion.rs

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::waits::wait_until_base_stops_moving;
use crate::context::RobotContext;
use crate::error::{MissionFailure, Result, StalledWheels};
use crate::geometry::{normalize_degrees, normalize_degrees_i32, Point};
use crate::perception::HeadTurner;
use crate::safety::Bump;

/// Pause after a positional command so the wheels report motion before they are polled.
const MOTOR_START_DELAY: Duration = Duration::from_millis(200);

/// Outcome of a forward move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    /// Distance actually driven, measured from the wheel encoders.
    pub distance: f32,
    /// Dead-reckoned end point, when the move was tracked.
    pub finished_at: Option<Point>,
}

// --- Stall detection ---

/// Flags a wheel whose encoder stopped advancing while it was being driven.
///
/// A wheel stalls once it reports no movement for `tick_limit` consecutive
/// ticks after the warm-up.
#[derive(Debug, Clone)]
struct StallDetector {
    warmup_ticks: u32,
    tick_limit: u32,
    left_zero_ticks: u32,
    right_zero_ticks: u32,
}

impl StallDetector {
    fn new(warmup_ticks: u32, tick_limit: u32) -> Self {
        Self {
            warmup_ticks,
            tick_limit,
            left_zero_ticks: 0,
            right_zero_ticks: 0,
        }
    }

    fn observe(&mut self, pass: u32, left_delta: i32, right_delta: i32) -> Result<()> {
        if pass <= self.warmup_ticks {
            return Ok(());
        }
        self.left_zero_ticks = if left_delta == 0 { self.left_zero_ticks + 1 } else { 0 };
        self.right_zero_ticks = if right_delta == 0 { self.right_zero_ticks + 1 } else { 0 };
        let left = self.left_zero_ticks >= self.tick_limit;
        let right = self.right_zero_ticks >= self.tick_limit;
        match (left, right) {
            (true, true) => Err(MissionFailure::Stall(StalledWheels::Both)),
            (true, false) => Err(MissionFailure::Stall(StalledWheels::Left)),
            (false, true) => Err(MissionFailure::Stall(StalledWheels::Right)),
            (false, false) => Ok(()),
        }
    }
}

// --- Controller ---

/// Turn and move primitives for the two-wheeled base.
pub struct MotionController {
    context: Arc<RobotContext>,
    steps_per_360: Option<i32>,
    bump: Bump,
}

impl MotionController {
    pub fn new(context: Arc<RobotContext>) -> Self {
        let bump = Bump::new(context.config().drive.bump_period);
        Self {
            context,
            steps_per_360: None,
            bump,
        }
    }

    pub fn steps_per_360(&self) -> Option<i32> {
        self.steps_per_360
    }

    pub fn set_steps_per_360(&mut self, steps: i32) {
        self.steps_per_360 = Some(steps);
    }

    /// Rotates the base in place by `angle` degrees (clockwise positive).
    ///
    /// The angle is normalized to (-180, 180] first, so the shorter way round is taken.
    pub fn turn_degrees(&mut self, angle: i32) -> Result<()> {
        debug!("Starting turnDegrees (target: {angle} degrees)");
        let context = &*self.context;
        let config = context.config();
        let timeout = context.timeout("turning base", config.timeouts.turn);
        let start_angle = context.gyro_angle()?;
        let angle = normalize_degrees_i32(angle);
        if angle != 0 {
            let steps_per_360 = self
                .steps_per_360
                .ok_or(MissionFailure::MotorsNotCalibrated)?;
            let speed = config.power_to_speed(config.drive.min_turning_power);
            let steps = (steps_per_360 as f64 * (angle as f64 / 360.0)) as i32;
            {
                let mut base = context.hardware().base();
                base.set_speed(speed);
                base.rotate_in_place(steps);
            }
            context.sleep(MOTOR_START_DELAY);
            wait_until_base_stops_moving(context, &timeout)?;
        }
        debug!(
            "Finished turnDegrees (turned: {} degrees)",
            context.gyro_angle()? - start_angle
        );
        Ok(())
    }

    /// Turns the shortest way onto an absolute gyroscope bearing.
    pub fn turn_to_bearing(&mut self, bearing: f64) -> Result<()> {
        debug!("Starting turnToBearing (target: {bearing:.0} degrees)");
        let current = self.context.gyro_angle()?;
        let delta = normalize_degrees(bearing - current as f64).round() as i32;
        self.turn_degrees(delta)?;
        debug!(
            "Finished turnToBearing (result: {} degrees)",
            self.context.gyro_angle()?
        );
        Ok(())
    }

    /// Drives straight ahead, stopping short of any obstacle the head sees.
    ///
    /// # Returns
    /// The distance actually driven (cm). Zero or negative requests return `0.0`
    /// without touching the motors.
    pub fn move_forward(&mut self, distance: f32) -> Result<f32> {
        self.drive_forward(distance, None).map(|m| m.distance)
    }

    /// Like [`Self::move_forward`], dead-reckoning the end point from `from`
    /// with the gyroscope bearing of every tick.
    pub fn move_forward_tracked(&mut self, distance: f32, from: Point) -> Result<Movement> {
        self.drive_forward(distance, Some(from))
    }

    fn drive_forward(&mut self, distance: f32, start_point: Option<Point>) -> Result<Movement> {
        let context = Arc::clone(&self.context);
        let ctx = context.as_ref();
        let config = ctx.config();
        let drive = &config.drive;
        let body = &config.body;

        let wheel_steps = config.distance_to_steps(distance as f64) as i32;
        debug!("Starting moveForward (distance: {distance:.1} cm, steps: {wheel_steps})");
        let started = ctx.elapsed();
        if distance <= 0.0 {
            debug!("Finished moveForward (distance: 0.0 cm)");
            return Ok(Movement {
                distance: 0.0,
                finished_at: start_point,
            });
        }

        let timeout = ctx.timeout("moving forward", config.timeouts.move_forward);
        let (left_start, right_start) = ctx.base_positions();
        let (mut last_left, mut last_right) = (left_start, right_start);
        let start_angle = ctx.gyro_angle()?;
        let mut stall = StallDetector::new(drive.stall_warmup_ticks, drive.stall_tick_limit);

        let mut ramp_power = drive.min_forward_power;
        let mut target_power = drive.max_forward_power;
        let mut bonus_left = 0;
        let mut bonus_right = 0;
        let mut last_left_power = None;
        let mut last_right_power = None;

        let mut obstacles_ahead: Vec<f32> = Vec::new();
        let mut remaining = distance;
        let mut stopping = drive.stopping_distance;
        let mut accounted_steps = 0;
        let mut tracked = start_point;

        let check_aside = body.safe_passing_width / 2.0;
        let mut lookahead = drive.lookahead;
        let mut head = HeadTurner::new(
            ctx,
            scan_angle(ctx, check_aside, lookahead),
            drive.scan_power,
        )?;

        for pass in 1u32.. {
            ctx.check_shutdown()?;
            self.bump.check(ctx)?;

            // Encoder deltas since the previous tick.
            let (left, right) = ctx.base_positions();
            let delta_left = (left - last_left).max(0);
            let delta_right = (right - last_right).max(0);
            stall.observe(pass, delta_left, delta_right)?;
            last_left = left;
            last_right = right;
            let delta_steps = delta_left.min(delta_right);
            accounted_steps += delta_steps;
            let delta_distance = config.steps_to_distance(delta_steps as f64) as f32;
            remaining -= delta_distance;
            for obstacle in obstacles_ahead.iter_mut() {
                *obstacle = (*obstacle - delta_distance).max(0.0);
            }

            // One head sample per tick.
            if pass == 1 {
                head.start_scanning()?;
            } else {
                head.sensor_tick()?;
            }
            let (head_angle, range) = head.sample();
            if let Some(range) = range {
                if range <= lookahead {
                    let ahead = (head_angle.abs() as f32).to_radians().cos() * range;
                    obstacles_ahead.push(ahead);
                    debug!("........ moveForward (obstacle ahead: {ahead:.1} cm)");
                    lookahead = body.safe_stopping_distance.min(range);
                    head.change_angle(scan_angle(ctx, check_aside, lookahead))?;
                }
            }

            let clear = obstacles_ahead
                .iter()
                .copied()
                .fold(f32::INFINITY, f32::min);
            let safe = clear - body.safe_stopping_distance;
            debug!(
                "........ moveForward (remaining distance: {remaining:.1} cm{}{})",
                if clear.is_finite() { format!(", clear distance: {clear:.1} cm") } else { String::new() },
                if safe.is_finite() { format!(", safe distance: {safe:.1} cm") } else { String::new() }
            );

            let new_angle = ctx.gyro_angle()?;
            if let Some(point) = tracked.as_mut() {
                *point = point.moved(new_angle as f64, delta_distance as f64);
            }

            if safe <= 0.0 {
                stopping = (stopping + safe).max(0.0);
                break;
            }
            if remaining <= stopping {
                stopping = remaining.max(0.0);
                break;
            }

            // Decelerate on approach to the destination or an obstacle.
            let approach = remaining.min(safe);
            if approach <= drive.deceleration_threshold {
                let new_target = (approach as i32).max(drive.min_forward_power).min(target_power);
                let factor = new_target as f32 / target_power as f32;
                bonus_left = (bonus_left as f32 * factor) as i32;
                bonus_right = (bonus_right as f32 * factor) as i32;
                target_power = new_target;
            }
            let current_power = ramp_power.min(target_power);
            ramp_power = (ramp_power + drive.ramp_step).min(target_power);

            // Heading correction: speed up the wheel on the side we drifted towards.
            let angle_delta = new_angle - start_angle;
            if angle_delta < 0 {
                bonus_right = 0;
                bonus_left += 1;
            }
            if angle_delta > 0 {
                bonus_left = 0;
                bonus_right += 1;
            }
            let left_power = (current_power + bonus_left).min(100 - bonus_right).max(0);
            let right_power = (current_power + bonus_right).min(100 - bonus_left).max(0);
            debug!(
                "........ moveForward (gyroscope delta: {angle_delta} degrees, target power: {target_power}%, left power: {left_power}%, right power: {right_power}%)"
            );

            if last_left_power != Some(left_power) || last_right_power != Some(right_power) {
                let mut base = ctx.hardware().base();
                if last_left_power != Some(left_power) {
                    base.left.set_speed(config.power_to_speed(left_power));
                    base.left.forward();
                    last_left_power = Some(left_power);
                }
                if last_right_power != Some(right_power) {
                    base.right.set_speed(config.power_to_speed(right_power));
                    base.right.forward();
                    last_right_power = Some(right_power);
                }
            }
            timeout.check()?;
        }

        // Roll out the stopping distance, never past what was requested.
        debug!("........ moveForward (stopping distance: {stopping:.1} cm)");
        let roll_steps = config.distance_to_steps(stopping as f64) as i32;
        {
            let mut base = ctx.hardware().base();
            if roll_steps < drive.hard_stop_steps {
                base.stop();
            } else {
                base.brake();
                base.set_speed(config.power_to_speed(drive.min_forward_power));
                let (left, right) = base.positions();
                base.left
                    .rotate_to(left.max(left_start + accounted_steps + roll_steps));
                base.right
                    .rotate_to(right.max(right_start + accounted_steps + roll_steps));
            }
        }
        head.stop_scanning();
        let stop_timeout = ctx.timeout("forward movement", config.timeouts.stop);
        wait_until_base_stops_moving(ctx, &stop_timeout)?;
        ctx.hardware().base().coast();
        head.wait_until_stopped()?;

        let (left, right) = ctx.base_positions();
        let final_steps = (left - left_start).min(right - right_start).max(0);
        let travelled = config.steps_to_distance(final_steps as f64) as f32;
        if let Some(point) = tracked.as_mut() {
            *point = point.moved(ctx.gyro_angle()? as f64, stopping as f64);
        }

        let straight = match (start_point, tracked) {
            (Some(from), Some(to)) => format!(", straight: {:.1} cm", from.distance_to(&to)),
            _ => String::new(),
        };
        debug!(
            "Finished moveForward (distance: {travelled:.1} cm{straight}, time: {} ms)",
            ctx.elapsed().saturating_sub(started).as_millis()
        );
        Ok(Movement {
            distance: travelled,
            finished_at: tracked,
        })
    }

    /// Open-loop move ahead at a fixed low power. No obstacle or heading checks.
    pub fn step_forward(&mut self, distance: f32) -> Result<f32> {
        self.step(distance, 1, "stepForward", "stepping forward")
    }

    /// Open-loop move backwards at a fixed low power.
    pub fn step_backward(&mut self, distance: f32) -> Result<f32> {
        self.step(distance, -1, "stepBackward", "stepping backward")
    }

    fn step(&mut self, distance: f32, direction: i32, name: &str, activity: &str) -> Result<f32> {
        let ctx = &*self.context;
        let config = ctx.config();
        let wheel_steps = config.distance_to_steps(distance as f64) as i32;
        debug!("Starting {name} (distance: {distance:.1} cm, steps: {wheel_steps})");
        if distance <= 0.0 {
            debug!("Finished {name} (distance: 0.0 cm)");
            return Ok(0.0);
        }
        let metres = (distance as f64 / 100.0).ceil();
        let timeout = ctx.timeout(activity, config.timeouts.step_per_metre * metres);

        let (left_start, right_start) = ctx.base_positions();
        {
            let mut base = ctx.hardware().base();
            base.set_speed(config.power_to_speed(config.drive.step_power));
            base.rotate_by(direction * wheel_steps);
        }
        ctx.sleep(MOTOR_START_DELAY);
        wait_until_base_stops_moving(ctx, &timeout)?;
        ctx.hardware().base().coast();

        let (left, right) = ctx.base_positions();
        let steps = (left - left_start).abs().min((right - right_start).abs());
        let travelled = config.steps_to_distance(steps as f64) as f32;
        debug!("Finished {name} (distance: {travelled:.1} cm)");
        Ok(travelled)
    }
}

/// Head sweep half-angle that covers `aside` centimetres either side at `ahead` centimetres.
fn scan_angle(context: &RobotContext, aside: f32, ahead: f32) -> i32 {
    let head = &context.config().head;
    let degrees = if ahead > 0.0 {
        (aside / ahead).atan().to_degrees() as i32
    } else {
        90
    };
    degrees.clamp(head.min_scan_angle, head.max_scan_angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_context;

    fn controller() -> (MotionController, crate::testing::FakeHandles) {
        let (context, handles) = fake_context();
        handles.gyro.push_angles(&[0.0]);
        assert!(context.accept_gyro_if_zeroed());
        (MotionController::new(Arc::new(context)), handles)
    }

    #[test]
    fn zero_or_negative_move_does_nothing() {
        let (mut motion, handles) = controller();
        assert_eq!(motion.move_forward(0.0).unwrap(), 0.0);
        assert_eq!(motion.move_forward(-25.0).unwrap(), 0.0);
        assert_eq!(motion.step_backward(0.0).unwrap(), 0.0);
        assert_eq!(handles.left.count("forward"), 0);
        assert_eq!(handles.left.count("rotate_to"), 0);
        assert_eq!(handles.head.count("rotate_to"), 0);
    }

    #[test]
    fn turning_requires_calibration() {
        let (mut motion, _) = controller();
        assert!(matches!(
            motion.turn_degrees(90),
            Err(MissionFailure::MotorsNotCalibrated)
        ));
        // A zero turn is a no-op even uncalibrated.
        motion.turn_degrees(360).unwrap();
    }

    #[test]
    fn turn_uses_calibrated_steps_the_short_way() {
        let (mut motion, handles) = controller();
        motion.set_steps_per_360(720);
        motion.turn_degrees(270).unwrap();
        // 270° normalizes to -90°: the left wheel backs up a quarter of 720 steps.
        assert_eq!(handles.left.position(), -180);
        assert_eq!(handles.right.position(), 180);
    }

    #[test]
    fn turn_to_bearing_uses_shortest_delta() {
        let (mut motion, handles) = controller();
        motion.set_steps_per_360(720);
        handles.gyro.push_angles(&[350.0]);
        motion.turn_to_bearing(10.0).unwrap();
        assert_eq!(handles.left.position(), 40);
        assert_eq!(handles.right.position(), -40);
    }

    #[test]
    fn step_backward_reports_encoder_distance() {
        let (mut motion, handles) = controller();
        let travelled = motion.step_backward(10.0).unwrap();
        // 10 cm on a 5.6 cm wheel is 204 whole steps.
        assert_eq!(handles.left.position(), -204);
        assert!((travelled - 9.97).abs() < 0.01);
    }

    #[test]
    fn stall_detector_names_the_stuck_wheel() {
        let mut stall = StallDetector::new(2, 1);
        assert!(stall.observe(1, 0, 0).is_ok());
        assert!(stall.observe(2, 0, 0).is_ok());
        assert!(stall.observe(3, 5, 5).is_ok());
        assert!(matches!(
            stall.observe(4, 0, 5),
            Err(MissionFailure::Stall(StalledWheels::Left))
        ));

        let mut stall = StallDetector::new(0, 1);
        assert!(stall.observe(1, 4, 3).is_ok());
        assert!(matches!(
            stall.observe(2, 0, 0),
            Err(MissionFailure::Stall(StalledWheels::Both))
        ));
    }

    #[test]
    fn stall_limit_counts_consecutive_idle_ticks() {
        let mut stall = StallDetector::new(0, 2);
        assert!(stall.observe(1, 4, 0).is_ok());
        assert!(stall.observe(2, 4, 3).is_ok());
        assert!(stall.observe(3, 4, 0).is_ok());
        assert!(matches!(
            stall.observe(4, 4, 0),
            Err(MissionFailure::Stall(StalledWheels::Right))
        ));
    }

    #[test]
    fn scan_angle_tracks_lookahead() {
        let (context, _) = fake_context();
        assert_eq!(scan_angle(&context, 15.0, 80.0), 10);
        assert_eq!(scan_angle(&context, 15.0, 20.0), 36);
        assert_eq!(scan_angle(&context, 15.0, 0.0), 90);
        assert_eq!(scan_angle(&context, 15.0, 1000.0), 5);
    }
}
