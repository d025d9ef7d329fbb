// scout_core/src/control/calibration.rs

use std::time::Duration;
use tracing::{debug, warn};

use super::waits::wait_until_base_stops_rotating;
use crate::context::RobotContext;
use crate::error::{fail, MissionFailure, Result};
use crate::perception::ProximityMap;

/// Re-initializes the gyroscope until a fresh reading is exactly zero.
///
/// Each pass waits longer for the sensor to settle. Gives up with a timeout
/// failure once the calibration budget is spent.
pub fn calibrate_gyroscope(context: &RobotContext) -> Result<()> {
    debug!("Starting calibrateGyroscope");
    let config = context.config();
    let timeout = context.timeout("gyroscope calibration", config.timeouts.gyro_calibration);
    let unit = Duration::from_millis(config.calibration.gyro_settle_ms);
    for pass in 1u32.. {
        context.check_shutdown()?;
        context.sleep(unit * 2 * pass);
        context.reinitialize_gyro();
        context.sleep(unit * 2 * pass);
        if context.accept_gyro_if_zeroed() {
            break;
        }
        timeout.check()?;
        debug!("........ calibrateGyroscope (retrying)");
        if pass == config.calibration.gyro_warning_pass {
            warn!(
                "I'm having some trouble with my gyroscope calibration. \
                 If it doesn't work, I might need to be powered off and restarted!"
            );
        }
    }
    debug!("Finished calibrateGyroscope");
    Ok(())
}

/// Measures how many wheel steps turn the robot through a full circle.
///
/// The wheels are driven a fixed number of steps in opposite directions and the
/// gyroscope delta is scaled up to 360°. The rotation is then completed to a
/// full turn. While the base rotates, the centred head records a 360° view
/// into `map`, which is replaced by a fresh `[-180, 180]` window.
///
/// # Returns
/// The calibrated steps per 360°, or a failure if it falls outside the configured range.
pub fn calibrate_motors(
    context: &RobotContext,
    map: &mut ProximityMap,
    discovery_mode: bool,
) -> Result<i32> {
    let start_angle = context.gyro_angle()?;
    debug!("Starting calibrateMotors (angle: {start_angle} degrees)");
    *map = ProximityMap::new(-180, 180);
    let config = context.config();
    let calibration = &config.calibration;
    let timeout = context.timeout("motor calibration", config.timeouts.motor_calibration);

    {
        let mut base = context.hardware().base();
        base.set_speed(calibration.speed);
        base.rotate_in_place(calibration.fixed_steps);
    }
    wait_until_base_stops_rotating(context, &timeout, map, start_angle, discovery_mode)?;

    let middle_angle = context.gyro_angle()?;
    let turned = (middle_angle - start_angle).abs();
    if turned == 0 {
        return fail("Gyroscope registered no rotation during motor calibration!");
    }
    let full_turn_steps = (calibration.fixed_steps as f64 * (360.0 / turned as f64)) as i64;
    debug!("........ calibrateMotors (full turn: {full_turn_steps} steps)");
    if full_turn_steps < calibration.min_steps as i64 || full_turn_steps > calibration.max_steps as i64
    {
        return Err(MissionFailure::CalibrationOutOfRange {
            found: full_turn_steps,
            min: calibration.min_steps,
            max: calibration.max_steps,
        });
    }
    let full_turn_steps = full_turn_steps as i32;

    let remaining_steps = full_turn_steps - calibration.fixed_steps;
    context.hardware().base().rotate_in_place(remaining_steps);
    wait_until_base_stops_rotating(context, &timeout, map, start_angle, discovery_mode)?;

    debug!(
        "Finished calibrateMotors (angle: {} degrees)",
        context.gyro_angle()?
    );
    Ok(full_turn_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_context;

    #[test]
    fn gyroscope_accepted_once_reading_is_zero() {
        let (context, handles) = fake_context();
        handles.gyro.push_angles(&[3.0, 1.0, 0.0]);
        calibrate_gyroscope(&context).unwrap();
        assert_eq!(handles.gyro.reinitialize_count(), 3);
        assert_eq!(context.gyro_angle().unwrap(), 0);
    }

    #[test]
    fn gyroscope_calibration_times_out() {
        let (context, handles) = fake_context();
        handles.gyro.push_angles(&[5.0]);
        let err = calibrate_gyroscope(&context).unwrap_err();
        assert!(matches!(err, MissionFailure::Timeout { .. }));
        assert!(context.gyro_angle().is_err());
    }

    #[test]
    fn motors_calibrate_from_gyro_delta() {
        let (context, handles) = fake_context();
        handles.sonar.set(50.0);
        handles.gyro.push_angles(&[0.0, 0.0, 233.0]);
        assert!(context.accept_gyro_if_zeroed());
        let mut map = ProximityMap::new(-10, 10);
        let steps = calibrate_motors(&context, &mut map, false).unwrap();
        assert_eq!(steps, 772);
        assert_eq!(map.min_angle(), -180);
        assert_eq!(map.get(-127), Some(50.0));
        // 500 steps, then the remaining 272 steps of the full turn.
        assert_eq!(handles.left.position(), 772);
        assert_eq!(handles.right.position(), -772);
    }

    #[test]
    fn motors_out_of_range_fail() {
        let (context, handles) = fake_context();
        handles.gyro.push_angles(&[0.0, 0.0, 90.0]);
        assert!(context.accept_gyro_if_zeroed());
        let mut map = ProximityMap::new(-10, 10);
        match calibrate_motors(&context, &mut map, false) {
            Err(MissionFailure::CalibrationOutOfRange { found, min, max }) => {
                assert_eq!((found, min, max), (2000, 600, 1200));
            }
            other => panic!("expected calibration failure, got {other:?}"),
        }
    }

    #[test]
    fn motors_without_rotation_fail() {
        let (context, handles) = fake_context();
        handles.gyro.push_angles(&[0.0]);
        assert!(context.accept_gyro_if_zeroed());
        let mut map = ProximityMap::new(-10, 10);
        assert!(calibrate_motors(&context, &mut map, false).is_err());
    }
}
