// scout_sim/src/missions/avoidance.rs

use tracing::debug;

use scout_core::error::{fail, Result};
use scout_core::robot::Robot;

/// Closer than this straight ahead, the robot backs off before turning.
const STEP_BACK_BELOW: f32 = 15.0;
const STEP_BACK_DISTANCE: f32 = 10.0;
const AHEAD_CHECKS: usize = 5;

/// Repeatedly turns towards the middle of the widest safe opening and drives
/// into it, stopping a safe distance short, for at most `passes` passes.
pub fn run(robot: &mut Robot, passes: u32) -> Result<()> {
    debug!("Starting avoidanceMission");
    robot.calibrate()?;
    let config = robot.context().config().clone();

    for pass in 1..=passes {
        // The first pass uses the full-circle view recorded during calibration.
        if pass > 1 {
            robot.look_around_default(1)?;
        }

        let mut must_step_back = false;
        for _ in 0..AHEAD_CHECKS {
            let old = robot.proximity_map().get(0);
            if let Some(new) = robot.head_distance() {
                if new < STEP_BACK_BELOW && old.map_or(true, |old| new < old) {
                    must_step_back = true;
                    robot.proximity_map_mut().set(0, new);
                }
            }
        }
        if must_step_back {
            debug!("........ avoidanceMission (must step back)");
            robot.step_backward(STEP_BACK_DISTANCE)?;
            robot.look_around_default(1)?;
        }

        let map = robot.proximity_map_mut();
        map.adjust_for_safe_passing(config.body.safe_passing_width);
        let Some((angle, distance)) = map
            .max_distance_angle()
            .and_then(|angle| map.get(angle).map(|d| (angle, d)))
        else {
            return fail("I can't see any opening around me!");
        };
        debug!("........ avoidanceMission (target angle: {angle}, distance: {distance:.1})");
        let angle = map.middle_with_similar_distance(distance);
        let distance = map.get(angle).unwrap_or(distance);
        debug!("........ avoidanceMission (middle angle: {angle}, distance: {distance:.1})");

        let target_angle = robot.gyro_angle()? + angle;
        robot.turn_degrees(angle)?;
        let new_angle = robot.gyro_angle()?;
        if new_angle != target_angle {
            robot.turn_degrees(target_angle - new_angle)?;
        }
        robot.move_forward(distance - config.body.safe_stopping_distance)?;
    }
    debug!("Finished avoidanceMission");
    Ok(())
}
