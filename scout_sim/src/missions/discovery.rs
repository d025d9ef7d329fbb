// scout_sim/src/missions/discovery.rs

use tracing::{debug, info};

use scout_core::error::Result;
use scout_core::geometry::Point;
use scout_core::robot::Robot;

/// Head sweep half-angle between discovery passes.
const DISCOVERY_ANGLE: i32 = 135;

/// Calibrates, then repeatedly maps the surroundings and drives to the nearest
/// unexplored safe cell, for at most `passes` passes.
pub fn run(robot: &mut Robot, passes: u32) -> Result<()> {
    robot.set_discovery_mode(true);
    let result = discover(robot, passes);
    robot.set_discovery_mode(false);
    result
}

fn discover(robot: &mut Robot, passes: u32) -> Result<()> {
    debug!("Starting discoveryMission");
    robot.say("Let me have a look around.");
    robot.calibrate()?;

    // The calibration sweep is relative to the heading the gyro was zeroed at.
    let mut relative_to = 0;
    for pass in 1..=passes {
        if pass > 1 {
            robot.look_around(DISCOVERY_ANGLE, 1)?;
            relative_to = robot.gyro_angle()?;
        }
        robot.add_obstacles(relative_to as f64);

        let map = robot.discovery_map_mut();
        map.choose_target();
        let Some(target) = map.target_cell() else {
            info!("Nothing left to discover after {} passes", pass - 1);
            robot.say("I have seen everything I can reach.");
            break;
        };
        debug!(
            "........ discoveryMission (cells to target: {})",
            map.cells_to_target().len()
        );
        map.smoothen_path();
        let midpoint = map.cell(target).midpoint;
        let from = map.robot_location();
        let points = map.points_to_target().to_vec();
        info!(
            "Pass {pass}: heading for {} via {} waypoints ({} cells known)",
            map.cell(target),
            points.len().saturating_sub(1),
            map.count_known()
        );

        move_to_target(robot, from, &points)?;
        robot.discovery_map_mut().set_robot_location(midpoint);
    }
    debug!("Finished discoveryMission");
    Ok(())
}

/// Turns onto and drives each leg of the path, dead-reckoning the robot location.
fn move_to_target(robot: &mut Robot, start: Point, points: &[Point]) -> Result<()> {
    let mut from = start;
    for to in points.iter().skip(1) {
        let bearing = from.bearing_to(to).round();
        let distance = from.distance_to(to);
        debug!("........ discoveryMission (from: {from}, to: {to}, bearing: {bearing}, distance: {distance:.1})");
        robot.turn_to_bearing(bearing)?;
        let movement = robot.move_forward_tracked(distance as f32, from)?;
        let finished = movement.finished_at.unwrap_or(*to);
        robot.discovery_map_mut().set_robot_location(finished);
        debug!(
            "........ discoveryMission (distance error: {:.1} cm)",
            to.distance_to(&finished)
        );
        from = finished;
    }
    Ok(())
}
