// scout_core/src/perception/sweep.rs

//! Stationary head sweeps that fill a [`ProximityMap`].

use tracing::debug;

use super::ProximityMap;
use crate::context::RobotContext;
use crate::error::Result;
use crate::safety::Timeout;

/// Shifts a head-sweep reading from the sensor to the robot's turning midpoint.
///
/// As the head pans away from centre the sensor swings closer to the midpoint,
/// so the shift shrinks by one centimetre per 15 degrees of pan.
pub fn sweep_range_correction(distance: f32, head_angle: i32, eyes_to_midpoint: f32) -> f32 {
    let adjust = (head_angle.abs() / 15) as f32;
    distance + eyes_to_midpoint - adjust
}

/// Sweeps the head to `-angle`, then `+angle`, then back to centre, sampling into `map`.
///
/// # Arguments
/// * `angle`: Sweep half-angle in degrees.
/// * `repeat_pass`: When greater than zero, `map` is first replaced by a fresh `[-angle, angle]` window.
/// * `discovery_mode`: Shift samples to the robot midpoint (see [`sweep_range_correction`]).
pub fn look_around(
    context: &RobotContext,
    map: &mut ProximityMap,
    angle: i32,
    repeat_pass: u32,
    discovery_mode: bool,
) -> Result<()> {
    debug!(
        "Starting lookAround (head position: {} degrees)",
        context.head_angle()
    );
    if repeat_pass > 0 {
        *map = ProximityMap::new(-angle, angle);
    }
    let config = context.config();
    let leg_budget = config.timeouts.head_leg;

    context.check_shutdown()?;
    debug!("........ lookAround (turning head to left: {} degrees)", -angle);
    {
        let mut head = context.hardware().head();
        head.set_speed(config.head.look_around_speed);
        head.rotate_to(-angle);
    }
    let timeout = context.timeout("turning head to left", leg_budget);
    wait_until_head_stops_moving(context, map, &timeout, discovery_mode)?;

    debug!("........ lookAround (turning head to right: {angle} degrees)");
    context.hardware().head().rotate_to(angle);
    let timeout = context.timeout("turning head to right", leg_budget);
    wait_until_head_stops_moving(context, map, &timeout, discovery_mode)?;

    debug!("........ lookAround (turning head to center)");
    context.hardware().head().rotate_to(0);
    let timeout = context.timeout("turning head to center", leg_budget);
    wait_until_head_stops_moving(context, map, &timeout, discovery_mode)?;

    debug!(
        "Finished lookAround (head position: {} degrees, samples: {})",
        context.head_angle(),
        map.count_known()
    );
    Ok(())
}

/// Samples `(head angle, range)` into `map` until the head motor stops.
///
/// Motion is only queried every few samples; each query costs a sample.
pub fn wait_until_head_stops_moving(
    context: &RobotContext,
    map: &mut ProximityMap,
    timeout: &Timeout,
    discovery_mode: bool,
) -> Result<()> {
    let config = context.config();
    let every = config.head.moving_check_every.max(1);
    for pass in 1u32.. {
        context.check_shutdown()?;
        let distance = context.head_distance();
        let angle = context.head_angle();
        if let Some(distance) = distance {
            let distance = if discovery_mode {
                sweep_range_correction(distance, angle, config.body.eyes_to_midpoint)
            } else {
                distance
            };
            map.set(angle, distance);
        }
        if pass % every == 0 && !context.head_is_moving() {
            break;
        }
        timeout.check()?;
    }
    Ok(())
}
