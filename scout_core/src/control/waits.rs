// scout_core/src/control/waits.rs

use crate::context::RobotContext;
use crate::error::Result;
use crate::perception::ProximityMap;
use crate::safety::Timeout;

/// Polls the drive wheels until both have stopped.
pub fn wait_until_base_stops_moving(context: &RobotContext, timeout: &Timeout) -> Result<()> {
    loop {
        context.check_shutdown()?;
        if !context.base_is_moving() {
            return Ok(());
        }
        timeout.check()?;
    }
}

/// Waits for an in-place rotation to finish while recording what the
/// (centred) head sees into `map`, keyed by heading relative to `start_angle`.
///
/// Angles wrap by whole turns into the map's window. Base motion is queried
/// only every few passes so the sampling rate stays high.
pub fn wait_until_base_stops_rotating(
    context: &RobotContext,
    timeout: &Timeout,
    map: &mut ProximityMap,
    start_angle: i32,
    discovery_mode: bool,
) -> Result<()> {
    let config = context.config();
    let every = config.calibration.moving_check_every.max(1);
    for pass in 1u32.. {
        context.check_shutdown()?;
        let angle = context.gyro_angle()? - start_angle;
        if let Some(distance) = context.head_distance() {
            let distance = if discovery_mode {
                distance + config.body.eyes_to_midpoint
            } else {
                distance
            };
            map.set_wrapped(angle, distance);
        }
        if pass % every == 0 && !context.base_is_moving() {
            break;
        }
        timeout.check()?;
    }
    Ok(())
}
