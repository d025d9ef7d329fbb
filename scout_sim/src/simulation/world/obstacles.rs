// scout_sim/src/simulation/world/obstacles.rs

use nalgebra::{Point2, Vector2};

use crate::simulation::config::WorldSection;

/// A straight wall segment in world coordinates (cm).
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
}

impl Segment {
    pub fn new(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            a: Point2::new(a[0], a[1]),
            b: Point2::new(b[0], b[1]),
        }
    }

    pub fn closest_point(&self, p: &Point2<f64>) -> Point2<f64> {
        let edge = self.b - self.a;
        let length_squared = edge.norm_squared();
        if length_squared == 0.0 {
            return self.a;
        }
        let t = ((p - self.a).dot(&edge) / length_squared).clamp(0.0, 1.0);
        self.a + edge * t
    }

    pub fn distance_to(&self, p: &Point2<f64>) -> f64 {
        nalgebra::distance(p, &self.closest_point(p))
    }

    /// Distance along a unit ray from `origin` to this segment, if the ray hits it.
    pub fn ray_hit(&self, origin: &Point2<f64>, direction: &Vector2<f64>) -> Option<f64> {
        let edge = self.b - self.a;
        let denominator = cross(direction, &edge);
        if denominator.abs() < 1e-12 {
            return None;
        }
        let to_start = self.a - origin;
        let along_ray = cross(&to_start, &edge) / denominator;
        let along_edge = cross(&to_start, direction) / denominator;
        (along_ray >= 0.0 && (0.0..=1.0).contains(&along_edge)).then_some(along_ray)
    }
}

fn cross(u: &Vector2<f64>, v: &Vector2<f64>) -> f64 {
    u.x * v.y - u.y * v.x
}

/// Unit vector of a compass bearing (degrees clockwise from +y).
pub fn bearing_vector(bearing: f64) -> Vector2<f64> {
    let radians = bearing.to_radians();
    Vector2::new(radians.sin(), radians.cos())
}

/// Flattens the room, walls and boxes of a scenario into segments.
pub fn segments_from_world(world: &WorldSection) -> Vec<Segment> {
    let mut segments = Vec::new();
    if let Some(room) = &world.room {
        segments.extend(rectangle(room.min, room.max));
    }
    for wall in &world.walls {
        segments.push(Segment::new(wall.from, wall.to));
    }
    for b in &world.boxes {
        let half = [b.size[0] / 2.0, b.size[1] / 2.0];
        segments.extend(rectangle(
            [b.center[0] - half[0], b.center[1] - half[1]],
            [b.center[0] + half[0], b.center[1] + half[1]],
        ));
    }
    segments
}

fn rectangle(min: [f64; 2], max: [f64; 2]) -> [Segment; 4] {
    [
        Segment::new([min[0], min[1]], [max[0], min[1]]),
        Segment::new([max[0], min[1]], [max[0], max[1]]),
        Segment::new([max[0], max[1]], [min[0], max[1]]),
        Segment::new([min[0], max[1]], [min[0], min[1]]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::{BoxConfig, RoomConfig};
    use approx::assert_relative_eq;

    #[test]
    fn ray_hits_wall_ahead_only() {
        let wall = Segment::new([-50.0, 40.0], [50.0, 40.0]);
        let origin = Point2::new(0.0, 0.0);
        assert_relative_eq!(wall.ray_hit(&origin, &bearing_vector(0.0)).unwrap(), 40.0);
        let diagonal = wall.ray_hit(&origin, &bearing_vector(45.0)).unwrap();
        assert_relative_eq!(diagonal, 40.0 * 2f64.sqrt(), epsilon = 1e-9);
        assert!(wall.ray_hit(&origin, &bearing_vector(180.0)).is_none());
        assert!(wall.ray_hit(&origin, &bearing_vector(90.0)).is_none());
    }

    #[test]
    fn closest_point_clamps_to_endpoints() {
        let wall = Segment::new([0.0, 0.0], [10.0, 0.0]);
        assert_relative_eq!(wall.distance_to(&Point2::new(5.0, 3.0)), 3.0);
        assert_relative_eq!(wall.distance_to(&Point2::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn room_and_boxes_become_segments() {
        let world = WorldSection {
            room: Some(RoomConfig {
                min: [-100.0, -100.0],
                max: [100.0, 100.0],
            }),
            boxes: vec![BoxConfig {
                center: [0.0, 50.0],
                size: [20.0, 10.0],
            }],
            ..WorldSection::default()
        };
        let segments = segments_from_world(&world);
        assert_eq!(segments.len(), 8);
        let nearest = segments
            .iter()
            .filter_map(|s| s.ray_hit(&Point2::origin(), &bearing_vector(0.0)))
            .fold(f64::INFINITY, f64::min);
        assert_relative_eq!(nearest, 45.0);
    }
}
