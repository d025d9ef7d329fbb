// scout_core/src/perception/proximity.rs

use std::fmt;

use crate::geometry::distance_between_polar_degrees;

/// Fraction either side of a reference distance that still counts as "similar".
const SIMILARITY_TOLERANCE: f32 = 0.2;

/// A fixed angular window of range samples around the robot.
///
/// Each whole-degree slot in `[min_angle, max_angle]` holds a distance in
/// centimetres or `None` when nothing trustworthy has been measured there.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityMap {
    min_angle: i32,
    max_angle: i32,
    distances: Vec<Option<f32>>,
}

impl ProximityMap {
    /// Creates an all-unknown window. The bounds are swapped if given in reverse.
    pub fn new(min_angle: i32, max_angle: i32) -> Self {
        let (min_angle, max_angle) = if min_angle <= max_angle {
            (min_angle, max_angle)
        } else {
            (max_angle, min_angle)
        };
        Self {
            min_angle,
            max_angle,
            distances: vec![None; (max_angle - min_angle + 1) as usize],
        }
    }

    pub fn min_angle(&self) -> i32 {
        self.min_angle
    }

    pub fn max_angle(&self) -> i32 {
        self.max_angle
    }

    pub fn contains_angle(&self, angle: i32) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }

    fn slot(&self, angle: i32) -> Option<usize> {
        self.contains_angle(angle)
            .then(|| (angle - self.min_angle) as usize)
    }

    /// Distance at `angle`; `None` if unknown or outside the window.
    pub fn get(&self, angle: i32) -> Option<f32> {
        self.slot(angle).and_then(|i| self.distances[i])
    }

    /// Stores a distance. Out-of-window angles and negative or non-finite
    /// distances are ignored.
    pub fn set(&mut self, angle: i32, distance: f32) {
        if !distance.is_finite() || distance < 0.0 {
            return;
        }
        if let Some(i) = self.slot(angle) {
            self.distances[i] = Some(distance);
        }
    }

    /// Stores a distance after wrapping `angle` by whole turns into the window.
    ///
    /// Used while the base rotates: a gyro delta of 200° lands at -160° of a
    /// full-circle window.
    pub fn set_wrapped(&mut self, angle: i32, distance: f32) {
        let mut angle = angle;
        while angle < 0 && angle < self.min_angle {
            angle += 360;
        }
        while angle > 0 && angle > self.max_angle {
            angle -= 360;
        }
        self.set(angle, distance);
    }

    pub fn reset(&mut self) {
        self.distances.iter_mut().for_each(|d| *d = None);
    }

    pub fn count_known(&self) -> usize {
        self.distances.iter().filter(|d| d.is_some()).count()
    }

    /// Known samples in ascending angle order.
    pub fn known(&self) -> impl Iterator<Item = (i32, f32)> + '_ {
        self.distances
            .iter()
            .enumerate()
            .filter_map(move |(i, d)| d.map(|d| (self.min_angle + i as i32, d)))
    }

    /// Fills unknown runs between adjacent known rays whose endpoints are closer
    /// together than `safe_width`, interpolating distances linearly by angle.
    ///
    /// A filled run marks a gap too narrow for the robot to pass through.
    pub fn adjust_for_safe_passing(&mut self, safe_width: f32) {
        let known: Vec<(i32, f32)> = self.known().collect();
        for pair in known.windows(2) {
            let (angle1, distance1) = pair[0];
            let (angle2, distance2) = pair[1];
            let span = angle2 - angle1;
            if span < 2 {
                continue;
            }
            let gap = distance_between_polar_degrees(
                angle1 as f64,
                distance1 as f64,
                angle2 as f64,
                distance2 as f64,
            );
            if gap >= safe_width as f64 {
                continue;
            }
            let per_degree = (distance2 - distance1) / span as f32;
            for step in 1..span {
                self.set(angle1 + step, distance1 + step as f32 * per_degree);
            }
        }
    }

    /// Angle of the largest positive known distance, lowest angle on ties.
    ///
    /// `None` when nothing is known or every known distance is zero.
    pub fn max_distance_angle(&self) -> Option<i32> {
        let mut best: Option<i32> = None;
        let mut max = 0.0;
        for (angle, distance) in self.known() {
            if distance > max {
                max = distance;
                best = Some(angle);
            }
        }
        best
    }

    /// Like [`Self::max_distance_angle`] but returns `0` when no positive distance is known.
    pub fn angle_with_maximum_distance(&self) -> i32 {
        self.max_distance_angle().unwrap_or(0)
    }

    /// Angles whose known distance is within 20% of `distance`.
    pub fn angles_with_similar_distance(&self, distance: f32) -> Vec<i32> {
        if distance.is_nan() || distance <= 0.0 {
            return Vec::new();
        }
        let low = 1.0 - SIMILARITY_TOLERANCE;
        let high = 1.0 + SIMILARITY_TOLERANCE;
        self.known()
            .filter(|(_, d)| {
                let ratio = d / distance;
                ratio >= low && ratio <= high
            })
            .map(|(angle, _)| angle)
            .collect()
    }

    /// The middle element of [`Self::angles_with_similar_distance`], or `0` when none match.
    pub fn middle_with_similar_distance(&self, distance: f32) -> i32 {
        let angles = self.angles_with_similar_distance(distance);
        angles.get(angles.len() / 2).copied().unwrap_or(0)
    }
}

impl fmt::Display for ProximityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{count: {}", self.count_known())?;
        for (angle, distance) in self.known() {
            write!(f, ", {angle}: {distance:.1}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn out_of_window_is_unknown_and_ignored() {
        let mut map = ProximityMap::new(-10, 10);
        map.set(11, 40.0);
        map.set(-11, 40.0);
        assert_eq!(map.get(11), None);
        assert_eq!(map.get(-11), None);
        assert_eq!(map.count_known(), 0);

        map.set(-10, 12.5);
        map.set(10, 0.0);
        assert_eq!(map.get(-10), Some(12.5));
        assert_eq!(map.get(10), Some(0.0));
    }

    #[test]
    fn invalid_distances_are_not_stored() {
        let mut map = ProximityMap::new(0, 5);
        map.set(1, f32::NAN);
        map.set(2, -3.0);
        map.set(3, f32::INFINITY);
        assert_eq!(map.count_known(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut map = ProximityMap::new(-2, 2);
        for angle in -2..=2 {
            map.set(angle, 10.0);
        }
        map.reset();
        assert_eq!(map.count_known(), 0);
    }

    #[test]
    fn narrow_gap_is_filled_by_interpolation() {
        let mut map = ProximityMap::new(-10, 10);
        map.set(-5, 50.0);
        map.set(5, 50.0);
        map.adjust_for_safe_passing(30.0);
        for angle in -4..=4 {
            let distance = map.get(angle).expect("gap should be filled");
            assert_abs_diff_eq!(distance, 50.0, epsilon = 1e-4);
        }
        assert_eq!(map.get(-6), None);
        assert_eq!(map.get(6), None);
    }

    #[test]
    fn interpolation_follows_the_slope() {
        let mut map = ProximityMap::new(0, 4);
        map.set(0, 40.0);
        map.set(4, 48.0);
        map.adjust_for_safe_passing(30.0);
        assert_abs_diff_eq!(map.get(1).unwrap(), 42.0, epsilon = 1e-4);
        assert_abs_diff_eq!(map.get(2).unwrap(), 44.0, epsilon = 1e-4);
        assert_abs_diff_eq!(map.get(3).unwrap(), 46.0, epsilon = 1e-4);
    }

    #[test]
    fn wide_gap_is_left_alone() {
        let mut map = ProximityMap::new(-90, 90);
        map.set(-60, 100.0);
        map.set(60, 100.0);
        map.set(80, 5.0);
        let before = map.clone();
        map.adjust_for_safe_passing(30.0);
        // -60..60 spans a 173 cm chord; 60..80 spans ~95 cm.
        assert_eq!(map, before);
        map.adjust_for_safe_passing(30.0);
        assert_eq!(map, before);
    }

    #[test]
    fn maximum_distance_prefers_lowest_angle() {
        let mut map = ProximityMap::new(-20, 20);
        assert_eq!(map.angle_with_maximum_distance(), 0);
        assert_eq!(map.max_distance_angle(), None);

        map.set(-3, 80.0);
        map.set(7, 80.0);
        map.set(12, 60.0);
        assert_eq!(map.angle_with_maximum_distance(), -3);
        assert_eq!(map.max_distance_angle(), Some(-3));
    }

    #[test]
    fn all_zero_distances_have_no_maximum() {
        let mut map = ProximityMap::new(-20, 20);
        map.set(-5, 0.0);
        map.set(4, 0.0);
        assert_eq!(map.max_distance_angle(), None);
        assert_eq!(map.angle_with_maximum_distance(), 0);
    }

    #[test]
    fn middle_of_similar_distances() {
        let mut map = ProximityMap::new(-10, 10);
        for angle in -6..=2 {
            map.set(angle, 100.0 + angle as f32);
        }
        map.set(5, 30.0);
        let angles = map.angles_with_similar_distance(100.0);
        assert_eq!(angles, (-6..=2).collect::<Vec<_>>());
        assert_eq!(map.middle_with_similar_distance(100.0), -2);
        assert_eq!(map.middle_with_similar_distance(500.0), 0);
    }

    #[test]
    fn wrapped_angles_land_in_full_circle() {
        let mut map = ProximityMap::new(-180, 180);
        map.set_wrapped(200, 33.0);
        map.set_wrapped(-270, 44.0);
        assert_eq!(map.get(-160), Some(33.0));
        assert_eq!(map.get(90), Some(44.0));
    }

    #[test]
    fn display_lists_known_samples() {
        let mut map = ProximityMap::new(-1, 1);
        map.set(-1, 12.34);
        map.set(1, 5.0);
        assert_eq!(map.to_string(), "{count: 2, -1: 12.3, 1: 5.0}");
    }
}
