// scout_core/src/mapping/discovery.rs

use tracing::debug;

use super::cell::{Cell, CellId};
use crate::config::MappingConfig;
use crate::error::MapError;
use crate::geometry::Point;
use crate::perception::ProximityMap;

/// A metric occupancy grid centred on the origin, plus the current plan from
/// the robot's cell to the nearest safe unexplored cell.
///
/// Row 0 is the top (largest `y`) of the grid and column 0 its left edge.
/// Occupancy is deterministic: the latest sweep through a cell wins.
#[derive(Debug, Clone)]
pub struct DiscoveryMap {
    cell_size: f64,
    grid_size: usize,
    cells: Vec<Cell>,
    robot_location: Point,
    target_cell: Option<CellId>,
    cells_to_target: Vec<CellId>,
    points_to_target: Vec<Point>,
}

impl DiscoveryMap {
    /// Builds a `grid_size × grid_size` grid of `cell_size` centimetre cells.
    ///
    /// # Returns
    /// An error if `grid_size` is odd or zero, `cell_size` is not positive, or
    /// some cell midpoint does not map back onto its own cell.
    pub fn new(cell_size: f64, grid_size: usize) -> Result<Self, MapError> {
        if grid_size == 0 {
            return Err(MapError::EmptyGrid);
        }
        if grid_size % 2 != 0 {
            return Err(MapError::OddGridSize(grid_size));
        }
        if cell_size.is_nan() || cell_size <= 0.0 {
            return Err(MapError::ZeroCellSize);
        }

        let half_extent = cell_size * grid_size as f64 / 2.0;
        let mut cells = Vec::with_capacity(grid_size * grid_size);
        for row in 0..grid_size {
            let top = half_extent - row as f64 * cell_size;
            for column in 0..grid_size {
                let left = -half_extent + column as f64 * cell_size;
                cells.push(Cell::new(row, column, top, left, cell_size));
            }
        }

        let mut map = Self {
            cell_size,
            grid_size,
            cells,
            robot_location: Point::ORIGIN,
            target_cell: None,
            cells_to_target: Vec::new(),
            points_to_target: Vec::new(),
        };
        map.link_neighbours();
        map.self_test()?;
        Ok(map)
    }

    pub fn from_config(config: &MappingConfig) -> Result<Self, MapError> {
        Self::new(config.cell_size, config.grid_size)
    }

    // --- Accessors ---

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0]
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().enumerate().map(|(i, c)| (CellId(i), c))
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Option<CellId> {
        (row < self.grid_size && column < self.grid_size)
            .then(|| CellId(row * self.grid_size + column))
    }

    pub fn robot_location(&self) -> Point {
        self.robot_location
    }

    pub fn set_robot_location(&mut self, location: Point) {
        self.robot_location = location;
    }

    pub fn target_cell(&self) -> Option<CellId> {
        self.target_cell
    }

    /// Cells from the robot's cell (first) to the target (last).
    pub fn cells_to_target(&self) -> &[CellId] {
        &self.cells_to_target
    }

    /// Midpoints of [`Self::cells_to_target`], in the same order.
    pub fn points_to_target(&self) -> &[Point] {
        &self.points_to_target
    }

    pub fn count_known(&self) -> usize {
        self.cells.iter().filter(|c| c.is_known()).count()
    }

    // --- Geometry ---

    /// Cell containing `point`, or `None` outside the grid.
    pub fn cell_with_point(&self, point: &Point) -> Option<CellId> {
        let half = (self.grid_size / 2) as f64;
        let row = (half - point.y / self.cell_size).floor();
        let column = (half + point.x / self.cell_size).floor();
        let limit = self.grid_size as f64;
        if !(row >= 0.0 && row < limit && column >= 0.0 && column < limit) {
            return None;
        }
        self.cell_at(row as usize, column as usize)
    }

    /// Moves the tracked robot location by a polar offset.
    pub fn robot_moved(&mut self, bearing: f64, distance: f64) {
        self.robot_location = self.robot_location.moved(bearing, distance);
    }

    pub fn any_neighbour_has_obstacles(&self, id: CellId) -> bool {
        self.cells[id.0]
            .neighbours
            .iter()
            .any(|n| self.cells[n.0].has_obstacles())
    }

    /// First neighbour of `id` that has not been seen yet.
    pub fn first_unknown_neighbour(&self, id: CellId) -> Option<CellId> {
        self.cells[id.0]
            .neighbours
            .iter()
            .copied()
            .find(|n| !self.cells[n.0].is_known())
    }

    // --- Sensing ---

    /// Projects every known ray of `proximity` from the robot location into the grid.
    ///
    /// # Arguments
    /// * `proximity`: Ranges by angle relative to the robot.
    /// * `heading_offset`: Bearing (degrees) of the proximity map's zero angle.
    pub fn add_obstacles(&mut self, proximity: &ProximityMap, heading_offset: f64) {
        let origin = self.robot_location;

        // Pass 1: every cell the ray passed through, and its endpoint cell, is
        // now known and free. This must finish before any obstacle is recorded.
        for (angle, distance) in proximity.known() {
            let bearing = angle as f64 + heading_offset;
            let distance = distance as f64;
            let end = origin.moved(bearing, distance);
            let Some(end_cell) = self.cell_with_point(&end) else {
                continue;
            };
            self.mark_seen(end_cell);
            let mut step = 1.0;
            while step <= distance {
                if let Some(id) = self.cell_with_point(&origin.moved(bearing, step)) {
                    self.mark_seen(id);
                }
                step += 1.0;
            }
        }

        // Pass 2: record each ray's endpoint as an obstacle.
        for (angle, distance) in proximity.known() {
            let end = origin.moved(angle as f64 + heading_offset, distance as f64);
            if let Some(id) = self.cell_with_point(&end) {
                self.cells[id.0].add_obstacle(end);
            }
        }
        debug!(
            "........ addObstacles (known cells: {}, from: {origin})",
            self.count_known()
        );
    }

    fn mark_seen(&mut self, id: CellId) {
        let cell = &mut self.cells[id.0];
        cell.set_known(true);
        cell.clear_obstacles();
    }

    // --- Planning ---

    /// Breadth-first frontier search from the robot's cell to the nearest unknown cell
    /// whose neighbourhood is free of obstacles.
    ///
    /// Leaves `target_cell` empty when no such cell is reachable.
    pub fn choose_target(&mut self) {
        for cell in &mut self.cells {
            cell.set_unsafe(false);
            cell.set_visited(false);
            cell.path_to_source = None;
        }
        self.target_cell = None;
        self.cells_to_target.clear();
        self.points_to_target.clear();

        let Some(source) = self.cell_with_point(&self.robot_location) else {
            return;
        };
        self.cells[source.0].set_visited(true);

        let mut last_round = vec![source];
        let mut this_round = Vec::new();
        'search: while !last_round.is_empty() {
            for &from in &last_round {
                for n in 0..self.cells[from.0].neighbours.len() {
                    let next = self.cells[from.0].neighbours[n];
                    if self.cells[next.0].is_visited() {
                        continue;
                    }
                    self.cells[next.0].set_visited(true);
                    if self.any_neighbour_has_obstacles(next) {
                        self.cells[next.0].set_unsafe(true);
                        continue;
                    }
                    self.cells[next.0].path_to_source = Some(from);
                    this_round.push(next);
                    if !self.cells[next.0].is_known() {
                        self.target_cell = Some(next);
                        break 'search;
                    }
                }
            }
            std::mem::swap(&mut last_round, &mut this_round);
            this_round.clear();
        }

        if let Some(target) = self.target_cell {
            let mut path = Vec::new();
            let mut at = Some(target);
            while let Some(id) = at {
                path.push(id);
                at = self.cells[id.0].path_to_source;
            }
            path.reverse();
            self.cells_to_target = path;
            self.refresh_points();
        }
    }

    /// Drops intermediate cells while the straight line between their
    /// neighbours stays clear of obstacle-adjacent cells.
    ///
    /// Restarts the scan after every removal; the endpoints never change.
    pub fn smoothen_path(&mut self) {
        loop {
            let droppable = (0..self.cells_to_target.len().saturating_sub(2)).find(|&i| {
                self.line_of_sight(self.cells_to_target[i], self.cells_to_target[i + 2])
            });
            match droppable {
                Some(i) => {
                    let dropped = self.cells_to_target.remove(i + 1);
                    debug!("........ smoothenPath (dropping {})", self.cells[dropped.0]);
                }
                None => break,
            }
        }
        self.refresh_points();
    }

    /// Samples the segment between two cell midpoints at (at most) unit steps.
    fn line_of_sight(&self, from: CellId, to: CellId) -> bool {
        let a = &self.cells[from.0];
        let c = &self.cells[to.0];
        let rows = a.row.abs_diff(c.row);
        let columns = a.column.abs_diff(c.column);
        let samples = (self.cell_size * rows.max(columns) as f64).ceil() as usize;
        if samples == 0 {
            return true;
        }
        let dx = (c.midpoint.x - a.midpoint.x) / samples as f64;
        let dy = (c.midpoint.y - a.midpoint.y) / samples as f64;
        (1..samples).all(|j| {
            let probe = Point::new(a.midpoint.x + j as f64 * dx, a.midpoint.y + j as f64 * dy);
            match self.cell_with_point(&probe) {
                Some(id) => !self.any_neighbour_has_obstacles(id),
                None => false,
            }
        })
    }

    fn refresh_points(&mut self) {
        self.points_to_target = self
            .cells_to_target
            .iter()
            .map(|id| self.cells[id.0].midpoint)
            .collect();
    }

    // --- Construction helpers ---

    fn link_neighbours(&mut self) {
        let size = self.grid_size as isize;
        for index in 0..self.cells.len() {
            let row = (index / self.grid_size) as isize;
            let column = (index % self.grid_size) as isize;
            let mut neighbours = Vec::with_capacity(8);
            for dr in -1..=1 {
                for dc in -1..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let (r, c) = (row + dr, column + dc);
                    if r >= 0 && r < size && c >= 0 && c < size {
                        neighbours.push(CellId((r * size + c) as usize));
                    }
                }
            }
            self.cells[index].neighbours = neighbours;
        }
    }

    fn self_test(&self) -> Result<(), MapError> {
        for (id, cell) in self.cells() {
            let found = self.cell_with_point(&cell.midpoint);
            if found != Some(id) {
                return Err(MapError::SelfTest {
                    row: cell.row,
                    column: cell.column,
                    found: found.map_or("nothing".to_string(), |f| self.cell(f).to_string()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_neighbour(map: &DiscoveryMap, a: CellId, b: CellId) -> bool {
        map.cell(a).neighbours().contains(&b)
    }

    /// Marks every cell known except those in the given rows/columns window.
    fn map_known_except(rows: std::ops::Range<usize>, columns: std::ops::Range<usize>) -> DiscoveryMap {
        let mut map = DiscoveryMap::new(10.0, 20).unwrap();
        for row in 0..20 {
            for column in 0..20 {
                if !(rows.contains(&row) && columns.contains(&column)) {
                    let id = map.cell_at(row, column).unwrap();
                    map.cell_mut(id).set_known(true);
                }
            }
        }
        map
    }

    #[test]
    fn rejects_invalid_grids() {
        assert_eq!(
            DiscoveryMap::new(10.0, 7).unwrap_err(),
            MapError::OddGridSize(7)
        );
        assert_eq!(DiscoveryMap::new(10.0, 0).unwrap_err(), MapError::EmptyGrid);
        assert_eq!(
            DiscoveryMap::new(0.0, 10).unwrap_err(),
            MapError::ZeroCellSize
        );
    }

    #[test]
    fn every_midpoint_maps_to_its_cell() {
        let map = DiscoveryMap::new(7.5, 12).unwrap();
        for (id, cell) in map.cells() {
            assert_eq!(map.cell_with_point(&cell.midpoint), Some(id));
        }
    }

    #[test]
    fn origin_sits_at_the_grid_centre() {
        let map = DiscoveryMap::new(10.0, 10).unwrap();
        let id = map.cell_with_point(&Point::new(0.5, 0.5)).unwrap();
        assert_eq!((map.cell(id).row, map.cell(id).column), (4, 5));
        let id = map.cell_with_point(&Point::new(-0.5, -0.5)).unwrap();
        assert_eq!((map.cell(id).row, map.cell(id).column), (5, 4));
        assert_eq!(map.cell_with_point(&Point::new(50.0, 0.0)), None);
        assert_eq!(map.cell_with_point(&Point::new(0.0, 50.1)), None);
    }

    #[test]
    fn corner_cells_have_three_neighbours() {
        let map = DiscoveryMap::new(10.0, 4).unwrap();
        let corner = map.cell_at(0, 0).unwrap();
        let inner = map.cell_at(1, 1).unwrap();
        assert_eq!(map.cell(corner).neighbours().len(), 3);
        assert_eq!(map.cell(inner).neighbours().len(), 8);
    }

    #[test]
    fn obstacles_are_recorded_after_seeing_through() {
        let mut map = DiscoveryMap::new(10.0, 20).unwrap();
        let mut proximity = ProximityMap::new(-5, 5);
        // Two rays ending in the same far cell.
        proximity.set(0, 45.0);
        proximity.set(1, 45.0);
        map.add_obstacles(&proximity, 0.0);

        // Both endpoints survive because obstacles are only recorded after every ray was walked.
        let end = map.cell_with_point(&Point::new(0.0, 45.0)).unwrap();
        assert_eq!(map.cell(end).obstacles().len(), 2);
        let through = map.cell_with_point(&Point::new(0.0, 25.0)).unwrap();
        assert!(map.cell(through).is_known());
        assert!(!map.cell(through).has_obstacles());

        // A later sweep that sees past the old obstacle clears it.
        let mut proximity = ProximityMap::new(-5, 5);
        proximity.set(0, 80.0);
        map.add_obstacles(&proximity, 0.0);
        let old = map.cell_with_point(&Point::new(0.0, 45.0)).unwrap();
        assert!(map.cell(old).is_known());
        assert!(!map.cell(old).has_obstacles());
    }

    #[test]
    fn heading_offset_rotates_the_projection() {
        let mut map = DiscoveryMap::new(10.0, 20).unwrap();
        let mut proximity = ProximityMap::new(0, 0);
        proximity.set(0, 35.0);
        map.add_obstacles(&proximity, 90.0);
        let obstacles: Vec<Point> = map
            .cells()
            .flat_map(|(_, cell)| cell.obstacles().to_vec())
            .collect();
        assert_eq!(obstacles.len(), 1);
        assert!((obstacles[0].x - 35.0).abs() < 1e-9);
        assert!(obstacles[0].y.abs() < 1e-9);
    }

    #[test]
    fn target_is_nearest_safe_unknown_cell() {
        let mut map = map_known_except(0..3, 0..20);
        map.choose_target();
        let target = map.target_cell().expect("frontier should be reachable");
        assert_eq!(map.cell(target).row, 2);
        assert!(!map.cell(target).is_known());

        let path = map.cells_to_target();
        assert_eq!(path.first(), map.cell_with_point(&Point::ORIGIN).as_ref());
        assert_eq!(path.last(), Some(&target));
        for pair in path.windows(2) {
            assert!(is_neighbour(&map, pair[0], pair[1]));
        }
        assert_eq!(map.points_to_target().len(), path.len());
    }

    #[test]
    fn fully_known_map_has_no_target() {
        let mut map = map_known_except(0..0, 0..0);
        map.choose_target();
        assert_eq!(map.target_cell(), None);
        assert!(map.cells_to_target().is_empty());
    }

    #[test]
    fn obstacle_neighbourhoods_are_unsafe() {
        let mut map = map_known_except(0..1, 0..20);
        // A wall across row 5 blocks every route to the unknown top row.
        for column in 0..20 {
            let id = map.cell_at(5, column).unwrap();
            let midpoint = map.cell(id).midpoint;
            map.cell_mut(id).add_obstacle(midpoint);
        }
        map.choose_target();
        assert_eq!(map.target_cell(), None);
        let beside_wall = map.cell_at(6, 10).unwrap();
        assert!(map.cell(beside_wall).is_unsafe());
    }

    #[test]
    fn smoothing_shortens_and_keeps_endpoints() {
        let mut map = map_known_except(0..1, 0..1);
        map.choose_target();
        let before: Vec<CellId> = map.cells_to_target().to_vec();
        assert!(before.len() > 2);
        map.smoothen_path();
        let after = map.cells_to_target();
        assert!(after.len() <= before.len());
        assert_eq!(after.first(), before.first());
        assert_eq!(after.last(), before.last());
        // Open floor: the straight line needs no intermediate cells.
        assert_eq!(after.len(), 2);
        assert_eq!(map.points_to_target().len(), 2);
    }

    #[test]
    fn smoothing_keeps_corners_around_obstacles() {
        let mut map = DiscoveryMap::new(10.0, 20).unwrap();
        let ids: Vec<CellId> = map.cells().map(|(id, _)| id).collect();
        for id in ids {
            map.cell_mut(id).set_known(true);
        }
        // Hand-built L-shaped path hugging an obstacle block.
        let path: Vec<CellId> = [(17, 2), (16, 2), (15, 2), (15, 3), (15, 4)]
            .iter()
            .map(|&(r, c)| map.cell_at(r, c).unwrap())
            .collect();
        let block = map.cell_at(17, 4).unwrap();
        let midpoint = map.cell(block).midpoint;
        map.cell_mut(block).add_obstacle(midpoint);
        map.cells_to_target = path.clone();
        map.smoothen_path();
        let after = map.cells_to_target();
        assert!(after.len() < path.len());
        assert_eq!(after.first(), path.first());
        assert_eq!(after.last(), path.last());
        assert!(after.contains(&map.cell_at(15, 2).unwrap()));
    }

    #[test]
    fn robot_moved_updates_location() {
        let mut map = DiscoveryMap::new(10.0, 10).unwrap();
        map.robot_moved(90.0, 20.0);
        let location = map.robot_location();
        assert!((location.x - 20.0).abs() < 1e-9);
        assert!(location.y.abs() < 1e-9);
    }

    #[test]
    fn first_unknown_neighbour_is_reported() {
        let mut map = DiscoveryMap::new(10.0, 4).unwrap();
        let centre = map.cell_at(1, 1).unwrap();
        let neighbours = map.cell(centre).neighbours().to_vec();
        for n in neighbours {
            map.cell_mut(n).set_known(true);
        }
        assert_eq!(map.first_unknown_neighbour(centre), None);
        let n = map.cell_at(2, 2).unwrap();
        map.cell_mut(n).set_known(false);
        assert_eq!(map.first_unknown_neighbour(centre), Some(n));
    }
}
