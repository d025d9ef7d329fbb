// scout_core/src/mapping/cell.rs

use std::fmt;

use crate::geometry::Point;

/// Index of a cell inside its owning [`DiscoveryMap`](super::DiscoveryMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One square of the discovery grid.
///
/// Coordinates are centimetres relative to the map origin. Neighbours and the
/// search back-pointer are indices into the owning map, never owned cells.
#[derive(Debug, Clone)]
pub struct Cell {
    pub row: usize,
    pub column: usize,
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    pub midpoint: Point,
    known: bool,
    unsafe_: bool,
    visited: bool,
    obstacles: Vec<Point>,
    pub(crate) neighbours: Vec<CellId>,
    pub(crate) path_to_source: Option<CellId>,
}

impl Cell {
    pub(crate) fn new(row: usize, column: usize, top: f64, left: f64, size: f64) -> Self {
        Self {
            row,
            column,
            top,
            bottom: top - size,
            left,
            right: left + size,
            midpoint: Point::new(left + size / 2.0, top - size / 2.0),
            known: false,
            unsafe_: false,
            visited: false,
            obstacles: Vec::new(),
            neighbours: Vec::with_capacity(8),
            path_to_source: None,
        }
    }

    /// A cell is known once seen through or once it holds an obstacle.
    pub fn is_known(&self) -> bool {
        self.known || !self.obstacles.is_empty()
    }

    pub fn set_known(&mut self, known: bool) {
        self.known = known;
    }

    pub fn is_unsafe(&self) -> bool {
        self.unsafe_
    }

    pub fn set_unsafe(&mut self, unsafe_: bool) {
        self.unsafe_ = unsafe_;
    }

    pub fn is_visited(&self) -> bool {
        self.visited
    }

    pub fn set_visited(&mut self, visited: bool) {
        self.visited = visited;
    }

    pub fn obstacles(&self) -> &[Point] {
        &self.obstacles
    }

    pub fn has_obstacles(&self) -> bool {
        !self.obstacles.is_empty()
    }

    pub fn add_obstacle(&mut self, point: Point) {
        self.obstacles.push(point);
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    pub fn neighbours(&self) -> &[CellId] {
        &self.neighbours
    }

    pub fn path_to_source(&self) -> Option<CellId> {
        self.path_to_source
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(r={},c={})", self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_and_midpoint() {
        let cell = Cell::new(2, 3, 30.0, -20.0, 10.0);
        assert_eq!(cell.bottom, 20.0);
        assert_eq!(cell.right, -10.0);
        assert_eq!(cell.midpoint, Point::new(-15.0, 25.0));
        assert_eq!(cell.to_string(), "(r=2,c=3)");
    }

    #[test]
    fn obstacles_make_a_cell_known() {
        let mut cell = Cell::new(0, 0, 10.0, 0.0, 10.0);
        assert!(!cell.is_known());
        cell.add_obstacle(Point::new(5.0, 5.0));
        assert!(cell.is_known());
        cell.clear_obstacles();
        assert!(!cell.is_known());
        cell.set_known(true);
        assert!(cell.is_known());
    }
}
