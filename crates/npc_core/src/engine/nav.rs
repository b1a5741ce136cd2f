//! Navigation seam.
//!
//! The state machine never talks to a concrete navigation mesh; movement goes
//! through the `Navigator` trait handed in at world construction. Two
//! implementations ship with the crate: a straight-line navigator for open
//! floors and tests, and a grid navigator running A* over a walkability grid.

use nalgebra::Point3;
use pathfinding::prelude::astar;

/// Produces a route as a sequence of world-space points ending at the
/// destination, or `None` when the destination is unreachable.
pub trait Navigator: Send + Sync {
    fn route(&self, from: Point3<f32>, to: Point3<f32>) -> Option<Vec<Point3<f32>>>;
}

/// Walks straight at the destination. Fine for open floors.
#[derive(Debug, Default)]
pub struct DirectNavigator;

impl Navigator for DirectNavigator {
    fn route(&self, _from: Point3<f32>, to: Point3<f32>) -> Option<Vec<Point3<f32>>> {
        Some(vec![to])
    }
}

/// A* over a fixed walkability grid on the XZ plane.
#[derive(Debug, Clone)]
pub struct GridNavigator {
    origin: Point3<f32>,
    cell_size: f32,
    width: usize,
    height: usize,
    walkable: Vec<bool>,
}

impl GridNavigator {
    pub fn new(
        origin: Point3<f32>,
        cell_size: f32,
        width: usize,
        height: usize,
        walkable: Vec<bool>,
    ) -> Self {
        debug_assert_eq!(walkable.len(), width * height);
        Self { origin, cell_size, width, height, walkable }
    }

    /// Build from rows of ASCII art; `#` marks a blocked cell. Row 0 is the
    /// lowest Z row.
    pub fn from_ascii(origin: Point3<f32>, cell_size: f32, rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let mut walkable = Vec::with_capacity(width * height);
        for row in rows {
            for ch in row.chars() {
                walkable.push(ch != '#');
            }
        }
        Self::new(origin, cell_size, width, height, walkable)
    }

    fn to_cell(&self, p: Point3<f32>) -> Option<(i32, i32)> {
        let cx = ((p.x - self.origin.x) / self.cell_size).floor() as i32;
        let cz = ((p.z - self.origin.z) / self.cell_size).floor() as i32;
        if cx < 0 || cz < 0 || cx as usize >= self.width || cz as usize >= self.height {
            return None;
        }
        Some((cx, cz))
    }

    fn cell_center(&self, (cx, cz): (i32, i32), y: f32) -> Point3<f32> {
        Point3::new(
            self.origin.x + (cx as f32 + 0.5) * self.cell_size,
            y,
            self.origin.z + (cz as f32 + 0.5) * self.cell_size,
        )
    }

    fn is_walkable(&self, (cx, cz): (i32, i32)) -> bool {
        if cx < 0 || cz < 0 {
            return false;
        }
        let (cx, cz) = (cx as usize, cz as usize);
        cx < self.width && cz < self.height && self.walkable[cz * self.width + cx]
    }
}

impl Navigator for GridNavigator {
    fn route(&self, from: Point3<f32>, to: Point3<f32>) -> Option<Vec<Point3<f32>>> {
        let start = self.to_cell(from)?;
        let goal = self.to_cell(to)?;
        if !self.is_walkable(start) || !self.is_walkable(goal) {
            return None;
        }
        let (cells, _cost) = astar(
            &start,
            |&(x, z)| {
                [(x + 1, z), (x - 1, z), (x, z + 1), (x, z - 1)]
                    .into_iter()
                    .filter(|c| self.is_walkable(*c))
                    .map(|c| (c, 1u32))
                    .collect::<Vec<_>>()
            },
            |&(x, z)| ((x - goal.0).unsigned_abs() + (z - goal.1).unsigned_abs()),
            |&c| c == goal,
        )?;
        let mut route: Vec<Point3<f32>> =
            cells.into_iter().skip(1).map(|c| self.cell_center(c, to.y)).collect();
        // Land on the exact destination, not the goal cell's center.
        route.push(to);
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_navigator_returns_destination() {
        let route = DirectNavigator
            .route(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 4.0))
            .unwrap();
        assert_eq!(route, vec![Point3::new(3.0, 0.0, 4.0)]);
    }

    #[test]
    fn test_grid_routes_around_wall() {
        let nav = GridNavigator::from_ascii(
            Point3::new(0.0, 0.0, 0.0),
            1.0,
            &[
                ".....", //
                ".###.", //
                ".....",
            ],
        );
        let route = nav
            .route(Point3::new(0.5, 0.0, 1.5), Point3::new(4.5, 0.0, 1.5))
            .unwrap();
        // Must detour through row 0 or row 2, never through the wall.
        assert!(route.len() > 4);
        for p in &route {
            let cell = nav.to_cell(*p).unwrap();
            assert!(nav.is_walkable(cell), "route crosses blocked cell {cell:?}");
        }
        assert_eq!(*route.last().unwrap(), Point3::new(4.5, 0.0, 1.5));
    }

    #[test]
    fn test_grid_rejects_unreachable_goal() {
        let nav = GridNavigator::from_ascii(
            Point3::new(0.0, 0.0, 0.0),
            1.0,
            &[
                ".#.", //
                ".#.", //
                ".#.",
            ],
        );
        assert!(nav.route(Point3::new(0.5, 0.0, 0.5), Point3::new(2.5, 0.0, 0.5)).is_none());
    }

    #[test]
    fn test_grid_rejects_out_of_bounds() {
        let nav = GridNavigator::from_ascii(Point3::new(0.0, 0.0, 0.0), 1.0, &["..", ".."]);
        assert!(nav.route(Point3::new(-5.0, 0.0, 0.0), Point3::new(1.0, 0.0, 1.0)).is_none());
    }
}
