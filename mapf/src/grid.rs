//! Occupancy grid and coordinates.

use serde::{Deserialize, Serialize};

/// A cell position: `x` is the column, `y` is the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Rectangular 4-connected grid with static obstacles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Row-major; `true` marks an obstacle.
    obstacles: Vec<bool>,
}

impl Grid {
    /// An empty (obstacle-free) grid.
    pub fn open(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            obstacles: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells in the grid.
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// Row-major index of a coordinate known to be in bounds.
    pub fn index(&self, coord: Coord) -> usize {
        coord.y as usize * self.width + coord.x as usize
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    /// True when the cell exists and holds no obstacle.
    pub fn is_free(&self, coord: Coord) -> bool {
        self.in_bounds(coord) && !self.obstacles[self.index(coord)]
    }

    pub fn set_obstacle(&mut self, coord: Coord) {
        let index = self.index(coord);
        self.obstacles[index] = true;
    }

    pub fn free_cells(&self) -> usize {
        self.obstacles.iter().filter(|occupied| !**occupied).count()
    }

    /// All free coordinates in row-major order.
    pub fn free_coords(&self) -> Vec<Coord> {
        let mut coords = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let coord = Coord::new(x as i32, y as i32);
                if self.is_free(coord) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    /// Free orthogonal neighbors of `coord`.
    pub fn neighbors(&self, coord: Coord) -> Vec<Coord> {
        let candidates = [
            Coord::new(coord.x + 1, coord.y),
            Coord::new(coord.x - 1, coord.y),
            Coord::new(coord.x, coord.y + 1),
            Coord::new(coord.x, coord.y - 1),
        ];
        candidates
            .into_iter()
            .filter(|candidate| self.is_free(*candidate))
            .collect()
    }

    /// Moves available to an agent at `coord`: free neighbors plus waiting.
    pub fn moves(&self, coord: Coord) -> Vec<Coord> {
        let mut moves = self.neighbors(coord);
        moves.push(coord);
        moves
    }

    /// Render as `.`/`@` rows, one row per line.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.cells() + self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let coord = Coord::new(x as i32, y as i32);
                out.push(if self.is_free(coord) { '.' } else { '@' });
            }
            out.push('\n');
        }
        out
    }

    /// Parse `.`/`@` rows as produced by [`Grid::render`].
    pub fn parse(width: usize, height: usize, rows: &[&str]) -> anyhow::Result<Self> {
        use anyhow::bail;

        if rows.len() != height {
            bail!("expected {} grid rows, found {}", height, rows.len());
        }
        let mut grid = Grid::open(width, height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                bail!("grid row {} has width {}, expected {}", y, row.len(), width);
            }
            for (x, cell) in row.chars().enumerate() {
                match cell {
                    '.' => {}
                    '@' => grid.set_obstacle(Coord::new(x as i32, y as i32)),
                    other => bail!("unknown grid cell {:?} at row {}", other, y),
                }
            }
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_respect_bounds_and_obstacles() {
        let mut grid = Grid::open(3, 3);
        grid.set_obstacle(Coord::new(1, 0));

        let neighbors = grid.neighbors(Coord::new(0, 0));
        assert_eq!(neighbors, vec![Coord::new(0, 1)]);

        let center = grid.neighbors(Coord::new(1, 1));
        assert_eq!(center.len(), 3);
    }

    #[test]
    fn moves_include_waiting() {
        let grid = Grid::open(2, 2);
        let moves = grid.moves(Coord::new(0, 0));
        assert!(moves.contains(&Coord::new(0, 0)));
        assert_eq!(moves.len(), 3);
    }

    #[test]
    fn free_cells_counts_non_obstacles() {
        let mut grid = Grid::open(4, 4);
        grid.set_obstacle(Coord::new(0, 0));
        grid.set_obstacle(Coord::new(3, 3));
        assert_eq!(grid.free_cells(), 14);
    }

    #[test]
    fn render_parse_round_trips() {
        let mut grid = Grid::open(3, 2);
        grid.set_obstacle(Coord::new(2, 0));
        let rendered = grid.render();
        let rows: Vec<&str> = rendered.lines().collect();
        let parsed = Grid::parse(3, 2, &rows).expect("parse");
        assert_eq!(parsed, grid);
    }

    #[test]
    fn parse_rejects_bad_rows() {
        assert!(Grid::parse(2, 2, &[".."]).is_err());
        assert!(Grid::parse(2, 2, &["..", ".x"]).is_err());
        assert!(Grid::parse(2, 2, &["..", "..."]).is_err());
    }
}
