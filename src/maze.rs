use crate::constants::{Direction4, DIRECTIONS};
use crate::random::{RandomSource, SeededRandom};
use crate::room::{DoorSet, RoomKey};
use pathfinding::prelude::{bfs, bfs_reach};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeConfig {
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>, // Seed value for random maze generation
}

impl Default for MazeConfig {
    fn default() -> Self {
        MazeConfig {
            width: 10,
            height: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze dimensions must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MazeCell {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
    pub visited: bool,
}

impl MazeCell {
    pub fn is_open(&self, dir: Direction4) -> bool {
        self.openings().is_open(dir)
    }

    pub fn openings(&self) -> DoorSet {
        DoorSet::new(self.north, self.south, self.east, self.west)
    }

    fn open(&mut self, dir: Direction4) {
        match dir {
            Direction4::North => self.north = true,
            Direction4::South => self.south = true,
            Direction4::East => self.east = true,
            Direction4::West => self.west = true,
        }
    }
}

#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct CellPos {
    pub x: u32,
    pub y: u32,
}

impl CellPos {
    pub fn new(x: u32, y: u32) -> Self {
        CellPos { x, y }
    }

    fn distance(&self, other: &CellPos) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<CellPos> for RoomKey {
    fn from(pos: CellPos) -> Self {
        RoomKey::new(pos.x as i32, pos.y as i32)
    }
}

/// How the end cell was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCellSelection {
    /// Picked among cells at least half the grid diagonal away from the start.
    FarCandidates,
    /// No cell met the distance threshold; every other cell was eligible.
    Fallback,
}

/// A perfect maze. Immutable once generated.
#[derive(Debug, Clone)]
pub struct MazeTopology {
    width: u32,
    height: u32,
    cells: Vec<Vec<MazeCell>>, // [y][x]
    start: CellPos,
    end: CellPos,
    end_selection: EndCellSelection,
}

impl MazeTopology {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn start_cell(&self) -> CellPos {
        self.start
    }

    pub fn end_cell(&self) -> CellPos {
        self.end
    }

    pub fn end_selection(&self) -> EndCellSelection {
        self.end_selection
    }

    pub fn cell(&self, pos: CellPos) -> Option<&MazeCell> {
        self.cells
            .get(pos.y as usize)
            .and_then(|row| row.get(pos.x as usize))
    }

    pub fn cell_at(&self, key: &RoomKey) -> Option<&MazeCell> {
        self.cell_pos(key).and_then(|pos| self.cell(pos))
    }

    pub fn contains(&self, key: &RoomKey) -> bool {
        self.cell_pos(key).is_some()
    }

    pub fn is_end_cell(&self, key: &RoomKey) -> bool {
        RoomKey::from(self.end) == *key
    }

    fn cell_pos(&self, key: &RoomKey) -> Option<CellPos> {
        let (x, y) = (u32::try_from(key.x).ok()?, u32::try_from(key.z).ok()?);
        (x < self.width && y < self.height).then(|| CellPos::new(x, y))
    }

    /// Cells joined to `pos` by a carved passage.
    pub fn passable_neighbors(&self, pos: CellPos) -> Vec<CellPos> {
        let Some(cell) = self.cell(pos) else {
            return Vec::new();
        };
        DIRECTIONS
            .iter()
            .filter(|dir| cell.is_open(**dir))
            .filter_map(|dir| neighbor(pos, *dir, self.width, self.height))
            .collect()
    }

    /// Number of carved passages. A perfect maze has `width * height - 1`.
    pub fn open_edge_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(|cell| usize::from(cell.south) + usize::from(cell.east))
            .sum()
    }

    pub fn reachable_count(&self) -> usize {
        bfs_reach(self.start, |pos| self.passable_neighbors(*pos)).count()
    }

    /// The unique path from the start cell to the end cell, both inclusive.
    pub fn solve(&self) -> Option<Vec<CellPos>> {
        bfs(
            &self.start,
            |pos| self.passable_neighbors(*pos),
            |pos| *pos == self.end,
        )
    }
}

impl fmt::Display for MazeTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "+--".repeat(self.width as usize) + "+";
        writeln!(f, "{}", border)?;
        for (y, row) in self.cells.iter().enumerate() {
            let mut line = String::new();
            let mut floor = String::from("+");
            for (x, cell) in row.iter().enumerate() {
                let pos = CellPos::new(x as u32, y as u32);
                line.push(if cell.west { ' ' } else { '|' });
                line.push_str(if pos == self.start {
                    "S "
                } else if pos == self.end {
                    "E "
                } else {
                    "  "
                });
                floor.push_str(if cell.south { "  +" } else { "--+" });
            }
            line.push('|');
            writeln!(f, "{}", line)?;
            if y + 1 < self.height as usize {
                writeln!(f, "{}", floor)?;
            }
        }
        write!(f, "{}", border)
    }
}

fn neighbor(pos: CellPos, dir: Direction4, width: u32, height: u32) -> Option<CellPos> {
    let (dx, dy) = dir.offset();
    let x = pos.x.checked_add_signed(dx)?;
    let y = pos.y.checked_add_signed(dy)?;
    (x < width && y < height).then(|| CellPos::new(x, y))
}

pub fn generate_maze(config: &MazeConfig) -> Result<MazeTopology, MazeError> {
    let mut rng = SeededRandom::new(config.seed);
    generate_maze_with(config.width, config.height, &mut rng)
}

/// Randomized depth-first backtracking over a `width` x `height` grid.
pub fn generate_maze_with(
    width: u32,
    height: u32,
    rng: &mut dyn RandomSource,
) -> Result<MazeTopology, MazeError> {
    if width == 0 || height == 0 {
        return Err(MazeError::EmptyGrid { width, height });
    }

    let mut cells = vec![vec![MazeCell::default(); width as usize]; height as usize];
    let total = width as usize * height as usize;

    let start = CellPos::new(
        rng.pick_index(width as usize) as u32,
        rng.pick_index(height as usize) as u32,
    );
    cells[start.y as usize][start.x as usize].visited = true;
    let mut visited = 1;
    let mut stack = Vec::with_capacity(total);
    let mut current = start;

    while visited < total {
        let candidates = DIRECTIONS
            .iter()
            .filter_map(|dir| neighbor(current, *dir, width, height).map(|pos| (*dir, pos)))
            .filter(|(_, pos)| !cells[pos.y as usize][pos.x as usize].visited)
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            match stack.pop() {
                Some(previous) => current = previous,
                None => break,
            }
            continue;
        }

        let (dir, next) = candidates[rng.pick_index(candidates.len())];
        carve(&mut cells, current, next, dir);
        cells[next.y as usize][next.x as usize].visited = true;
        visited += 1;
        stack.push(current);
        current = next;
    }

    if cells[start.y as usize][start.x as usize].openings().count() == 0 {
        // only reachable on a 1x1 grid, where there is nothing to open toward
        if let Some((dir, next)) = DIRECTIONS
            .iter()
            .find_map(|dir| neighbor(start, *dir, width, height).map(|pos| (*dir, pos)))
        {
            carve(&mut cells, start, next, dir);
        }
    }

    let (end, end_selection) = select_end_cell(width, height, start, rng);
    debug!(width, height, ?start, ?end, ?end_selection, "generated maze");

    Ok(MazeTopology {
        width,
        height,
        cells,
        start,
        end,
        end_selection,
    })
}

fn carve(cells: &mut [Vec<MazeCell>], from: CellPos, to: CellPos, dir: Direction4) {
    cells[from.y as usize][from.x as usize].open(dir);
    cells[to.y as usize][to.x as usize].open(dir.opposite());
}

const END_CELL_TOP_BAND: f64 = 0.7;

fn select_end_cell(
    width: u32,
    height: u32,
    start: CellPos,
    rng: &mut dyn RandomSource,
) -> (CellPos, EndCellSelection) {
    let others = (0..height)
        .flat_map(|y| (0..width).map(move |x| CellPos::new(x, y)))
        .filter(|pos| *pos != start)
        .map(|pos| (pos, start.distance(&pos)))
        .collect::<Vec<_>>();
    if others.is_empty() {
        return (start, EndCellSelection::Fallback);
    }

    let diagonal = ((width - 1) as f64).hypot((height - 1) as f64);
    let far = others
        .iter()
        .filter(|(_, d)| *d >= diagonal / 2.0)
        .copied()
        .collect::<Vec<_>>();
    let (pool, selection) = if far.is_empty() {
        (others, EndCellSelection::Fallback)
    } else {
        (far, EndCellSelection::FarCandidates)
    };

    let max_distance = pool.iter().map(|(_, d)| *d).fold(0.0, f64::max);
    let mut narrowed = pool
        .iter()
        .filter(|(_, d)| *d >= max_distance * END_CELL_TOP_BAND)
        .map(|(pos, _)| *pos)
        .collect::<Vec<_>>();
    if narrowed.is_empty() {
        narrowed = pool.iter().map(|(pos, _)| *pos).collect();
    }
    (narrowed[rng.pick_index(narrowed.len())], selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use proptest::prelude::*;

    fn assert_consistent_walls(maze: &MazeTopology) {
        for y in 0..maze.height() {
            for x in 0..maze.width() {
                let pos = CellPos::new(x, y);
                let cell = maze.cell(pos).unwrap();
                for dir in DIRECTIONS {
                    match neighbor(pos, *dir, maze.width(), maze.height()) {
                        Some(other) => assert_eq!(
                            cell.is_open(*dir),
                            maze.cell(other).unwrap().is_open(dir.opposite()),
                            "wall mismatch between {:?} and {:?}",
                            pos,
                            other
                        ),
                        None => assert!(!cell.is_open(*dir), "open edge wall at {:?}", pos),
                    }
                }
            }
        }
    }

    #[test]
    fn test_scripted_serpentine() {
        // every pick is 0: start at (0, 0) and always take the first open
        // direction in N, S, E, W order
        let mut rng = ScriptedRandom::default();
        let maze = generate_maze_with(10, 10, &mut rng).unwrap();

        assert_eq!(maze.start_cell(), CellPos::new(0, 0));
        let origin = maze.cell(CellPos::new(0, 0)).unwrap();
        assert!(origin.south);
        assert!(!origin.north && !origin.east && !origin.west);
        assert_eq!(maze.end_cell(), CellPos::new(9, 0));
        assert_eq!(maze.end_selection(), EndCellSelection::FarCandidates);
        // the carving order yields a single corridor through every cell
        assert_eq!(maze.solve().map(|path| path.len()), Some(100));
    }

    #[test]
    fn test_ascii_render() {
        let mut rng = ScriptedRandom::default();
        let maze = generate_maze_with(3, 2, &mut rng).unwrap();
        insta::assert_snapshot!(maze.to_string(), @r"
        +--+--+--+
        |S |   E |
        +  +  +  +
        |     |  |
        +--+--+--+
        ");
    }

    #[test]
    fn test_single_cell() {
        let maze = generate_maze(&MazeConfig {
            width: 1,
            height: 1,
            seed: Some(3),
        })
        .unwrap();
        assert_eq!(maze.start_cell(), maze.end_cell());
        assert_eq!(maze.end_selection(), EndCellSelection::Fallback);
        assert_eq!(maze.open_edge_count(), 0);
    }

    #[test]
    fn test_single_row_start_has_opening() {
        let maze = generate_maze(&MazeConfig {
            width: 6,
            height: 1,
            seed: Some(11),
        })
        .unwrap();
        let start = maze.cell(maze.start_cell()).unwrap();
        assert!(start.openings().count() > 0);
        assert_consistent_walls(&maze);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let result = generate_maze(&MazeConfig {
            width: 0,
            height: 4,
            seed: Some(0),
        });
        assert_eq!(
            result.unwrap_err(),
            MazeError::EmptyGrid {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn test_room_key_lookup() {
        let maze = generate_maze(&MazeConfig {
            seed: Some(5),
            ..Default::default()
        })
        .unwrap();
        assert!(maze.contains(&RoomKey::new(0, 0)));
        assert!(maze.contains(&RoomKey::new(9, 9)));
        assert!(!maze.contains(&RoomKey::new(-1, 0)));
        assert!(!maze.contains(&RoomKey::new(0, 10)));
        assert!(maze.is_end_cell(&RoomKey::from(maze.end_cell())));
    }

    proptest! {
        #[test]
        fn prop_perfect_maze(width in 1u32..16, height in 1u32..16, seed in any::<u64>()) {
            let maze = generate_maze(&MazeConfig { width, height, seed: Some(seed) }).unwrap();
            let total = (width * height) as usize;
            prop_assert_eq!(maze.open_edge_count(), total - 1);
            prop_assert_eq!(maze.reachable_count(), total);
            assert_consistent_walls(&maze);
        }

        #[test]
        fn prop_end_cell_is_far(width in 2u32..20, height in 2u32..20, seed in any::<u64>()) {
            let maze = generate_maze(&MazeConfig { width, height, seed: Some(seed) }).unwrap();
            let diagonal = ((width - 1) as f64).hypot((height - 1) as f64);
            let distance = maze.start_cell().distance(&maze.end_cell());
            prop_assert!(
                distance >= diagonal / 2.0
                    || maze.end_selection() == EndCellSelection::Fallback
            );
            prop_assert!(maze.solve().is_some());
        }
    }
}
