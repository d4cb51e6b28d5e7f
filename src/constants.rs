/// World units covered by one maze cell along x and z.
pub const ROOM_SIZE: f32 = 5.0;

/// Residency radius in cells (Chebyshev distance).
pub const MAX_DISTANCE: i32 = 2;

pub const MAX_LOAD_PER_FRAME: usize = 3;
pub const MAX_REMOVE_PER_FRAME: usize = 5;

/// Upper bound for either maze dimension.
pub const MAX_MAZE_SIZE: u32 = 30;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction4 {
    North,
    South,
    East,
    West,
}

pub const DIRECTIONS: &[Direction4; 4] = &[
    Direction4::North,
    Direction4::South,
    Direction4::East,
    Direction4::West,
];

impl Direction4 {
    pub fn opposite(&self) -> Self {
        match self {
            Direction4::North => Direction4::South,
            Direction4::South => Direction4::North,
            Direction4::East => Direction4::West,
            Direction4::West => Direction4::East,
        }
    }

    pub fn is_opposite(&self, other: &Direction4) -> bool {
        self.opposite() == *other
    }

    /// Grid offset as `(dx, dz)`. North points toward negative z.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction4::North => (0, -1),
            Direction4::South => (0, 1),
            Direction4::East => (1, 0),
            Direction4::West => (-1, 0),
        }
    }
}
