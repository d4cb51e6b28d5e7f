use crate::collider::BoxCollider;
use crate::constants::{Direction4, ROOM_SIZE};
use nalgebra::Vector3;
use std::fmt;

/// Grid coordinate of a room. `z` is the maze row.
#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug, Default)]
pub struct RoomKey {
    pub x: i32,
    pub z: i32,
}

impl RoomKey {
    pub fn new(x: i32, z: i32) -> Self {
        RoomKey { x, z }
    }

    /// Chebyshev distance in cells.
    pub fn distance(&self, other: &RoomKey) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    pub fn neighbor(&self, dir: Direction4) -> RoomKey {
        let (dx, dz) = dir.offset();
        RoomKey::new(self.x + dx, self.z + dz)
    }

    pub fn world_origin(&self, room_size: f32) -> Vector3<f32> {
        Vector3::new(self.x as f32 * room_size, 0.0, self.z as f32 * room_size)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct DoorSet {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl DoorSet {
    pub const fn new(north: bool, south: bool, east: bool, west: bool) -> Self {
        DoorSet {
            north,
            south,
            east,
            west,
        }
    }

    pub fn is_open(&self, dir: Direction4) -> bool {
        match dir {
            Direction4::North => self.north,
            Direction4::South => self.south,
            Direction4::East => self.east,
            Direction4::West => self.west,
        }
    }

    pub fn count(&self) -> usize {
        [self.north, self.south, self.east, self.west]
            .iter()
            .filter(|open| **open)
            .count()
    }

    /// Directions open in both sets.
    pub fn shared(&self, other: &DoorSet) -> usize {
        DoorSet::new(
            self.north && other.north,
            self.south && other.south,
            self.east && other.east,
            self.west && other.west,
        )
        .count()
    }
}

#[derive(Ord, PartialOrd, PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct ArchetypeId(&'static str);

impl ArchetypeId {
    pub const fn new(name: &'static str) -> Self {
        ArchetypeId(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub const TREASURE_ROOM: ArchetypeId = ArchetypeId::new("Treasure");
pub const DEFAULT_ROOM: ArchetypeId = ArchetypeId::new("Garden");
pub const FALLBACK_ROOM: ArchetypeId = ArchetypeId::new("Thirsty Corridor");

#[derive(Debug, Clone)]
pub struct RoomArchetype {
    pub id: ArchetypeId,
    pub doors: DoorSet,
    pub weight: u32,
    /// Local to the room centre, foot-relative on y.
    pub colliders: Vec<BoxCollider>,
}

impl RoomArchetype {
    /// Archetype whose colliders are the walls implied by `doors`.
    pub fn new(id: ArchetypeId, doors: DoorSet, weight: u32) -> Self {
        RoomArchetype {
            id,
            doors,
            weight,
            colliders: wall_colliders(&doors),
        }
    }

    /// Archetype with a doorway on every side whatever its door flags. For
    /// rooms forced onto a cell regardless of the cell's openings.
    pub fn open_plan(id: ArchetypeId, doors: DoorSet, weight: u32) -> Self {
        RoomArchetype {
            id,
            doors,
            weight,
            colliders: wall_colliders(&DoorSet::new(true, true, true, true)),
        }
    }

    pub fn with_prop(mut self, position: (f32, f32, f32), size: (f32, f32, f32)) -> Self {
        self.colliders.push(BoxCollider::new(
            Vector3::new(position.0, position.1, position.2),
            Vector3::new(size.0, size.1, size.2),
        ));
        self
    }

    pub fn world_colliders(&self, origin: &Vector3<f32>) -> Vec<BoxCollider> {
        self.colliders
            .iter()
            .map(|collider| collider.translated(origin))
            .collect()
    }
}

pub const WALL_THICKNESS: f32 = 0.3;
pub const WALL_HEIGHT: f32 = 5.0;
pub const DOOR_WIDTH: f32 = 1.6;

/// A full wall for each closed side, two segments framing a centred doorway
/// for each open side.
pub fn wall_colliders(doors: &DoorSet) -> Vec<BoxCollider> {
    let half = ROOM_SIZE / 2.0;
    let segment = (ROOM_SIZE - DOOR_WIDTH) / 2.0;
    let segment_offset = DOOR_WIDTH / 2.0 + segment / 2.0;
    let mut colliders = Vec::new();
    for (dir, (nx, nz)) in [
        (Direction4::North, (0.0, -1.0)),
        (Direction4::South, (0.0, 1.0)),
        (Direction4::East, (1.0, 0.0)),
        (Direction4::West, (-1.0, 0.0)),
    ] {
        // the wall runs along x when its normal points along z
        let along_x = nx == 0.0;
        let center = Vector3::new(nx * half, 0.0, nz * half);
        let wall = |offset: f32, length: f32| {
            let (position, size) = if along_x {
                (
                    center + Vector3::new(offset, 0.0, 0.0),
                    Vector3::new(length, WALL_HEIGHT, WALL_THICKNESS),
                )
            } else {
                (
                    center + Vector3::new(0.0, 0.0, offset),
                    Vector3::new(WALL_THICKNESS, WALL_HEIGHT, length),
                )
            };
            BoxCollider::new(position, size)
        };
        if doors.is_open(dir) {
            colliders.push(wall(-segment_offset, segment));
            colliders.push(wall(segment_offset, segment));
        } else {
            colliders.push(wall(0.0, ROOM_SIZE));
        }
    }
    colliders
}

#[derive(Debug, Clone)]
pub struct RoomCatalog {
    archetypes: Vec<RoomArchetype>,
}

impl RoomCatalog {
    pub fn new(archetypes: Vec<RoomArchetype>) -> Self {
        RoomCatalog { archetypes }
    }

    pub fn get(&self, id: &ArchetypeId) -> Option<&RoomArchetype> {
        self.archetypes.iter().find(|archetype| archetype.id == *id)
    }

    pub fn contains(&self, id: &ArchetypeId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomArchetype> {
        self.archetypes.iter()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        let archetypes = vec![
            RoomArchetype::new(
                ArchetypeId::new("Boss Room"),
                DoorSet::new(false, true, false, true),
                1,
            )
            .with_prop((0.0, 0.0, -1.6), (1.4, 1.2, 0.8)),
            RoomArchetype::new(
                ArchetypeId::new("Dragon Room"),
                DoorSet::new(false, true, false, true),
                2,
            )
            .with_prop((1.3, 0.0, -1.3), (1.0, 2.0, 1.0)),
            RoomArchetype::new(DEFAULT_ROOM, DoorSet::new(true, true, true, true), 5),
            RoomArchetype::new(
                ArchetypeId::new("King Throne"),
                DoorSet::new(false, true, true, true),
                2,
            )
            .with_prop((0.0, 0.0, -1.8), (1.2, 1.5, 0.6)),
            RoomArchetype::new(
                ArchetypeId::new("Princess Chamber"),
                DoorSet::new(false, true, false, true),
                2,
            ),
            RoomArchetype::new(FALLBACK_ROOM, DoorSet::new(true, true, true, true), 6),
            RoomArchetype::new(
                ArchetypeId::new("Trapped Room"),
                DoorSet::new(false, true, true, true),
                3,
            ),
            // the end cell may open on any side
            RoomArchetype::open_plan(TREASURE_ROOM, DoorSet::new(true, true, false, true), 0)
                .with_prop((1.6, 0.0, -1.6), (0.8, 0.8, 0.8)),
        ];
        RoomCatalog { archetypes }
    }
}
