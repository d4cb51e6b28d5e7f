use crate::constants::ROOM_SIZE;
use crate::room::RoomKey;
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// Axis-aligned box. `position` is the centre on x and z and the bottom face
/// on y, so the box spans `[y, y + size.y]` vertically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    pub position: Vector3<f32>,
    pub size: Vector3<f32>,
}

impl BoxCollider {
    pub fn new(position: Vector3<f32>, size: Vector3<f32>) -> Self {
        BoxCollider { position, size }
    }

    pub fn min(&self) -> Vector3<f32> {
        Vector3::new(
            self.position.x - self.size.x / 2.0,
            self.position.y,
            self.position.z - self.size.z / 2.0,
        )
    }

    pub fn max(&self) -> Vector3<f32> {
        Vector3::new(
            self.position.x + self.size.x / 2.0,
            self.position.y + self.size.y,
            self.position.z + self.size.z / 2.0,
        )
    }

    pub fn translated(&self, offset: &Vector3<f32>) -> Self {
        BoxCollider {
            position: self.position + offset,
            size: self.size,
        }
    }

    /// Non-finite coordinates or negative extents.
    pub fn is_well_formed(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.size.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColliderKey {
    Boundary,
    Room(RoomKey),
}

/// World-space colliders keyed by resident room plus the map perimeter.
#[derive(Debug, Clone, Default)]
pub struct ColliderMap {
    boundary: Vec<BoxCollider>,
    rooms: BTreeMap<RoomKey, Vec<BoxCollider>>,
}

impl ColliderMap {
    pub fn set_boundary(&mut self, boundary: Vec<BoxCollider>) {
        self.boundary = boundary;
    }

    pub fn boundary(&self) -> &[BoxCollider] {
        &self.boundary
    }

    pub fn insert_room(&mut self, key: RoomKey, colliders: Vec<BoxCollider>) {
        self.rooms.insert(key, colliders);
    }

    pub fn remove_room(&mut self, key: &RoomKey) -> Option<Vec<BoxCollider>> {
        self.rooms.remove(key)
    }

    pub fn get(&self, key: &ColliderKey) -> Option<&[BoxCollider]> {
        match key {
            ColliderKey::Boundary => Some(&self.boundary),
            ColliderKey::Room(room) => self.rooms.get(room).map(Vec::as_slice),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Boundary first, then rooms in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ColliderKey, &[BoxCollider])> {
        std::iter::once((ColliderKey::Boundary, self.boundary.as_slice())).chain(
            self.rooms
                .iter()
                .map(|(key, colliders)| (ColliderKey::Room(*key), colliders.as_slice())),
        )
    }

    pub fn clear(&mut self) {
        self.boundary.clear();
        self.rooms.clear();
    }
}

const BOUNDARY_THICKNESS: f32 = 1.0;
const BOUNDARY_HEIGHT: f32 = 10.0;

/// Four walls enclosing a `width` x `height` cell maze whose cell `(0, 0)`
/// is centred on the world origin.
pub fn boundary_colliders(width: u32, height: u32) -> Vec<BoxCollider> {
    let half = ROOM_SIZE / 2.0;
    let (min_x, max_x) = (-half, width as f32 * ROOM_SIZE - half);
    let (min_z, max_z) = (-half, height as f32 * ROOM_SIZE - half);
    let (center_x, center_z) = ((min_x + max_x) / 2.0, (min_z + max_z) / 2.0);
    let span_x = max_x - min_x + BOUNDARY_THICKNESS * 2.0;
    let span_z = max_z - min_z + BOUNDARY_THICKNESS * 2.0;
    let t = BOUNDARY_THICKNESS;
    vec![
        // west
        BoxCollider::new(
            Vector3::new(min_x - t / 2.0, 0.0, center_z),
            Vector3::new(t, BOUNDARY_HEIGHT, span_z),
        ),
        // east
        BoxCollider::new(
            Vector3::new(max_x + t / 2.0, 0.0, center_z),
            Vector3::new(t, BOUNDARY_HEIGHT, span_z),
        ),
        // north
        BoxCollider::new(
            Vector3::new(center_x, 0.0, min_z - t / 2.0),
            Vector3::new(span_x, BOUNDARY_HEIGHT, t),
        ),
        // south
        BoxCollider::new(
            Vector3::new(center_x, 0.0, max_z + t / 2.0),
            Vector3::new(span_x, BOUNDARY_HEIGHT, t),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_are_foot_relative() {
        let collider = BoxCollider::new(Vector3::new(2.5, 0.0, 0.0), Vector3::new(0.5, 5.0, 5.0));
        assert_eq!(collider.min(), Vector3::new(2.25, 0.0, -2.5));
        assert_eq!(collider.max(), Vector3::new(2.75, 5.0, 2.5));
    }

    #[test]
    fn test_malformed_collider() {
        let ok = BoxCollider::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        assert!(ok.is_well_formed());
        let nan = BoxCollider::new(Vector3::new(f32::NAN, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert!(!nan.is_well_formed());
        let negative = BoxCollider::new(Vector3::zeros(), Vector3::new(-1.0, 1.0, 1.0));
        assert!(!negative.is_well_formed());
    }

    #[test]
    fn test_boundary_encloses_grid() {
        let boundary = boundary_colliders(4, 2);
        assert_eq!(boundary.len(), 4);
        // west wall inner face sits on the outer edge of column 0
        assert_eq!(boundary[0].max().x, -2.5);
        // east wall inner face sits on the outer edge of column 3
        assert_eq!(boundary[1].min().x, 17.5);
        assert_eq!(boundary[2].max().z, -2.5);
        assert_eq!(boundary[3].min().z, 7.5);
    }

    #[test]
    fn test_iter_yields_boundary_first() {
        let mut map = ColliderMap::default();
        map.insert_room(RoomKey::new(0, 0), vec![]);
        map.set_boundary(boundary_colliders(1, 1));
        let keys = map.iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![ColliderKey::Boundary, ColliderKey::Room(RoomKey::new(0, 0))]
        );
        assert_eq!(map.get(&ColliderKey::Boundary).map(|b| b.len()), Some(4));
        assert!(map.remove_room(&RoomKey::new(0, 0)).is_some());
        assert_eq!(map.room_count(), 0);
    }
}
