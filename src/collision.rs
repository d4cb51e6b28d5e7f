use crate::collider::{BoxCollider, ColliderKey, ColliderMap};
use nalgebra::Vector3;
use tracing::trace;

/// Inclusive overlap on all three axes. Malformed boxes never collide.
pub fn check_box_collision(box1: &BoxCollider, box2: &BoxCollider) -> bool {
    if !box1.is_well_formed() || !box2.is_well_formed() {
        return false;
    }
    let (b1_min, b1_max) = (box1.min(), box1.max());
    let (b2_min, b2_max) = (box2.min(), box2.max());
    b1_min.x <= b2_max.x
        && b1_max.x >= b2_min.x
        && b1_min.y <= b2_max.y
        && b1_max.y >= b2_min.y
        && b1_min.z <= b2_max.z
        && b1_max.z >= b2_min.z
}

/// The player's capsule, tested as a vertical box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBody {
    /// Centre of the capsule.
    pub position: Vector3<f32>,
    pub radius: f32,
    pub height: f32,
}

impl PlayerBody {
    /// The box the body would occupy at `center`.
    pub fn box_at(&self, center: &Vector3<f32>) -> BoxCollider {
        let foot_y = center.y - self.height / 2.0;
        BoxCollider::new(
            Vector3::new(center.x, foot_y, center.z),
            Vector3::new(self.radius * 2.0, self.height, self.radius * 2.0),
        )
    }
}

/// First collider that would overlap the body after moving by `delta`.
/// Boundary walls are tested before room geometry.
pub fn first_blocking(
    player: &PlayerBody,
    delta: &Vector3<f32>,
    colliders: &ColliderMap,
) -> Option<ColliderKey> {
    let candidate = player.box_at(&(player.position + delta));
    colliders
        .iter()
        .find(|(_, boxes)| {
            boxes
                .iter()
                .any(|collider| check_box_collision(&candidate, collider))
        })
        .map(|(key, _)| key)
}

/// Discrete test at the proposed position; any overlap vetoes the whole move.
pub fn can_move(player: &PlayerBody, delta: &Vector3<f32>, colliders: &ColliderMap) -> bool {
    if delta.norm_squared() == 0.0 {
        return true;
    }
    match first_blocking(player, delta, colliders) {
        Some(key) => {
            trace!(?key, "move blocked");
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::boundary_colliders;
    use crate::room::RoomKey;

    fn cube(x: f32, y: f32, z: f32, size: f32) -> BoxCollider {
        BoxCollider::new(Vector3::new(x, y, z), Vector3::new(size, size, size))
    }

    fn player_at(x: f32, z: f32) -> PlayerBody {
        PlayerBody {
            position: Vector3::new(x, 0.5, z),
            radius: 0.5,
            height: 1.0,
        }
    }

    #[test]
    fn test_touching_edges_collide() {
        let a = cube(0.0, 0.0, 0.0, 2.0);
        let b = cube(2.0, 0.0, 0.0, 2.0);
        assert!(check_box_collision(&a, &b));
        // stacked: b sits exactly on top of a
        let c = cube(0.0, 2.0, 0.0, 2.0);
        assert!(check_box_collision(&a, &c));
    }

    #[test]
    fn test_separated_on_one_axis() {
        let a = cube(0.0, 0.0, 0.0, 2.0);
        assert!(!check_box_collision(&a, &cube(2.5, 0.0, 0.0, 2.0)));
        assert!(!check_box_collision(&a, &cube(0.0, 0.0, -2.5, 2.0)));
        assert!(!check_box_collision(&a, &cube(0.0, 2.5, 0.0, 2.0)));
    }

    #[test]
    fn test_malformed_collider_is_skipped() {
        let a = cube(0.0, 0.0, 0.0, 2.0);
        let broken = BoxCollider::new(
            Vector3::new(0.0, f32::NAN, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
        );
        assert!(!check_box_collision(&a, &broken));
    }

    #[test]
    fn test_room_wall_blocks_move() {
        let mut colliders = ColliderMap::default();
        colliders.insert_room(
            RoomKey::new(0, 0),
            vec![BoxCollider::new(
                Vector3::new(2.5, 0.0, 0.0),
                Vector3::new(0.3, 5.0, 5.0),
            )],
        );
        let player = player_at(0.0, 0.0);
        // box would span x in [1.6, 2.6], across the wall at [2.35, 2.65]
        assert!(!can_move(&player, &Vector3::new(2.1, 0.0, 0.0), &colliders));
        assert_eq!(
            first_blocking(&player, &Vector3::new(2.1, 0.0, 0.0), &colliders),
            Some(ColliderKey::Room(RoomKey::new(0, 0)))
        );
        // stops short of the wall
        assert!(can_move(&player, &Vector3::new(1.5, 0.0, 0.0), &colliders));
    }

    #[test]
    fn test_zero_move_always_allowed() {
        let mut colliders = ColliderMap::default();
        // the player already overlaps this box
        colliders.insert_room(RoomKey::new(0, 0), vec![cube(0.0, 0.0, 0.0, 4.0)]);
        assert!(can_move(&player_at(0.0, 0.0), &Vector3::zeros(), &colliders));
    }

    #[test]
    fn test_boundary_is_checked_first() {
        let mut colliders = ColliderMap::default();
        colliders.set_boundary(boundary_colliders(1, 1));
        colliders.insert_room(RoomKey::new(0, 0), vec![cube(-2.8, 0.0, 0.0, 0.5)]);
        let player = player_at(-1.5, 0.0);
        assert_eq!(
            first_blocking(&player, &Vector3::new(-1.0, 0.0, 0.0), &colliders),
            Some(ColliderKey::Boundary)
        );
    }

    #[test]
    fn test_player_box_is_foot_relative() {
        let player = player_at(1.0, 2.0);
        let body = player.box_at(&player.position);
        assert_eq!(body.min(), Vector3::new(0.5, 0.0, 1.5));
        assert_eq!(body.max(), Vector3::new(1.5, 1.0, 2.5));
    }
}
