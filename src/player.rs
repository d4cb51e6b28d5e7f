use crate::collision::PlayerBody;
use crate::room::RoomKey;
use nalgebra::{Vector2, Vector3};

/// Keys held this tick. Forward walks north (towards -z).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    /// Unnormalised `(x, z)` direction; opposing keys cancel.
    pub fn direction(&self) -> Vector2<f32> {
        let axis = |positive: bool, negative: bool| match (positive, negative) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };
        Vector2::new(axis(self.right, self.left), axis(self.back, self.forward))
    }

    pub fn is_idle(&self) -> bool {
        self.direction() == Vector2::zeros()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub body: PlayerBody,
    pub move_speed: f32,
}

impl Player {
    pub fn new(position: Vector3<f32>, radius: f32, height: f32, move_speed: f32) -> Self {
        Player {
            body: PlayerBody {
                position,
                radius,
                height,
            },
            move_speed,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.body.position
    }

    /// Proposed displacement for this tick. Diagonals are no faster than
    /// straight moves.
    pub fn movement(&self, input: &InputState) -> Vector3<f32> {
        let direction = input.direction();
        if direction == Vector2::zeros() {
            return Vector3::zeros();
        }
        let step = direction.normalize() * self.move_speed;
        Vector3::new(step.x, 0.0, step.y)
    }

    pub fn commit(&mut self, delta: &Vector3<f32>) {
        self.body.position += delta;
    }

    pub fn room(&self, room_size: f32) -> RoomKey {
        room_coordinate(&self.body.position, room_size)
    }
}

/// Grid cell containing a world position. Cells are centred on multiples of
/// `room_size`; halfway points round up.
pub fn room_coordinate(position: &Vector3<f32>, room_size: f32) -> RoomKey {
    let round = |v: f32| (v / room_size + 0.5).floor() as i32;
    RoomKey::new(round(position.x), round(position.z))
}
