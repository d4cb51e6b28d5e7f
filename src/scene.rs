use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Handle of a scene-graph group rooms are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SceneGroupId(pub u32);

/// Capabilities the object pool needs from a renderable handle.
pub trait Poolable: Sized {
    /// Deep copy with its own geometry, detached from any parent.
    fn duplicate(&self) -> Self;
    fn set_visible(&mut self, visible: bool);
    /// `None` detaches the node from the scene graph.
    fn reparent(&mut self, parent: Option<SceneGroupId>);
    fn set_position(&mut self, position: Vector3<f32>);
}

/// A pooled room model as the world streamer drives it.
pub trait RoomRenderable: Poolable {
    fn set_opacity(&mut self, opacity: f32);
}

/// Where released and template instances are parked.
pub fn off_stage() -> Vector3<f32> {
    Vector3::new(0.0, -1000.0, 0.0)
}
