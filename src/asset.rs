use crate::room::ArchetypeId;
use futures::future::LocalBoxFuture;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("no asset found for room `{0}`")]
    NotFound(ArchetypeId),
    #[error("failed to parse asset for room `{archetype}`: {reason}")]
    Parse {
        archetype: ArchetypeId,
        reason: String,
    },
    #[error("load of room `{0}` was dropped before it finished")]
    Cancelled(ArchetypeId),
}

/// Single-shot asset fetch. Resolves on some later tick; polled from the
/// streamer's tick, never from another thread.
pub type LoadFuture<R> = LocalBoxFuture<'static, Result<R, AssetError>>;

pub trait AssetLoader<R> {
    fn load_room_asset(&mut self, archetype: ArchetypeId) -> LoadFuture<R>;
}
