pub mod asset;
pub mod collider;
pub mod collision;
pub mod constants;
pub mod maze;
pub mod object_pool;
pub mod player;
pub mod random;
pub mod room;
pub mod room_matcher;
pub mod scene;
pub mod session;
pub mod streamer;

pub use constants::{Direction4, MAX_DISTANCE, MAX_MAZE_SIZE, ROOM_SIZE};
pub use maze::{generate_maze, MazeConfig, MazeError, MazeTopology};
pub use session::{MazeSession, SessionConfig, SessionError, TickOutcome};
pub use streamer::{StreamerConfig, WorldStreamer};
