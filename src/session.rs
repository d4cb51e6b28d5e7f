use crate::asset::AssetLoader;
use crate::collision::can_move;
use crate::constants::MAX_MAZE_SIZE;
use crate::maze::{generate_maze_with, MazeError};
use crate::player::{InputState, Player};
use crate::random::{RandomSource, SeededRandom};
use crate::room::RoomKey;
use crate::scene::RoomRenderable;
use crate::streamer::WorldStreamer;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maze side length on level 1.
    pub base_maze_size: u32,
    /// Added to the side length per level.
    pub maze_size_step: u32,
    pub max_maze_size: u32,
    pub seed: Option<u64>,
    pub player_radius: f32,
    pub player_height: f32,
    /// World units per tick.
    pub move_speed: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            base_maze_size: 5,
            maze_size_step: 2,
            max_maze_size: MAX_MAZE_SIZE,
            seed: None,
            player_radius: 0.5,
            player_height: 1.0,
            move_speed: 0.15,
        }
    }
}

impl SessionConfig {
    /// Side length of the square maze for a 1-based level. Never above
    /// `MAX_MAZE_SIZE`, whatever `max_maze_size` says.
    pub fn maze_size_for_level(&self, level: u32) -> u32 {
        let grown = self
            .maze_size_step
            .saturating_mul(level.saturating_sub(1))
            .saturating_add(self.base_maze_size);
        grown.min(self.max_maze_size.min(MAX_MAZE_SIZE))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Maze(#[from] MazeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Playing,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No movement requested, or the session is not playing.
    Idle,
    Moved,
    /// A collider vetoed the move; the player stayed put.
    Blocked,
    /// The player reached the end room this tick.
    Completed,
}

/// One player's run through successive levels.
pub struct MazeSession<R: RoomRenderable, L: AssetLoader<R>> {
    config: SessionConfig,
    rng: Box<dyn RandomSource>,
    streamer: WorldStreamer<R, L>,
    player: Player,
    level: u32,
    phase: SessionPhase,
    ticks: u64,
}

impl<R: RoomRenderable, L: AssetLoader<R>> MazeSession<R, L> {
    pub fn new(config: SessionConfig, streamer: WorldStreamer<R, L>) -> Self {
        let rng = Box::new(SeededRandom::new(config.seed));
        Self::with_rng(config, streamer, rng)
    }

    pub fn with_rng(
        config: SessionConfig,
        streamer: WorldStreamer<R, L>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let player = Player::new(
            Vector3::new(0.0, config.player_height / 2.0, 0.0),
            config.player_radius,
            config.player_height,
            config.move_speed,
        );
        MazeSession {
            config,
            rng,
            streamer,
            player,
            level: 1,
            phase: SessionPhase::NotStarted,
            ticks: 0,
        }
    }

    /// Builds a fresh maze for the current level and puts the player in its
    /// start room.
    pub fn start_level(&mut self) -> Result<(), SessionError> {
        let size = self.config.maze_size_for_level(self.level);
        let topology = generate_maze_with(size, size, &mut *self.rng)?;
        let start = RoomKey::from(topology.start_cell());
        let end = topology.end_cell();
        self.streamer.create_world(topology);

        let spawn = start.world_origin(self.streamer.config().room_size)
            + Vector3::new(0.0, self.config.player_height / 2.0, 0.0);
        self.player = Player::new(
            spawn,
            self.config.player_radius,
            self.config.player_height,
            self.config.move_speed,
        );
        self.phase = SessionPhase::Playing;
        self.ticks = 0;
        info!(
            level = self.level,
            size,
            %start,
            end_x = end.x,
            end_y = end.y,
            "level started"
        );

        self.streamer.stream_around(start.x, start.z);
        Ok(())
    }

    /// Next level, one size up.
    pub fn advance_level(&mut self) -> Result<(), SessionError> {
        self.level += 1;
        self.start_level()
    }

    /// Same level, new maze.
    pub fn restart_level(&mut self) -> Result<(), SessionError> {
        self.start_level()
    }

    /// One simulation step: move if the colliders allow it, then either
    /// finish the level or stream rooms around the player's new cell.
    pub fn tick(&mut self, input: &InputState) -> TickOutcome {
        if self.phase != SessionPhase::Playing {
            return TickOutcome::Idle;
        }
        self.ticks += 1;

        let delta = self.player.movement(input);
        let outcome = if delta == Vector3::zeros() {
            TickOutcome::Idle
        } else if can_move(&self.player.body, &delta, self.streamer.colliders()) {
            self.player.commit(&delta);
            TickOutcome::Moved
        } else {
            TickOutcome::Blocked
        };

        let room = self.current_room();
        let reached_end = self
            .streamer
            .topology()
            .is_some_and(|topology| topology.is_end_cell(&room));
        if reached_end {
            self.phase = SessionPhase::Completed;
            info!(level = self.level, ticks = self.ticks, "level completed");
            return TickOutcome::Completed;
        }

        self.streamer.stream_around(room.x, room.z);
        outcome
    }

    pub fn current_room(&self) -> RoomKey {
        self.player.room(self.streamer.config().room_size)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn streamer(&self) -> &WorldStreamer<R, L> {
        &self.streamer
    }

    pub fn streamer_mut(&mut self) -> &mut WorldStreamer<R, L> {
        &mut self.streamer
    }
}
