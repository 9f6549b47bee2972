//! Island Raid - boards sail to an island, drop their crews and sail home
//!
//! Core modules:
//! - `sim`: Threaded movement engine (arena geometry, boards, crews, spawn driver)
//! - `render`: Render sampler and the frame snapshot handed to a drawing backend
//! - `backdrop`: Init-once backdrop image cache
//! - `settings`: Serde-backed configuration
//! - `error`: Error types

pub mod backdrop;
pub mod error;
pub mod render;
pub mod settings;
pub mod sim;

pub use error::{SimError, SimResult};
pub use render::{RenderFrame, RenderLoop, RenderSink};
pub use settings::Settings;
pub use sim::{Arena, Board, Crew, Simulation, SpawnPlan};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    use std::time::Duration;

    /// Time quantum between two movement steps
    pub const TICK: Duration = Duration::from_millis(1);

    /// Default arena (window) size
    pub const ARENA_WIDTH: f32 = 600.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    /// Number of boards per spawn
    pub const BOARD_COUNT: usize = 3;
    /// Crews carried by every board
    pub const CREWS_PER_BOARD: usize = 2;

    /// Board footprint (width x height)
    pub const BOARD_WIDTH: f32 = 100.0;
    pub const BOARD_HEIGHT: f32 = 48.0;
    /// Crew footprint
    pub const CREW_SIZE: f32 = 40.0;
    /// Extra footprint a released crew uses for its containment test, so it
    /// visibly leaves the arena before stopping
    pub const CREW_EXIT_MARGIN: f32 = 25.0;

    /// Horizontal speed range (units per tick)
    pub const SPEED_MIN: f32 = 0.10;
    pub const SPEED_MAX: f32 = 1.10;

    /// Spawn layout: left edge of every board and vertical gap between rows
    pub const SPAWN_ORIGIN_X: f32 = 15.0;
    pub const SPAWN_ROW_GAP: f32 = 40.0;

    /// Capacity of the board tick notification channel
    pub const TICK_CHANNEL_CAPACITY: usize = 256;
}

/// Center of a footprint whose top-left corner is `position`
#[inline]
pub fn footprint_center(position: Vec2, footprint: Vec2) -> Vec2 {
    position + footprint / 2.0
}

/// Top-left corner of a footprint centered on `center`
#[inline]
pub fn footprint_origin(center: Vec2, footprint: Vec2) -> Vec2 {
    center - footprint / 2.0
}
