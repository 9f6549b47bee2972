//! Simulation settings
//!
//! Stored as JSON. Missing fields fall back to the defaults, so a settings
//! file only needs the values it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimResult;
use crate::sim::arena::ArenaGeometry;
use crate::sim::speed::{PcgSpeedSampler, SpeedRange};
use crate::sim::SpawnPlan;

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Spawn ===
    /// Boards created by the single spawn
    pub board_count: usize,
    /// Speeds drawn for boards and crews
    pub speed_range: SpeedRange,
    /// Random seed; entropy when absent
    pub seed: Option<u64>,

    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,

    // === Shapes ===
    pub board_footprint: Vec2,
    pub crew_footprint: Vec2,
    /// Extra distance a crew walks past the arena edge
    pub crew_exit_margin: f32,

    // === Layout ===
    pub spawn_origin_x: f32,
    pub row_gap: f32,

    // === Timing ===
    /// Movement and render tick in microseconds; 0 yields instead of sleeping
    pub tick_micros: u64,

    // === Backdrop ===
    pub backdrop_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_count: BOARD_COUNT,
            speed_range: SpeedRange::default(),
            seed: None,

            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,

            board_footprint: Vec2::new(BOARD_WIDTH, BOARD_HEIGHT),
            crew_footprint: Vec2::splat(CREW_SIZE),
            crew_exit_margin: CREW_EXIT_MARGIN,

            spawn_origin_x: SPAWN_ORIGIN_X,
            row_gap: SPAWN_ROW_GAP,

            tick_micros: TICK.as_micros() as u64,

            backdrop_path: None,
        }
    }
}

impl Settings {
    /// Read and validate a JSON settings file
    pub fn load(path: &Path) -> SimResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write pretty-printed JSON
    pub fn save(&self, path: &Path) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> SimResult<()> {
        ArenaGeometry::new(self.arena_width, self.arena_height)?;
        self.spawn_plan().validate()
    }

    pub fn spawn_plan(&self) -> SpawnPlan {
        SpawnPlan {
            board_count: self.board_count,
            speed_range: self.speed_range,
            board_footprint: self.board_footprint,
            crew_footprint: self.crew_footprint,
            crew_exit_margin: self.crew_exit_margin,
            origin_x: self.spawn_origin_x,
            row_gap: self.row_gap,
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_micros(self.tick_micros)
    }

    /// Speed sampler for the spawn: seeded when a seed is set
    pub fn sampler(&self) -> PcgSpeedSampler {
        match self.seed {
            Some(seed) => PcgSpeedSampler::new(seed),
            None => PcgSpeedSampler::from_entropy(),
        }
    }
}
