//! Spawn driver
//!
//! Owns the arena and the boards, starts one movement loop per board and runs
//! the render sampler. Boards are spawned once; their loops are detached and
//! run until they leave the arena. Only the render sampler is ever stopped.

use std::sync::{Arc, OnceLock};

use crossbeam_channel::Receiver;
use glam::Vec2;

use super::arena::Arena;
use super::board::{Board, BoardSpec};
use super::crew::CrewState;
use super::motion::{BoardTick, Motion, StopToken};
use super::speed::{SpeedRange, SpeedSampler};
use crate::consts::*;
use crate::error::{SimError, SimResult};
use crate::render::{self, RenderFrame, RenderLoop, RenderSink};
use crate::settings::Settings;

/// How many boards to spawn and how to shape and place them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
    pub board_count: usize,
    pub speed_range: SpeedRange,
    pub board_footprint: Vec2,
    pub crew_footprint: Vec2,
    pub crew_exit_margin: f32,
    /// Left edge of every board at spawn
    pub origin_x: f32,
    /// Vertical gap between consecutive boards
    pub row_gap: f32,
}

impl Default for SpawnPlan {
    fn default() -> Self {
        Self {
            board_count: BOARD_COUNT,
            speed_range: SpeedRange::default(),
            board_footprint: Vec2::new(BOARD_WIDTH, BOARD_HEIGHT),
            crew_footprint: Vec2::splat(CREW_SIZE),
            crew_exit_margin: CREW_EXIT_MARGIN,
            origin_x: SPAWN_ORIGIN_X,
            row_gap: SPAWN_ROW_GAP,
        }
    }
}

impl SpawnPlan {
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: &str| Err(SimError::InvalidSettings(msg.to_string()));
        if self.board_count == 0 {
            return invalid("board_count must be at least 1");
        }
        if !self.speed_range.is_valid() {
            return invalid("speed range must satisfy 0 < min <= max and hold a 0.01 step");
        }
        let positive = |v: Vec2| v.is_finite() && v.x > 0.0 && v.y > 0.0;
        if !positive(self.board_footprint) || !positive(self.crew_footprint) {
            return invalid("footprints must be positive");
        }
        if !(self.crew_exit_margin.is_finite() && self.crew_exit_margin >= 0.0) {
            return invalid("crew_exit_margin must be non-negative");
        }
        if !self.origin_x.is_finite() {
            return invalid("spawn_origin_x must be finite");
        }
        if !(self.row_gap.is_finite() && self.row_gap >= 0.0) {
            return invalid("row_gap must be non-negative");
        }
        Ok(())
    }

    /// Top-left corner of board `index` in an arena `arena_height` tall
    ///
    /// Rows are staggered by footprint height plus gap so boards never overlap.
    pub fn start_position(&self, index: usize, arena_height: f32) -> Vec2 {
        let h = self.board_footprint.y;
        let y = arena_height / 2.0 - h * self.board_count as f32
            + (h + self.row_gap) * (index + 1) as f32;
        Vec2::new(self.origin_x, y)
    }

    /// Create the boards without starting them
    ///
    /// Each board draws its own speed, then its crews draw theirs.
    pub fn build(
        &self,
        arena: &Arc<Arena>,
        motion: &Motion,
        sampler: &mut dyn SpeedSampler,
    ) -> Vec<Board> {
        let height = arena.size().y;
        (0..self.board_count)
            .map(|index| {
                let spec = BoardSpec {
                    id: index as u32,
                    position: self.start_position(index, height),
                    footprint: self.board_footprint,
                    speed: sampler.sample(self.speed_range),
                    crew_footprint: self.crew_footprint,
                    crew_exit_margin: self.crew_exit_margin,
                };
                let crew_speeds = std::array::from_fn(|_| sampler.sample(self.speed_range));
                Board::new(spec, crew_speeds, arena.clone(), motion.clone())
            })
            .collect()
    }
}

/// Start every board, even after a failure
///
/// A board that could not start is marked finished so the scene can still
/// settle. Returns the first failure.
fn start_boards<F>(boards: &[Board], mut start: F) -> SimResult<()>
where
    F: FnMut(&Board) -> SimResult<()>,
{
    let mut first_err = None;
    for board in boards {
        if let Err(e) = start(board) {
            log::error!("Board {} could not be started: {}", board.id(), e);
            board.abandon();
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Everything the render sampler reads
#[derive(Debug)]
pub struct Scene {
    arena: Arc<Arena>,
    boards: OnceLock<Vec<Board>>,
}

impl Scene {
    pub fn new(arena: Arc<Arena>) -> Self {
        Self {
            arena,
            boards: OnceLock::new(),
        }
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    /// Spawned boards; empty before the spawn
    pub fn boards(&self) -> &[Board] {
        self.boards.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Publish the boards; only the first call wins
    pub fn install_boards(&self, boards: Vec<Board>) -> SimResult<()> {
        self.boards.set(boards).map_err(|_| SimError::AlreadySpawned)
    }

    pub fn is_spawned(&self) -> bool {
        self.boards.get().is_some()
    }

    /// True when every board has ended and no crew is still walking
    pub fn is_settled(&self) -> bool {
        self.is_spawned()
            && self.boards().iter().all(|board| {
                board.is_finished()
                    && board
                        .crews()
                        .iter()
                        .all(|crew| crew.state() != CrewState::Released)
            })
    }
}

/// The simulation: arena, boards, movement loops and render sampler
pub struct Simulation {
    scene: Arc<Scene>,
    plan: SpawnPlan,
    motion: Motion,
    tick_events: Receiver<BoardTick>,
    render: Option<RenderLoop>,
}

impl Simulation {
    pub fn new(settings: &Settings) -> SimResult<Self> {
        settings.validate()?;
        let arena = Arc::new(Arena::new(settings.arena_width, settings.arena_height)?);
        let (tx, rx) = crossbeam_channel::bounded(TICK_CHANNEL_CAPACITY);
        Ok(Self {
            scene: Arc::new(Scene::new(arena)),
            plan: settings.spawn_plan(),
            motion: Motion::new(settings.tick(), StopToken::new(), Some(tx)),
            tick_events: rx,
            render: None,
        })
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn arena(&self) -> &Arc<Arena> {
        self.scene.arena()
    }

    pub fn boards(&self) -> &[Board] {
        self.scene.boards()
    }

    pub fn plan(&self) -> &SpawnPlan {
        &self.plan
    }

    /// Board tick notifications; dropped when nobody drains them
    pub fn tick_events(&self) -> &Receiver<BoardTick> {
        &self.tick_events
    }

    /// Create the boards and start every outbound loop
    ///
    /// Only one spawn per simulation; later calls fail with `AlreadySpawned`.
    pub fn spawn(&self, sampler: &mut dyn SpeedSampler) -> SimResult<()> {
        if self.scene.is_spawned() {
            return Err(SimError::AlreadySpawned);
        }
        let boards = self.plan.build(self.scene.arena(), &self.motion, sampler);
        self.scene.install_boards(boards)?;

        log::info!("Spawned {} boards", self.plan.board_count);
        for board in self.scene.boards() {
            log::debug!(
                "Board {} at {:?} speed {:.2}, crews {:.2}/{:.2}",
                board.id(),
                board.position(),
                board.speed(),
                board.crews()[0].speed(),
                board.crews()[1].speed()
            );
        }
        start_boards(self.scene.boards(), Board::start)
    }

    /// Host surface changed size
    pub fn on_arena_resize(&self, width: f32, height: f32) -> SimResult<()> {
        self.scene.arena().resize(width, height)
    }

    /// Read-only snapshot of everything drawable, right now
    pub fn frame(&self) -> RenderFrame {
        render::capture(&self.scene, 0)
    }

    /// Start the render sampler; a second call while running is a no-op
    pub fn start_render(&mut self, sink: Box<dyn RenderSink>) -> SimResult<()> {
        if self.render.is_some() {
            log::warn!("Render loop already running");
            return Ok(());
        }
        self.render = Some(RenderLoop::start(self.scene.clone(), self.motion.tick(), sink)?);
        Ok(())
    }

    /// Stop the render sampler. Movement loops keep running.
    ///
    /// Returns the number of frames presented.
    pub fn stop_render(&mut self) -> u64 {
        self.render.take().map(RenderLoop::stop).unwrap_or(0)
    }

    pub fn is_rendering(&self) -> bool {
        self.render.is_some()
    }

    /// Ask every movement loop to stop at its next tick
    pub fn halt_movement(&self) {
        log::info!("Halting movement loops");
        self.motion.stop_token().stop();
    }

    pub fn is_settled(&self) -> bool {
        self.scene.is_settled()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop_render();
    }
}
