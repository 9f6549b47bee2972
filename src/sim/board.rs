//! Board: sails to the island, drops its crews, sails home
//!
//! Phases:
//! 1. Outbound: step right while outside the island and inside the arena,
//!    carrying both crews along. The island check wins a tie.
//! 2. Crews released, each on its own thread.
//! 3. The FIRST crew to finish trips the handoff latch and the board starts
//!    its inbound loop on a new thread. The second crew's report is ignored,
//!    so the board does not wait for both crews.
//! 4. Inbound: step left until the board leaves the arena. No island check.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use glam::Vec2;

use super::arena::Arena;
use super::crew::Crew;
use super::motion::{BoardTick, CrewEvent, Motion, OneShotLatch, Step, spawn_loop};
use super::position::PositionCell;
use crate::consts::CREWS_PER_BOARD;
use crate::{SimResult, footprint_center};

/// Board movement phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BoardPhase {
    Outbound = 0,
    InboundStarted = 1,
}

impl BoardPhase {
    fn from_u8(v: u8) -> Self {
        if v == 0 {
            BoardPhase::Outbound
        } else {
            BoardPhase::InboundStarted
        }
    }
}

/// What a crew report did to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// First report: inbound phase begins
    InboundStarted,
    /// Latch already tripped
    Ignored,
    /// Report addressed to another board
    ForeignBoard,
}

/// Static description of a board at spawn time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardSpec {
    pub id: u32,
    /// Top-left corner
    pub position: Vec2,
    pub footprint: Vec2,
    pub speed: f32,
    pub crew_footprint: Vec2,
    pub crew_exit_margin: f32,
}

#[derive(Debug)]
struct BoardCore {
    id: u32,
    /// Top-left corner
    position: PositionCell,
    footprint: Vec2,
    speed: f32,
    phase: AtomicU8,
    started: OneShotLatch,
    handoff: OneShotLatch,
    finished: AtomicBool,
    crews: [Crew; CREWS_PER_BOARD],
    arena: Arc<Arena>,
    motion: Motion,
}

impl BoardCore {
    fn phase(&self) -> BoardPhase {
        BoardPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn step_outbound(&self) -> Step {
        let geometry = self.arena.geometry();
        let position = self.position.load();
        if geometry.island_contains_entity(position, self.footprint)
            || !geometry.contains_entity(position, self.footprint)
        {
            return Step::Finished;
        }

        let next = self.position.advance(Vec2::new(self.speed, 0.0));
        let center = footprint_center(next, self.footprint);
        for crew in &self.crews {
            crew.follow_parent(center);
        }
        Step::Advanced
    }

    fn step_inbound(&self) -> Step {
        if !self.arena.contains_entity(self.position.load(), self.footprint) {
            return Step::Finished;
        }
        self.position.advance(Vec2::new(-self.speed, 0.0));
        Step::Advanced
    }

    fn handle_crew_event(&self, event: &CrewEvent) -> HandoffOutcome {
        if event.board_id != self.id {
            log::warn!("Board {} got a report for board {}", self.id, event.board_id);
            return HandoffOutcome::ForeignBoard;
        }
        if !self.handoff.trip() {
            log::debug!("Board {}: crew {} finished second, ignored", self.id, event.slot);
            return HandoffOutcome::Ignored;
        }
        self.phase.store(BoardPhase::InboundStarted as u8, Ordering::Release);
        log::debug!(
            "Board {}: crew {} finished first after {} steps, heading home",
            self.id,
            event.slot,
            event.steps
        );
        HandoffOutcome::InboundStarted
    }

    fn tick(&self) {
        self.motion.pause();
        self.motion.notify(BoardTick {
            board_id: self.id,
            phase: self.phase(),
        });
    }

    fn run_outbound(self: Arc<Self>) {
        while !self.motion.is_stopped() && self.step_outbound() == Step::Advanced {
            self.tick();
        }
        if self.motion.is_stopped() {
            log::debug!("Board {} halted while outbound", self.id);
            self.finished.store(true, Ordering::Release);
            return;
        }
        log::debug!("Board {} outbound done at {:?}", self.id, self.position.load());

        let (tx, rx) = crossbeam_channel::bounded(CREWS_PER_BOARD);
        for crew in &self.crews {
            if let Err(e) = crew.release(tx.clone()) {
                log::error!("Board {}: crew {} could not be released: {}", self.id, crew.slot(), e);
                let _ = tx.send(CrewEvent {
                    board_id: self.id,
                    slot: crew.slot(),
                    steps: 0,
                });
            }
        }
        drop(tx);

        // Ends once both crew loops have reported and dropped their senders
        for event in rx.iter() {
            if self.handle_crew_event(&event) != HandoffOutcome::InboundStarted {
                continue;
            }
            let board = self.clone();
            let name = format!("board-{}-inbound", self.id);
            if let Err(e) = spawn_loop(name, move || board.run_inbound()) {
                log::error!("Board {}: inbound loop not started: {}", self.id, e);
                self.finished.store(true, Ordering::Release);
            }
        }
    }

    fn run_inbound(&self) {
        while !self.motion.is_stopped() && self.step_inbound() == Step::Advanced {
            self.tick();
        }
        self.finished.store(true, Ordering::Release);
        log::debug!("Board {} left the arena at {:?}", self.id, self.position.load());
    }
}

/// A board and the two crews it owns
#[derive(Debug)]
pub struct Board {
    core: Arc<BoardCore>,
}

impl Board {
    /// Build a board in the Outbound phase with its crews riding at its center
    pub fn new(
        spec: BoardSpec,
        crew_speeds: [f32; CREWS_PER_BOARD],
        arena: Arc<Arena>,
        motion: Motion,
    ) -> Self {
        let center = footprint_center(spec.position, spec.footprint);
        let crews = std::array::from_fn(|slot| {
            Crew::new(
                spec.id,
                slot,
                center,
                spec.crew_footprint,
                crew_speeds[slot],
                spec.crew_exit_margin,
                arena.clone(),
                motion.clone(),
            )
        });

        Self {
            core: Arc::new(BoardCore {
                id: spec.id,
                position: PositionCell::new(spec.position),
                footprint: spec.footprint,
                speed: spec.speed,
                phase: AtomicU8::new(BoardPhase::Outbound as u8),
                started: OneShotLatch::new(),
                handoff: OneShotLatch::new(),
                finished: AtomicBool::new(false),
                crews,
                arena,
                motion,
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.core.id
    }

    /// Current top-left corner
    pub fn position(&self) -> Vec2 {
        self.core.position.load()
    }

    /// Current center (label anchor)
    pub fn center(&self) -> Vec2 {
        footprint_center(self.position(), self.core.footprint)
    }

    pub fn footprint(&self) -> Vec2 {
        self.core.footprint
    }

    pub fn speed(&self) -> f32 {
        self.core.speed
    }

    pub fn phase(&self) -> BoardPhase {
        self.core.phase()
    }

    /// True once the board has left the arena on its way home, or was halted
    pub fn is_finished(&self) -> bool {
        self.core.finished.load(Ordering::Acquire)
    }

    pub fn crews(&self) -> &[Crew; CREWS_PER_BOARD] {
        &self.core.crews
    }

    /// Ellipse bounds: top-left and size
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.position(), self.core.footprint)
    }

    /// Launch the outbound loop. Starting twice is a no-op.
    pub fn start(&self) -> SimResult<()> {
        if !self.core.started.trip() {
            log::warn!("Board {} already started", self.core.id);
            return Ok(());
        }
        let core = self.core.clone();
        spawn_loop(format!("board-{}-outbound", self.core.id), move || {
            core.run_outbound()
        })
    }

    /// Give up on a board whose loop never ran; it counts as finished
    pub(crate) fn abandon(&self) {
        self.core.finished.store(true, Ordering::Release);
    }

    /// One outbound step; also drags both crews to the new center
    pub fn step_outbound(&self) -> Step {
        self.core.step_outbound()
    }

    /// One inbound step
    pub fn step_inbound(&self) -> Step {
        self.core.step_inbound()
    }

    /// Guarded back-transition: the first report from either crew starts the
    /// inbound phase; later reports have no effect
    pub fn handle_crew_event(&self, event: &CrewEvent) -> HandoffOutcome {
        self.core.handle_crew_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CREW_EXIT_MARGIN, CREW_SIZE};
    use crate::sim::crew::CrewState;
    use crate::sim::motion::StopToken;
    use std::time::{Duration, Instant};

    fn board(arena: &Arc<Arena>, position: Vec2, speed: f32, crew_speeds: [f32; 2]) -> Board {
        paced_board(arena, position, speed, crew_speeds, Motion::immediate())
    }

    fn paced_board(
        arena: &Arc<Arena>,
        position: Vec2,
        speed: f32,
        crew_speeds: [f32; 2],
        motion: Motion,
    ) -> Board {
        Board::new(
            BoardSpec {
                id: 7,
                position,
                footprint: Vec2::new(100.0, 48.0),
                speed,
                crew_footprint: Vec2::splat(CREW_SIZE),
                crew_exit_margin: CREW_EXIT_MARGIN,
            },
            crew_speeds,
            arena.clone(),
            motion,
        )
    }

    fn run_outbound(board: &Board) -> u32 {
        let mut steps = 0;
        while board.step_outbound() == Step::Advanced {
            steps += 1;
            assert!(steps < 100_000, "outbound never finished");
        }
        steps
    }

    #[test]
    fn test_crews_start_at_board_center() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, 110.0), 0.5, [0.3, 0.9]);
        for crew in board.crews() {
            assert_eq!(crew.position(), Vec2::new(65.0, 134.0));
            assert_eq!(crew.board_id(), 7);
        }
        assert_eq!(board.phase(), BoardPhase::Outbound);
    }

    #[test]
    fn test_outbound_reaches_island() {
        // 600x600 arena: island at (600, 300), radius 300
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, 110.0), 0.5, [0.3, 0.9]);

        let steps = run_outbound(&board);
        let geometry = arena.geometry();
        assert!(geometry.island_contains_entity(board.position(), board.footprint()));
        assert!(geometry.contains_entity(board.position(), board.footprint()));

        // Center must reach x ~= 350.1 (dy = 166), i.e. about 571 steps of 0.5
        assert!((560..=580).contains(&steps), "took {steps} steps");
        // Crews were carried along
        for crew in board.crews() {
            assert_eq!(crew.position(), board.center());
        }
    }

    #[test]
    fn test_outbound_terminates_on_top_row() {
        // Center y = 0: the island is only touched at the arena's right edge
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, -24.0), 0.7, [0.3, 0.9]);
        run_outbound(&board);
        let geometry = arena.geometry();
        assert!(
            geometry.island_contains_entity(board.position(), board.footprint())
                || !geometry.contains_entity(board.position(), board.footprint())
        );
    }

    #[test]
    fn test_outbound_island_wins_tie() {
        // Already in the island and outside the arena: the island check is
        // evaluated first and the board does not move
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(560.0, 276.0), 1.0, [0.3, 0.9]);
        assert_eq!(board.step_outbound(), Step::Finished);
        assert_eq!(board.position(), Vec2::new(560.0, 276.0));
    }

    #[test]
    fn test_inbound_leaves_arena_without_island_check() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(300.0, 276.0), 2.0, [0.3, 0.9]);
        let mut steps = 0;
        while board.step_inbound() == Step::Advanced {
            steps += 1;
        }
        assert!(!arena.contains_entity(board.position(), board.footprint()));
        // Center starts at 350 and must drop below 0
        assert_eq!(steps, 176);
        // Crews stay where they were
        assert_eq!(board.crews()[0].position(), Vec2::new(350.0, 300.0));
    }

    #[test]
    fn test_first_finisher_starts_inbound_once() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, 110.0), 0.5, [0.3, 0.9]);
        run_outbound(&board);

        // Walk both crews in lock step, feeding reports as they finish
        let crews = board.crews();
        let mut done = [false; 2];
        let mut outcomes = Vec::new();
        let mut tick = 0u64;
        while !done.iter().all(|d| *d) {
            tick += 1;
            for (slot, crew) in crews.iter().enumerate() {
                if !done[slot] && crew.step() == Step::Finished {
                    done[slot] = true;
                    let event = CrewEvent {
                        board_id: board.id(),
                        slot,
                        steps: tick,
                    };
                    outcomes.push((slot, tick, board.handle_crew_event(&event)));
                }
            }
            assert!(tick < 100_000);
        }

        // Faster crew (slot 1) finishes first and starts the return
        assert_eq!(outcomes[0].0, 1);
        assert_eq!(outcomes[0].2, HandoffOutcome::InboundStarted);
        assert_eq!(board.phase(), BoardPhase::InboundStarted);
        // Slower crew's report changes nothing
        assert_eq!(outcomes[1].0, 0);
        assert!(outcomes[1].1 > outcomes[0].1);
        assert_eq!(outcomes[1].2, HandoffOutcome::Ignored);
        assert_eq!(board.phase(), BoardPhase::InboundStarted);
    }

    #[test]
    fn test_foreign_report_is_rejected() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, 110.0), 0.5, [0.3, 0.9]);
        let event = CrewEvent {
            board_id: 99,
            slot: 0,
            steps: 1,
        };
        assert_eq!(board.handle_crew_event(&event), HandoffOutcome::ForeignBoard);
        assert_eq!(board.phase(), BoardPhase::Outbound);
    }

    #[test]
    fn test_threaded_run_returns_home() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let board = board(&arena, Vec2::new(15.0, 110.0), 1.0, [1.0, 1.1]);
        board.start().unwrap();
        board.start().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(20);
        while !board.is_finished() {
            assert!(std::time::Instant::now() < deadline, "board never came home");
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(board.phase(), BoardPhase::InboundStarted);
        assert!(!arena.contains_entity(board.position(), board.footprint()));
    }

    #[test]
    fn test_board_heads_home_while_slow_crew_still_walks() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let motion = Motion::new(Duration::from_micros(50), StopToken::new(), None);
        // Slow crew needs about 11000 ticks; the board is home after about 800
        let board = paced_board(&arena, Vec2::new(15.0, 110.0), 1.1, [1.1, 0.02], motion.clone());
        board.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(20);
        while !board.is_finished() {
            assert!(Instant::now() < deadline, "board never came home");
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(board.phase(), BoardPhase::InboundStarted);
        assert_eq!(board.crews()[0].state(), CrewState::Ended);
        assert_eq!(board.crews()[1].state(), CrewState::Released);
        assert!(!arena.contains_entity(board.position(), board.footprint()));

        // Let the slow crew stop instead of outliving the test
        motion.stop_token().stop();
    }
}
