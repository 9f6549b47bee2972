//! Crew: rides its board, then runs ashore on its own thread
//!
//! While riding, the board overwrites the crew position every tick. Once
//! released the crew owns its position and walks right at its own speed until
//! it has cleared the arena (with an extra margin), then reports back to the
//! board by id and stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_channel::Sender;
use glam::Vec2;

use super::arena::Arena;
use super::motion::{CrewEvent, CrewSlot, Motion, Step, spawn_loop};
use super::position::PositionCell;
use crate::{SimResult, footprint_origin};

/// Crew lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CrewState {
    /// Position driven by the board
    Riding = 0,
    /// Moving on its own loop
    Released = 1,
    /// Loop finished; position frozen
    Ended = 2,
}

impl CrewState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CrewState::Riding,
            1 => CrewState::Released,
            _ => CrewState::Ended,
        }
    }
}

#[derive(Debug)]
struct CrewCore {
    board_id: u32,
    slot: CrewSlot,
    /// Center of the crew
    position: PositionCell,
    footprint: Vec2,
    speed: f32,
    exit_margin: f32,
    state: AtomicU8,
    arena: Arc<Arena>,
    motion: Motion,
}

impl CrewCore {
    fn step(&self) -> Step {
        let geometry = self.arena.geometry();
        let inflated = self.footprint + Vec2::splat(self.exit_margin);
        if !geometry.contains_entity(self.position.load(), inflated) {
            return Step::Finished;
        }
        self.position.advance(Vec2::new(self.speed, 0.0));
        Step::Advanced
    }

    fn set_state(&self, state: CrewState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn run(&self, events: Sender<CrewEvent>) {
        let mut steps = 0u64;
        while !self.motion.is_stopped() && self.step() == Step::Advanced {
            steps += 1;
            self.motion.pause();
        }
        self.set_state(CrewState::Ended);
        log::debug!(
            "Crew {}/{} ended after {} steps at {:?}",
            self.board_id,
            self.slot,
            steps,
            self.position.load()
        );

        let event = CrewEvent {
            board_id: self.board_id,
            slot: self.slot,
            steps,
        };
        if events.send(event).is_err() {
            log::debug!("Board {} stopped listening before crew {} ended", self.board_id, self.slot);
        }
    }
}

/// A crew member owned by a board
#[derive(Debug)]
pub struct Crew {
    core: Arc<CrewCore>,
}

impl Crew {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        board_id: u32,
        slot: CrewSlot,
        position: Vec2,
        footprint: Vec2,
        speed: f32,
        exit_margin: f32,
        arena: Arc<Arena>,
        motion: Motion,
    ) -> Self {
        Self {
            core: Arc::new(CrewCore {
                board_id,
                slot,
                position: PositionCell::new(position),
                footprint,
                speed,
                exit_margin,
                state: AtomicU8::new(CrewState::Riding as u8),
                arena,
                motion,
            }),
        }
    }

    pub fn board_id(&self) -> u32 {
        self.core.board_id
    }

    pub fn slot(&self) -> CrewSlot {
        self.core.slot
    }

    /// Current center
    pub fn position(&self) -> Vec2 {
        self.core.position.load()
    }

    pub fn footprint(&self) -> Vec2 {
        self.core.footprint
    }

    pub fn speed(&self) -> f32 {
        self.core.speed
    }

    pub fn state(&self) -> CrewState {
        CrewState::from_u8(self.core.state.load(Ordering::Acquire))
    }

    /// Ellipse bounds: top-left and size
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (footprint_origin(self.position(), self.core.footprint), self.core.footprint)
    }

    /// Copy the board's center onto the crew. No checks: this is a state copy.
    #[inline]
    pub fn follow_parent(&self, position: Vec2) {
        self.core.position.store(position);
    }

    /// Take one autonomous step
    pub fn step(&self) -> Step {
        self.core.step()
    }

    /// Leave the board and start walking on a new thread
    ///
    /// `events` receives one `CrewEvent` when the walk ends. Releasing twice is
    /// a no-op.
    pub fn release(&self, events: Sender<CrewEvent>) -> SimResult<()> {
        let released = self.core.state.compare_exchange(
            CrewState::Riding as u8,
            CrewState::Released as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if released.is_err() {
            log::warn!("Crew {}/{} already released", self.core.board_id, self.core.slot);
            return Ok(());
        }

        let core = self.core.clone();
        let name = format!("crew-{}-{}", core.board_id, core.slot);
        spawn_loop(name, move || core.run(events)).inspect_err(|_| {
            // Nobody will walk this crew; report it as done so the board can
            // still head home
            self.core.set_state(CrewState::Ended);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CREW_EXIT_MARGIN, CREW_SIZE};

    fn crew(arena: &Arc<Arena>, x: f32, speed: f32) -> Crew {
        Crew::new(
            0,
            0,
            Vec2::new(x, 300.0),
            Vec2::splat(CREW_SIZE),
            speed,
            CREW_EXIT_MARGIN,
            arena.clone(),
            Motion::immediate(),
        )
    }

    #[test]
    fn test_follow_parent_overwrites_position() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let crew = crew(&arena, 10.0, 1.0);
        crew.follow_parent(Vec2::new(-1000.0, 42.0));
        assert_eq!(crew.position(), Vec2::new(-1000.0, 42.0));
        assert_eq!(crew.state(), CrewState::Riding);
    }

    #[test]
    fn test_step_stops_past_margin() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let crew = crew(&arena, 500.0, 1.0);

        let mut steps = 0;
        while crew.step() == Step::Advanced {
            steps += 1;
            assert!(steps < 1000, "crew never left the arena");
        }
        // Tested point is x + (40 + 25) / 2; it must pass 600
        let x = crew.position().x;
        assert!(x + 32.5 > 600.0);
        assert!(x + 32.5 <= 601.0);
        // Further steps do not move it
        assert_eq!(crew.step(), Step::Finished);
        assert_eq!(crew.position().x, x);
    }

    #[test]
    fn test_release_runs_to_end_and_reports() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let crew = crew(&arena, 550.0, 1.0);
        let (tx, rx) = crossbeam_channel::unbounded();

        crew.release(tx.clone()).unwrap();
        // Second release is ignored
        crew.release(tx).unwrap();

        let event = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("crew never reported");
        assert_eq!(event.board_id, 0);
        assert_eq!(event.slot, 0);
        assert_eq!(crew.state(), CrewState::Ended);
        assert!(rx.recv_timeout(std::time::Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_bounds_are_centered() {
        let arena = Arc::new(Arena::new(600.0, 600.0).unwrap());
        let crew = crew(&arena, 100.0, 1.0);
        let (origin, size) = crew.bounds();
        assert_eq!(origin, Vec2::new(80.0, 280.0));
        assert_eq!(size, Vec2::splat(40.0));
    }
}
