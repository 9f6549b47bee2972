//! Shared plumbing for movement loops
//!
//! Loop cadence, cancellation, the one-shot handoff latch and the messages
//! that loops exchange. Messages carry ids instead of references, so crews
//! never point back at their board.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};

use super::board::BoardPhase;

/// Outcome of a single movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Position was advanced; the loop keeps going
    Advanced,
    /// Exit predicate held; position untouched, the loop ends
    Finished,
}

/// Cooperative stop signal shared by loops
///
/// Never triggered by default: movement runs to its geometric exit.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Latch that lets exactly one caller through
#[derive(Debug, Default)]
pub struct OneShotLatch(AtomicBool);

impl OneShotLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first caller only
    #[inline]
    pub fn trip(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Published after every board step, for UI refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardTick {
    pub board_id: u32,
    pub phase: BoardPhase,
}

/// Which of the two crews on a board
pub type CrewSlot = usize;

/// Sent by a released crew when its loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrewEvent {
    pub board_id: u32,
    pub slot: CrewSlot,
    /// Steps the crew took after release
    pub steps: u64,
}

/// Loop cadence, cancellation and tick publishing, cloned into every loop
#[derive(Debug, Clone)]
pub struct Motion {
    tick: Duration,
    stop: StopToken,
    ticks: Option<Sender<BoardTick>>,
}

impl Motion {
    pub fn new(tick: Duration, stop: StopToken, ticks: Option<Sender<BoardTick>>) -> Self {
        Self { tick, stop, ticks }
    }

    /// No sleep, no observer. Loops run as fast as the scheduler lets them.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, StopToken::new(), None)
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Wait one tick
    #[inline]
    pub fn pause(&self) {
        if self.tick.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.tick);
        }
    }

    /// Publish a board tick; dropped when nobody keeps up or listens
    pub fn notify(&self, tick: BoardTick) {
        if let Some(ticks) = &self.ticks {
            if let Err(TrySendError::Disconnected(_)) = ticks.try_send(tick) {
                log::trace!("Tick observer gone (board {})", tick.board_id);
            }
        }
    }
}

/// Start a named OS thread for a loop
pub(crate) fn spawn_loop<F>(name: String, body: F) -> crate::SimResult<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(body)
        .map(|_detached| ())
        .map_err(crate::SimError::Spawn)
}
