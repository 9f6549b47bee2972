//! Movement engine
//!
//! Every board and every released crew runs on its own OS thread. Positions
//! are single-writer atomic snapshots; the arena is a shared handle with
//! coarse-grained resizes. Loops talk to each other only through id-keyed
//! messages.

pub mod arena;
pub mod board;
pub mod crew;
pub mod driver;
pub mod motion;
pub mod position;
pub mod speed;

pub use arena::{Arena, ArenaGeometry, Island};
pub use board::{Board, BoardPhase, BoardSpec, HandoffOutcome};
pub use crew::{Crew, CrewState};
pub use driver::{Scene, Simulation, SpawnPlan};
pub use motion::{BoardTick, CrewEvent, CrewSlot, Motion, OneShotLatch, Step, StopToken};
pub use position::PositionCell;
pub use speed::{FixedSpeeds, PcgSpeedSampler, SpeedRange, SpeedSampler};
