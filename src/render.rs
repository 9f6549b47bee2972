//! Render sampler
//!
//! A dedicated thread snapshots the scene once per tick and hands the frame to
//! a `RenderSink`. It never coordinates with the movement loops: every
//! position is an atomic snapshot, so a frame may mix ticks from different
//! loops (a crew one step behind its board, say) but never shows a torn point.
//!
//! Drawing itself is the sink's business; this module only defines what a
//! frame contains.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::backdrop;
use crate::error::{SimError, SimResult};
use crate::sim::{Scene, StopToken};

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const AQUA: Color = Color::rgb(0, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BROWN: Color = Color::rgb(165, 42, 42);
    pub const SALMON: Color = Color::rgb(250, 128, 114);
    pub const RED: Color = Color::rgb(255, 0, 0);
}

/// Palette used for every frame
pub mod palette {
    use super::Color;

    pub const ARENA: Color = Color::AQUA;
    pub const ISLAND: Color = Color::YELLOW;
    pub const BOARD: Color = Color::BROWN;
    pub const BOARD_LABEL: Color = Color::RED;
    pub const CREW: Color = Color::SALMON;
}

/// Axis-aligned shape: a rectangle, or the ellipse inscribed in it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Top-left corner
    pub origin: Vec2,
    pub size: Vec2,
    pub color: Color,
}

impl Shape {
    pub fn new((origin, size): (Vec2, Vec2), color: Color) -> Self {
        Self {
            origin,
            size,
            color,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.origin + self.size / 2.0
    }
}

/// One board and its crews as drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub id: u32,
    /// Ellipse
    pub hull: Shape,
    /// Where the id is written
    pub label_anchor: Vec2,
    pub label_color: Color,
    /// Crew ellipses
    pub crews: Vec<Shape>,
}

/// Everything a drawing backend needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Sampler iteration that produced the frame
    pub sequence: u64,
    /// Rectangle
    pub arena: Shape,
    /// Ellipse
    pub island: Shape,
    pub boards: Vec<BoardView>,
    /// Whether a backdrop image is available to draw under the arena
    pub has_backdrop: bool,
}

/// Snapshot the scene
pub fn capture(scene: &Scene, sequence: u64) -> RenderFrame {
    let geometry = scene.arena().geometry();
    let boards = scene
        .boards()
        .iter()
        .map(|board| BoardView {
            id: board.id(),
            hull: Shape::new(board.bounds(), palette::BOARD),
            label_anchor: board.center(),
            label_color: palette::BOARD_LABEL,
            crews: board
                .crews()
                .iter()
                .map(|crew| Shape::new(crew.bounds(), palette::CREW))
                .collect(),
        })
        .collect();

    RenderFrame {
        sequence,
        arena: Shape::new((Vec2::ZERO, geometry.size), palette::ARENA),
        island: Shape::new(geometry.island.bounding_box(), palette::ISLAND),
        boards,
        has_backdrop: backdrop::cached().is_some(),
    }
}

/// Receives frames from the sampler thread
pub trait RenderSink: Send {
    fn present(&mut self, frame: &RenderFrame);
}

/// Running sampler thread
pub struct RenderLoop {
    stop: StopToken,
    handle: Option<JoinHandle<u64>>,
}

impl RenderLoop {
    /// Start sampling `scene` every `tick`
    pub fn start(scene: Arc<Scene>, tick: Duration, mut sink: Box<dyn RenderSink>) -> SimResult<Self> {
        let stop = StopToken::new();
        let flag = stop.clone();
        let handle = std::thread::Builder::new()
            .name("render-sampler".to_string())
            .spawn(move || {
                let mut sequence = 0u64;
                while !flag.is_stopped() {
                    let frame = capture(&scene, sequence);
                    sink.present(&frame);
                    sequence += 1;
                    if tick.is_zero() {
                        std::thread::yield_now();
                    } else {
                        std::thread::sleep(tick);
                    }
                }
                sequence
            })
            .map_err(SimError::Spawn)?;

        log::info!("Render loop started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop sampling and wait for the thread; returns frames presented
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.stop();
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        match handle.join() {
            Ok(frames) => {
                log::info!("Render loop stopped after {} frames", frames);
                frames
            }
            Err(_) => {
                log::error!("Render loop panicked");
                0
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
