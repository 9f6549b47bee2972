//! Arena and island geometry
//!
//! The arena is the rectangle `[0, width] x [0, height]`. The island is a
//! circle whose center sits on the arena's right edge at half height, with a
//! radius of half the height. It is always derived from the current arena
//! size, never stored independently.
//!
//! Containment tests the inflated point `position + footprint / 2`:
//! for a board that is its center, for a crew it is offset by its margin.

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::footprint_center;

/// Circular target zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Island {
    pub center: Vec2,
    pub radius: f32,
}

impl Island {
    /// Island for an arena of the given size
    pub fn for_arena(size: Vec2) -> Self {
        Self {
            center: Vec2::new(size.x, size.y / 2.0),
            radius: size.y / 2.0,
        }
    }

    /// True when the inflated entity point is within the circle (boundary included)
    #[inline]
    pub fn contains_entity(&self, position: Vec2, footprint: Vec2) -> bool {
        let point = footprint_center(position, footprint);
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    /// Top-left corner and size of the square enclosing the circle
    pub fn bounding_box(&self) -> (Vec2, Vec2) {
        let r = Vec2::splat(self.radius);
        (self.center - r, r * 2.0)
    }
}

/// Immutable arena snapshot: size plus the island derived from it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaGeometry {
    pub size: Vec2,
    pub island: Island,
}

impl ArenaGeometry {
    /// Build geometry for a `width` x `height` arena
    ///
    /// Rejects non-finite or non-positive dimensions so the island radius can
    /// never go negative.
    pub fn new(width: f32, height: f32) -> SimResult<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SimError::InvalidArenaSize { width, height });
        }
        let size = Vec2::new(width, height);
        Ok(Self {
            size,
            island: Island::for_arena(size),
        })
    }

    /// True when the inflated entity point lies inside `[0, w] x [0, h]` (edges included)
    #[inline]
    pub fn contains_entity(&self, position: Vec2, footprint: Vec2) -> bool {
        let point = footprint_center(position, footprint);
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.size.x && point.y <= self.size.y
    }

    #[inline]
    pub fn island_contains_entity(&self, position: Vec2, footprint: Vec2) -> bool {
        self.island.contains_entity(position, footprint)
    }
}

/// Shared, resizable arena
///
/// Movement loops take a copy of the geometry once per tick; a resize swaps
/// the whole snapshot under a short write lock, so a loop sees either the old
/// arena or the new one, never a mix.
#[derive(Debug)]
pub struct Arena {
    geometry: RwLock<ArenaGeometry>,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> SimResult<Self> {
        Ok(Self {
            geometry: RwLock::new(ArenaGeometry::new(width, height)?),
        })
    }

    /// Current geometry snapshot
    #[inline]
    pub fn geometry(&self) -> ArenaGeometry {
        *self.geometry.read()
    }

    pub fn size(&self) -> Vec2 {
        self.geometry().size
    }

    pub fn island(&self) -> Island {
        self.geometry().island
    }

    pub fn contains_entity(&self, position: Vec2, footprint: Vec2) -> bool {
        self.geometry().contains_entity(position, footprint)
    }

    pub fn island_contains_entity(&self, position: Vec2, footprint: Vec2) -> bool {
        self.geometry().island_contains_entity(position, footprint)
    }

    /// Reshape the arena and re-derive the island
    ///
    /// Invalid sizes are rejected and leave the current geometry untouched.
    pub fn resize(&self, width: f32, height: f32) -> SimResult<()> {
        let next = match ArenaGeometry::new(width, height) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Ignoring arena resize: {}", e);
                return Err(e);
            }
        };
        let mut geometry = self.geometry.write();
        if *geometry != next {
            log::info!(
                "Arena resized {}x{} -> {}x{}",
                geometry.size.x,
                geometry.size.y,
                width,
                height
            );
            *geometry = next;
        }
        Ok(())
    }
}
