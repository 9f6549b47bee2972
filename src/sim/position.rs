//! Lock-free position snapshots
//!
//! Every entity position has exactly one writer at a time (the loop that owns
//! the entity right now) and any number of readers (the render sampler, the
//! parent board). Both coordinates are packed into one `AtomicU64`, so a reader
//! always sees a whole position from some tick, never half of one. It may be
//! stale by a tick; nothing downstream relies on it being current.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;

#[inline]
fn pack(v: Vec2) -> u64 {
    ((v.x.to_bits() as u64) << 32) | v.y.to_bits() as u64
}

#[inline]
fn unpack(bits: u64) -> Vec2 {
    Vec2::new(f32::from_bits((bits >> 32) as u32), f32::from_bits(bits as u32))
}

/// Atomically published `Vec2`
#[derive(Debug)]
pub struct PositionCell(AtomicU64);

impl PositionCell {
    pub fn new(position: Vec2) -> Self {
        Self(AtomicU64::new(pack(position)))
    }

    /// Latest published position
    #[inline]
    pub fn load(&self) -> Vec2 {
        unpack(self.0.load(Ordering::Acquire))
    }

    /// Publish a new position
    #[inline]
    pub fn store(&self, position: Vec2) {
        self.0.store(pack(position), Ordering::Release);
    }

    /// Add `delta` and publish. Only the current owner may call this; the
    /// load/store pair is not a read-modify-write.
    #[inline]
    pub fn advance(&self, delta: Vec2) -> Vec2 {
        let next = self.load() + delta;
        self.store(next);
        next
    }
}
