//! Speed sampling policy
//!
//! Boards and crews each draw their own horizontal speed at creation. The
//! policy is injected so tests can pin speeds.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{SPEED_MAX, SPEED_MIN};

/// Inclusive speed range in units per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f32,
    pub max: f32,
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self {
            min: SPEED_MIN,
            max: SPEED_MAX,
        }
    }
}

impl SpeedRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Finite, positive, ordered, and holding at least one whole hundredth
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min > 0.0
            && self.min <= self.max
            && self.hundredths().is_some()
    }

    /// Smallest and largest `k` with `k / 100` inside the range, `k >= 1`
    pub fn hundredths(&self) -> Option<(u32, u32)> {
        let mut lo = (self.min * 100.0).floor().max(1.0);
        if lo / 100.0 < self.min {
            lo += 1.0;
        }
        let mut hi = (self.max * 100.0).ceil();
        if hi / 100.0 > self.max {
            hi -= 1.0;
        }
        (lo <= hi).then_some((lo as u32, hi as u32))
    }

    pub fn contains(&self, speed: f32) -> bool {
        (self.min..=self.max).contains(&speed)
    }
}

/// Source of per-entity speeds
pub trait SpeedSampler: Send {
    fn sample(&mut self, range: SpeedRange) -> f32;
}

/// Seeded sampler drawing speeds in steps of 0.01
#[derive(Debug, Clone)]
pub struct PcgSpeedSampler {
    rng: Pcg32,
}

impl PcgSpeedSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Seed from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }
}

impl SpeedSampler for PcgSpeedSampler {
    /// A range without a whole hundredth in it yields its minimum
    fn sample(&mut self, range: SpeedRange) -> f32 {
        match range.hundredths() {
            Some((lo, hi)) => self.rng.random_range(lo..=hi) as f32 / 100.0,
            None => range.min,
        }
    }
}

/// Hands out a fixed list of speeds in order, cycling at the end
#[derive(Debug, Clone)]
pub struct FixedSpeeds {
    speeds: Vec<f32>,
    next: usize,
}

impl FixedSpeeds {
    pub fn new(speeds: Vec<f32>) -> Self {
        Self {
            speeds,
            next: 0,
        }
    }
}

impl SpeedSampler for FixedSpeeds {
    /// Ignores the range; an empty list yields the range minimum
    fn sample(&mut self, range: SpeedRange) -> f32 {
        if self.speeds.is_empty() {
            return range.min;
        }
        let speed = self.speeds[self.next % self.speeds.len()];
        self.next += 1;
        speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcg_sampler_stays_in_range() {
        let mut sampler = PcgSpeedSampler::new(42);
        let range = SpeedRange::default();
        for _ in 0..1000 {
            let speed = sampler.sample(range);
            assert!(range.contains(speed), "speed {speed} out of range");
        }
    }

    #[test]
    fn test_samples_stay_inside_odd_ranges() {
        let mut sampler = PcgSpeedSampler::new(3);
        for range in [
            SpeedRange::new(0.1, 0.104),
            SpeedRange::new(0.105, 0.2),
            SpeedRange::new(0.01, 0.01),
            SpeedRange::new(0.333, 0.777),
        ] {
            assert!(range.is_valid(), "{range:?}");
            for _ in 0..200 {
                let speed = sampler.sample(range);
                assert!(speed > 0.0);
                assert!(range.contains(speed), "{speed} outside {range:?}");
            }
        }
        assert_eq!(sampler.sample(SpeedRange::new(0.1, 0.104)), 0.1);
    }

    #[test]
    fn test_ranges_without_a_hundredth_are_invalid() {
        // Would round to a zero speed
        let tiny = SpeedRange::new(0.004, 0.004);
        assert!(!tiny.is_valid());
        assert_eq!(tiny.hundredths(), None);
        // Would round to 0.1, below the minimum
        let between = SpeedRange::new(0.104, 0.104);
        assert!(!between.is_valid());
        assert_eq!(between.hundredths(), None);

        assert_eq!(SpeedRange::default().hundredths(), Some((10, 110)));
    }

    #[test]
    fn test_pcg_sampler_is_deterministic() {
        let mut a = PcgSpeedSampler::new(7);
        let mut b = PcgSpeedSampler::new(7);
        let range = SpeedRange::default();
        for _ in 0..32 {
            assert_eq!(a.sample(range), b.sample(range));
        }
    }

    #[test]
    fn test_degenerate_range_yields_single_speed() {
        let mut sampler = PcgSpeedSampler::new(1);
        let speed = sampler.sample(SpeedRange::new(0.5, 0.5));
        assert!((speed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_speeds_cycle() {
        let mut sampler = FixedSpeeds::new(vec![0.5, 1.0]);
        let range = SpeedRange::default();
        assert_eq!(sampler.sample(range), 0.5);
        assert_eq!(sampler.sample(range), 1.0);
        assert_eq!(sampler.sample(range), 0.5);
        assert_eq!(FixedSpeeds::new(Vec::new()).sample(range), range.min);
    }

    #[test]
    fn test_range_validation() {
        assert!(SpeedRange::default().is_valid());
        assert!(!SpeedRange::new(1.0, 0.5).is_valid());
        assert!(!SpeedRange::new(-0.1, 0.5).is_valid());
        assert!(!SpeedRange::new(0.0, 0.5).is_valid());
        assert!(SpeedRange::new(0.2, 0.8).contains(0.8));
    }
}
