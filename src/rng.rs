//! Seeded random number generation.
//!
//! All randomness in the simulation (crit rolls, spawn scatter, reward
//! selection, map generation) flows through a single seeded generator so
//! that two worlds created with the same seed evolve identically.

use bevy_ecs::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The simulation's random number generator.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Uniform sample in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.0.gen()
    }

    /// Uniform sample in `[lo, hi)`.
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        self.0.gen_range(lo..hi)
    }

    /// Uniform index in `[0, len)`.
    pub fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}
