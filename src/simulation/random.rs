//! Random source shared by the tick stages
//!
//! Seeded runs use a `StdRng`; unseeded runs fall back to the thread RNG.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Default)]
pub struct SimRng {
    rng: Option<StdRng>,
}

impl SimRng {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map(StdRng::seed_from_u64),
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.rng.is_some()
    }

    /// Uniform in `[low, high]`; returns `low` for an empty range
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        match &mut self.rng {
            Some(rng) => rng.random_range(low..=high),
            None => rand::rng().random_range(low..=high),
        }
    }

    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }
}
