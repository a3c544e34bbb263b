//! Explicit simulation context threaded through every call
//!
//! Owns the single random generator so a seed fully determines a run.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

pub struct SimContext {
    rng: StdRng,
    verbosity: u8,
}

impl SimContext {
    /// Seeded context, or one drawing from OS entropy when `seed` is `None`
    pub fn new(seed: Option<u64>, verbosity: u8) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng, verbosity }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed), 0)
    }

    /// 0 is quiet; 2 and above dumps the board every iteration
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fair coin used for every tie-break
    pub fn coin_flip(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    /// True with probability `p` (clamped to [0, 1])
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform integer in `low..=high`
    pub fn range_inclusive(&mut self, low: i64, high: i64) -> i64 {
        self.rng.random_range(low..=high)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
