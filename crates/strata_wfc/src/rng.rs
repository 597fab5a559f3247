//! Random number generator abstraction for the solver.
//!
//! The solver only needs two draws: a uniform index for tie-breaking between
//! equal-entropy cells, and a uniform float for the weighted tile pick. The
//! `WfcRng` trait covers exactly those, so a caller can swap in another
//! generator with `Solver::with_rng`.
//!
//! ```ignore
//! use strata_wfc::rng::{StdRandom, WfcRng};
//!
//! let mut rng = StdRandom::from_u64_seed(42);
//! let i = rng.next_usize_max(10); // 0..10
//! let f = rng.next_double();      // 0.0..1.0
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source owned by a solver.
///
/// Every draw advances the state, so two generators built from the same seed
/// and driven by the same calls produce the same sequence.
pub trait WfcRng: Send + Sync {
    /// Returns a random double in [0.0, 1.0).
    fn next_double(&mut self) -> f64;

    /// Returns a random usize in [0, max). Returns 0 when `max` is 0.
    fn next_usize_max(&mut self, max: usize) -> usize;
}

/// Standard RNG wrapper using `rand::rngs::StdRng`.
#[derive(Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_u64_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl WfcRng for StdRandom {
    fn next_double(&mut self) -> f64 {
        self.rng.gen()
    }

    fn next_usize_max(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }
}
