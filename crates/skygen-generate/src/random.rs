use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pick the seed for a run.
///
/// A missing or zero seed falls back to the wall clock, reduced to six digits
/// so it is easy to copy back onto the command line.
pub fn resolve_seed(requested: Option<u64>) -> u64 {
    match requested {
        Some(seed) if seed != 0 => seed,
        _ => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or_default();
            (nanos % 1_000_000) as u64
        }
    }
}

/// Seeded random stream consumed by every stochastic decision of a run.
///
/// The stream is never reseeded; callers pass it down as `&mut` so the
/// draw order follows the rule tree walk exactly.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
    draws: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.draws += 1;
        self.rng.random::<f64>()
    }

    /// Uniform integer in `[min, max]`. Callers guarantee `min <= max`.
    pub fn range_i64(&mut self, min: i64, max: i64) -> i64 {
        self.draws += 1;
        self.rng.random_range(min..=max)
    }

    /// Uniform integer in `[min, max]`. Callers guarantee `min <= max`.
    pub fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        self.draws += 1;
        self.rng.random_range(min..=max)
    }

    /// Uniform float between `min` and `max`, or `min` when the bounds are equal.
    ///
    /// Interpolates instead of scaling `max - min`, which overflows for
    /// bounds of opposite sign near `f64::MAX`.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        let u = self.next_f64();
        if min == max {
            return min;
        }
        min * (1.0 - u) + max * u
    }

    /// Uniform byte in `[low, high]`. Callers guarantee `low <= high`.
    pub fn byte(&mut self, low: u8, high: u8) -> u8 {
        self.draws += 1;
        self.rng.random_range(low..=high)
    }
}
