//! The per-simulation deterministic random stream.
//!
//! # Determinism strategy
//!
//! Each simulation owns exactly one `SimRng`, seeded from the run's
//! configured seed and advanced only by the orchestrator.  Every stochastic
//! draw — interarrival gaps, service times, sensor noise, random queue
//! assignment — goes through this one stream, so a fixed seed plus a fixed
//! operation order reproduces a run exactly.  The type is deliberately not
//! `Clone`: copying the stream would fork the sequence and silently break
//! reproducibility.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};

/// Single-owner seedable generator producing the exponential, Gaussian, and
/// uniform draws the simulation needs.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Draw from Exp(rate).  Mean is `1.0 / rate`.
    ///
    /// A non-positive or non-finite rate yields `f64::INFINITY` — "the next
    /// event never happens" — rather than a panic, so a profile that scales
    /// a rate to zero simply silences the process.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_) => f64::INFINITY,
        }
    }

    /// Draw from N(mean, std).  A non-positive `std` returns `mean` exactly,
    /// so disabling a noise source is just setting its std to zero.
    pub fn gaussian(&mut self, mean: f64, std: f64) -> f64 {
        match Normal::new(mean, std) {
            Ok(dist) => dist.sample(&mut self.0),
            Err(_) => mean,
        }
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Choose a random element from a slice.  Returns `None` if empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
