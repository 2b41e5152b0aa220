//! Poisson arrival source.
//!
//! One global source for the whole crossing; the assignment policy decides
//! which queue each arrival joins.  Inter-arrival gaps are exponential at
//! the (possibly time-scaled) rate in force when the previous arrival was
//! admitted, which is the standard thinning-free approximation for a
//! slowly-varying rate.

use bx_core::{ArrivalProfile, SimRng};

/// Generates scheduled arrival instants.  Back-pressure (dropping arrivals
/// into full queues) is handled by the caller — the source keeps producing
/// the Poisson stream regardless.
#[derive(Debug)]
pub struct ArrivalSource {
    /// Base λ, cars per minute.
    rate_per_min: f64,
    profile: ArrivalProfile,
    /// Sim time of the next scheduled arrival.
    next_arrival: f64,
}

impl ArrivalSource {
    /// The first arrival is scheduled at sim time zero, so a run begins with
    /// a car already at the gate.
    pub fn new(rate_per_min: f64, profile: ArrivalProfile) -> Self {
        Self {
            rate_per_min,
            profile,
            next_arrival: 0.0,
        }
    }

    #[inline]
    pub fn next_due(&self) -> f64 {
        self.next_arrival
    }

    /// Effective λ at `sim_time`, cars per minute.
    pub fn rate_at(&self, sim_time: f64) -> f64 {
        self.rate_per_min * self.profile.factor_at(sim_time)
    }

    /// If an arrival is due at or before `now`, consume it and schedule the
    /// next.  Returns the scheduled instant of the consumed arrival.
    pub fn pop_due(&mut self, now: f64, rng: &mut SimRng) -> Option<f64> {
        if self.next_arrival > now {
            return None;
        }
        let due = self.next_arrival;
        let interarrival_min = rng.exponential(self.rate_at(due));
        self.next_arrival = due + interarrival_min * 60.0;
        Some(due)
    }
}
