//! A service booth: one exponential server.

use bx_core::{BoothId, CarId, QueueId, SimRng};

use crate::{ModelError, ModelResult};

/// One service point.  Busy iff exactly one car references it.
///
/// Service times are drawn at acceptance: `Exp(μ)` minutes with μ in
/// cars/minute.  Changing μ mid-service does not reschedule the in-flight
/// completion — the memoryless draw made at acceptance time stands, and the
/// new rate applies from the next acceptance.
#[derive(Clone, Debug)]
pub struct Booth {
    pub id: BoothId,
    pub queue: QueueId,
    /// Position of this booth within its queue's pool, for display only.
    slot: usize,
    /// μ, cars per minute.
    service_rate: f64,
    current_car: Option<CarId>,
    /// Sim time at which the current service finishes.
    completion_time: Option<f64>,
    pub total_served: u64,
    /// Accumulated busy seconds across completed services.
    pub total_service_time: f64,
}

impl Booth {
    pub fn new(id: BoothId, queue: QueueId, slot: usize, service_rate: f64) -> Self {
        Self {
            id,
            queue,
            slot,
            service_rate,
            current_car: None,
            completion_time: None,
            total_served: 0,
            total_service_time: 0.0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.current_car.is_some()
    }

    #[inline]
    pub fn current_car(&self) -> Option<CarId> {
        self.current_car
    }

    #[inline]
    pub fn completion_time(&self) -> Option<f64> {
        self.completion_time
    }

    #[inline]
    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    /// Human-readable label in the `q<queue>_n<slot>` convention.
    pub fn label(&self) -> String {
        format!("q{}_n{}", self.queue.0, self.slot)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Update μ.  Takes effect at the next acceptance.
    pub fn set_service_rate(&mut self, rate: f64) -> ModelResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ModelError::InvalidServiceRate(rate));
        }
        self.service_rate = rate;
        Ok(())
    }

    /// Accept `car` at sim time `now`, drawing its service duration.
    /// Returns the completion time.
    pub fn start_service(&mut self, car: CarId, now: f64, rng: &mut SimRng) -> ModelResult<f64> {
        if self.is_busy() {
            return Err(ModelError::BoothBusy(self.id));
        }
        let minutes = rng.exponential(self.service_rate);
        let completion = now + minutes * 60.0;
        self.current_car = Some(car);
        self.completion_time = Some(completion);
        Ok(completion)
    }

    /// True once the in-flight service is due at `now`.
    #[inline]
    pub fn is_due(&self, now: f64) -> bool {
        matches!(self.completion_time, Some(t) if t <= now)
    }

    /// Release the current car, recording `service_time` seconds of work.
    /// Returns the released car, or `None` if the booth was idle.
    pub fn finish_service(&mut self, service_time: f64) -> Option<CarId> {
        let car = self.current_car.take()?;
        self.completion_time = None;
        self.total_served += 1;
        self.total_service_time += service_time;
        Some(car)
    }

    /// Mean seconds per completed service, or 0 before the first completion.
    pub fn mean_service_time(&self) -> f64 {
        if self.total_served == 0 {
            0.0
        } else {
            self.total_service_time / self.total_served as f64
        }
    }

    /// Fraction of `elapsed` seconds this booth spent serving.
    pub fn utilization(&self, elapsed: f64) -> f64 {
        if elapsed <= 0.0 {
            0.0
        } else {
            (self.total_service_time / elapsed).min(1.0)
        }
    }
}

impl std::fmt::Display for Booth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}, {}]",
            self.label(),
            if self.is_busy() { "busy" } else { "idle" },
            self.service_rate
        )
    }
}
