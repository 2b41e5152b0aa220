//! Car state and the kinematic step.
//!
//! # Coordinate convention
//!
//! `position` is arc-length distance to the stop line in metres; it grows
//! toward the tail of the queue and shrinks as the car advances.  The stop
//! line is `position == 0`.
//!
//! # Car-following model
//!
//! Relaxation toward a target velocity with time constant τ, capped at
//! ±a_max, overridden by a kinematic braking law whenever the gap to the
//! predecessor falls inside the reaction envelope
//! `safe_distance + v · t_reaction`.  The braking deceleration is chosen to
//! stop the car before it closes `gap − safe_distance`, so followers settle
//! exactly one safe distance behind their predecessor.

use serde::{Deserialize, Serialize};

use bx_core::{CarId, QueueId};

use crate::{ModelError, ModelResult};

/// Guard against division by a vanishing braking distance.
const BRAKE_EPS: f64 = 0.05;

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle of a car.  Transitions are monotonic: Arriving → Queued →
/// Serving → Completed.  A car joining an empty line with a free booth may
/// skip Queued.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    /// Rolling toward the back of the line.
    Arriving,
    /// Has come to rest in the line at least once.
    Queued,
    /// At a booth, being processed.
    Serving,
    /// Service finished; kept for history.
    Completed,
}

impl CarStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CarStatus::Arriving => "arriving",
            CarStatus::Queued => "queued",
            CarStatus::Serving => "serving",
            CarStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Physics parameters ────────────────────────────────────────────────────────

/// Tuning constants for the car-following integrator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsParams {
    /// Free-flow cruising speed, m/s.
    pub v_max: f64,
    /// Velocity relaxation time constant, seconds.
    pub tau: f64,
    /// Acceleration magnitude cap, m/s².
    pub a_max: f64,
    /// Driver reaction time folded into the braking envelope, seconds.
    pub t_reaction: f64,
    /// Minimum gap between stopped cars, metres.
    pub safe_distance: f64,
}

impl PhysicsParams {
    /// Standard tuning (13.4 m/s cruise, 1 s relaxation, 2 m/s² cap) with
    /// the crossing's configured safe distance.
    pub fn with_safe_distance(safe_distance: f64) -> Self {
        Self {
            v_max: 13.4,
            tau: 1.0,
            a_max: 2.0,
            t_reaction: 1.0,
            safe_distance,
        }
    }
}

// ── Car ───────────────────────────────────────────────────────────────────────

/// One vehicle.  Lives in the orchestrator's car arena for the whole run;
/// completed cars are kept for history and statistics.
#[derive(Clone, Debug)]
pub struct Car {
    pub id: CarId,
    pub queue: QueueId,
    /// Metres to the stop line; decreases as the car advances.
    pub position: f64,
    /// m/s, always ≥ 0.
    pub velocity: f64,
    /// m/s² applied during the last step.
    pub acceleration: f64,
    pub status: CarStatus,
    /// Sim time of arrival into the system.
    pub spawned_at: f64,
    pub service_started_at: Option<f64>,
    pub completed_at: Option<f64>,
}

impl Car {
    /// A new car entering `queue` at `position`, at rest.
    pub fn spawn(id: CarId, queue: QueueId, position: f64, now: f64) -> Self {
        Self {
            id,
            queue,
            position,
            velocity: 0.0,
            acceleration: 0.0,
            status: CarStatus::Arriving,
            spawned_at: now,
            service_started_at: None,
            completed_at: None,
        }
    }

    // ── Status transitions ────────────────────────────────────────────────

    /// Arriving → Queued, the first time the car comes to rest in line.
    pub fn settle(&mut self) {
        if self.status == CarStatus::Arriving {
            self.status = CarStatus::Queued;
        }
    }

    pub fn begin_service(&mut self, now: f64) -> ModelResult<()> {
        match self.status {
            CarStatus::Arriving | CarStatus::Queued => {
                self.status = CarStatus::Serving;
                self.service_started_at = Some(now);
                self.velocity = 0.0;
                self.acceleration = 0.0;
                Ok(())
            }
            _ => Err(ModelError::BadStatusTransition {
                car: self.id,
                status: self.status.as_str(),
                wanted: "serving",
            }),
        }
    }

    pub fn complete(&mut self, now: f64) -> ModelResult<()> {
        match self.status {
            CarStatus::Serving => {
                self.status = CarStatus::Completed;
                self.completed_at = Some(now);
                Ok(())
            }
            _ => Err(ModelError::BadStatusTransition {
                car: self.id,
                status: self.status.as_str(),
                wanted: "completed",
            }),
        }
    }

    // ── Derived times ─────────────────────────────────────────────────────

    /// Seconds spent waiting before service started.
    pub fn wait_time(&self) -> Option<f64> {
        self.service_started_at.map(|s| s - self.spawned_at)
    }

    /// Seconds spent in service.
    pub fn service_time(&self) -> Option<f64> {
        match (self.service_started_at, self.completed_at) {
            (Some(s), Some(c)) => Some(c - s),
            _ => None,
        }
    }

    // ── Kinematics ────────────────────────────────────────────────────────

    /// Target velocity for the next step: stopped while serving, cruising
    /// otherwise.
    pub fn target_velocity(&self, params: &PhysicsParams) -> f64 {
        match self.status {
            CarStatus::Serving | CarStatus::Completed => 0.0,
            _ => params.v_max,
        }
    }

    /// Advance the car by `dt` seconds against a gap of `gap` metres to its
    /// movement constraint (predecessor or stop line).
    ///
    /// Velocity is clamped to `[0, v_max]`.  Displacement is clamped to
    /// `[0, gap − safe_distance]`: explicit Euler overshoots the braking
    /// law by a fraction of a step, and without the cap that overshoot
    /// would leave stopped cars inside each other's safe envelope.
    /// Overtake prevention proper is the queue's job — it knows the
    /// predecessor.
    pub fn step(&mut self, target_velocity: f64, gap: f64, dt: f64, params: &PhysicsParams) {
        let mut a = ((target_velocity - self.velocity) / params.tau).clamp(-params.a_max, params.a_max);

        // Inside the reaction envelope, brake hard enough to stop before
        // the gap closes to the safe distance.  The braking deceleration is
        // deliberately not clamped to a_max.
        if gap < params.safe_distance + self.velocity * params.t_reaction {
            let room = (gap - params.safe_distance).max(BRAKE_EPS);
            let brake = -(self.velocity * self.velocity) / (2.0 * room);
            a = a.min(brake);
        }

        let v_new = (self.velocity + a * dt).clamp(0.0, params.v_max);
        let room = (gap - params.safe_distance).max(0.0);
        let ds = (self.velocity * dt + 0.5 * a * dt * dt).clamp(0.0, room);

        self.acceleration = a;
        self.velocity = v_new;
        self.position = (self.position - ds).max(0.0);
    }

    /// True once the car has effectively come to rest in line: crawling
    /// speed and not accelerating.  (Velocity decays asymptotically under
    /// the braking law and never reaches exactly zero.)
    pub fn is_at_rest(&self) -> bool {
        self.velocity < 0.05 && self.acceleration <= 0.0
    }
}
