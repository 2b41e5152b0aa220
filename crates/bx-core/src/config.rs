//! Configuration surface.
//!
//! The original system took dictionary-shaped configuration; here it is a
//! closed set of structs with enumerated variants.  Unknown keys are a
//! deserialization error (`deny_unknown_fields`), and every struct has a
//! `validate()` that names the offending field, so a bad request is rejected
//! before a simulation is ever constructed.
//!
//! Rates are expressed in **cars per minute** throughout, matching the units
//! operators think in; the engine converts to per-second internally.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ── Queue assignment ──────────────────────────────────────────────────────────

/// Strategy for routing an arriving car to a queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAssignment {
    /// Uniform over queues with capacity, drawn from the simulation RNG.
    Random,
    /// Queue with the minimum current length; ties go to the lowest id.
    Shortest,
    /// Cyclic index, skipping full queues; advances on successful admit.
    RoundRobin,
}

/// Time profile applied to the arrival rate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalProfile {
    /// λ is constant for the whole run.
    Constant,
    /// λ is scaled by the hour of sim time: ×0.75 during 06–09, ×0.9
    /// during 16–19, ×0.1 during 22–04, ×0.25 otherwise.
    Daily,
}

impl ArrivalProfile {
    /// Rate multiplier at `sim_time` seconds past the (midnight-anchored)
    /// start of the run.
    pub fn factor_at(self, sim_time: f64) -> f64 {
        match self {
            ArrivalProfile::Constant => 1.0,
            ArrivalProfile::Daily => {
                let hour = (sim_time / 3600.0) % 24.0;
                if (6.0..9.0).contains(&hour) {
                    0.75
                } else if (16.0..19.0).contains(&hour) {
                    0.9
                } else if hour >= 22.0 || hour < 4.0 {
                    0.1
                } else {
                    0.25
                }
            }
        }
    }
}

// ── Border layout ─────────────────────────────────────────────────────────────

/// Layout and stochastic parameters of the crossing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BorderConfig {
    /// Number of parallel queues (lanes).
    pub num_queues: usize,
    /// Booths behind each queue.  Length must equal `num_queues`.
    pub nodes_per_queue: Vec<usize>,
    /// Overall arrival rate λ, cars per minute.
    pub arrival_rate: f64,
    /// Service rate μ per booth, cars per minute.  Length must equal the
    /// total booth count, in queue order.
    pub service_rates: Vec<f64>,
    pub queue_assignment: QueueAssignment,
    /// Minimum gap between stopped cars, metres.
    pub safe_distance: f64,
    /// Arrivals to a queue at this length are dropped.
    pub max_queue_length: usize,
    pub arrival_profile: ArrivalProfile,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            num_queues: 3,
            nodes_per_queue: vec![2, 3, 2],
            arrival_rate: 6.0,
            service_rates: vec![3.5, 3.0, 4.0, 3.2, 3.8, 3.1, 3.9],
            queue_assignment: QueueAssignment::Shortest,
            safe_distance: 8.0,
            max_queue_length: 50,
            arrival_profile: ArrivalProfile::Constant,
        }
    }
}

impl BorderConfig {
    /// Total booth count across all queues.
    pub fn total_booths(&self) -> usize {
        self.nodes_per_queue.iter().sum()
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.num_queues == 0 {
            return Err(CoreError::Config("num_queues must be at least 1".into()));
        }
        if self.nodes_per_queue.len() != self.num_queues {
            return Err(CoreError::Config(format!(
                "nodes_per_queue has {} entries, expected num_queues = {}",
                self.nodes_per_queue.len(),
                self.num_queues
            )));
        }
        if self.nodes_per_queue.iter().any(|&n| n == 0) {
            return Err(CoreError::Config(
                "every queue needs at least one service node".into(),
            ));
        }
        let total = self.total_booths();
        if self.service_rates.len() != total {
            return Err(CoreError::Config(format!(
                "service_rates has {} entries, expected total nodes = {}",
                self.service_rates.len(),
                total
            )));
        }
        if self.service_rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(CoreError::Config(
                "service_rates must all be positive".into(),
            ));
        }
        if !self.arrival_rate.is_finite() || self.arrival_rate <= 0.0 {
            return Err(CoreError::Config("arrival_rate must be positive".into()));
        }
        if !self.safe_distance.is_finite() || self.safe_distance <= 0.0 {
            return Err(CoreError::Config("safe_distance must be positive".into()));
        }
        if self.max_queue_length == 0 {
            return Err(CoreError::Config(
                "max_queue_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Run parameters ────────────────────────────────────────────────────────────

/// Execution parameters for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Sim-time bound, seconds.  The run completes when it is reached.
    pub max_simulation_time: f64,
    /// Simulated seconds per wall second.
    pub time_factor: f64,
    /// Synthesize sensor frames.
    pub enable_telemetry: bool,
    /// Include per-car kinematics in published snapshots.
    pub enable_position_tracking: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_simulation_time: 3600.0,
            time_factor: 1.0,
            enable_telemetry: true,
            enable_position_tracking: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.max_simulation_time.is_finite() || self.max_simulation_time <= 0.0 {
            return Err(CoreError::Config(
                "max_simulation_time must be positive".into(),
            ));
        }
        if !self.time_factor.is_finite() || self.time_factor <= 0.0 {
            return Err(CoreError::Config("time_factor must be positive".into()));
        }
        Ok(())
    }
}

// ── Phone / sensor parameters ─────────────────────────────────────────────────

/// GPS accuracy model: reported fixes get Gaussian noise derived from these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpsNoise {
    /// Horizontal accuracy in metres (1σ ≈ half of this).
    pub horizontal_accuracy: f64,
    /// Vertical accuracy in metres.
    pub vertical_accuracy: f64,
}

impl Default for GpsNoise {
    fn default() -> Self {
        Self {
            horizontal_accuracy: 5.0,
            vertical_accuracy: 3.0,
        }
    }
}

/// How the simulated handset is mounted in the car.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    /// Upright: the car's longitudinal axis maps to the device y-axis.
    Portrait,
    /// Sideways: the car's longitudinal axis maps to the device x-axis.
    Landscape,
}

/// Configuration for the synthesized mobile-phone sensors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhoneConfig {
    /// Sensor sampling rate, Hz.
    pub sampling_rate: f64,
    pub gps_noise: GpsNoise,
    /// Accelerometer noise std, m/s².
    pub accelerometer_noise: f64,
    /// Gyroscope noise std, rad/s.
    pub gyro_noise: f64,
    pub device_orientation: DeviceOrientation,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 10.0,
            gps_noise: GpsNoise::default(),
            accelerometer_noise: 0.01,
            gyro_noise: 0.001,
            device_orientation: DeviceOrientation::Portrait,
        }
    }
}

impl PhoneConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return Err(CoreError::Config("sampling_rate must be positive".into()));
        }
        if self.gps_noise.horizontal_accuracy < 0.0 || self.gps_noise.vertical_accuracy < 0.0 {
            return Err(CoreError::Config(
                "gps_noise accuracies must be non-negative".into(),
            ));
        }
        if self.accelerometer_noise < 0.0 {
            return Err(CoreError::Config(
                "accelerometer_noise must be non-negative".into(),
            ));
        }
        if self.gyro_noise < 0.0 {
            return Err(CoreError::Config("gyro_noise must be non-negative".into()));
        }
        Ok(())
    }
}
