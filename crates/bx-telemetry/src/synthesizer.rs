//! Per-car sensor-frame generation.
//!
//! # Sampling cadence
//!
//! Each car samples at `sampling_rate` Hz of sim time, phase-anchored to its
//! spawn instant.  The synthesizer keeps one "next due" clock per car and
//! emits every sample that has come due, so a large tick produces the same
//! frame count as many small ones.
//!
//! # Sensor model
//!
//! - **GPS**: the waitline position at the car's arc length, plus Gaussian
//!   noise with σ = `horizontal_accuracy / 2` (converted to degrees).
//!   Altitude is a constant reference with `vertical_accuracy` noise.
//! - **Accelerometer**: longitudinal = the car's acceleration, lateral =
//!   v²·κ from path curvature, vertical = g, each with Gaussian noise.
//! - **Gyroscope**: yaw rate = v·κ on the device z-axis; pitch and roll are
//!   zero plus noise.
//!
//! # Device axes
//!
//! | orientation | x            | y            | z        |
//! |-------------|--------------|--------------|----------|
//! | portrait    | lateral      | longitudinal | vertical |
//! | landscape   | longitudinal | lateral      | vertical |

use chrono::{DateTime, Utc};

use bx_core::geo::METERS_PER_DEGREE;
use bx_core::{CarId, DeviceOrientation, PhoneConfig, SimRng};
use bx_model::{Car, CarStatus};
use bx_path::Waitline;

use crate::SensorFrame;

/// Standard gravity, m/s².
const GRAVITY: f64 = 9.81;

/// Reference altitude of the crossing, metres above sea level.
const REFERENCE_ALTITUDE_M: f64 = 1133.0;

/// Generates the telemetry stream for every car in a simulation.
pub struct TelemetrySynthesizer {
    config: PhoneConfig,
    /// Seconds between samples.
    sample_interval: f64,
    /// Unix time of sim-time zero, for absolute timestamps.
    start_unix_secs: i64,
    /// Next sample due per car, indexed by `CarId`.
    next_due: Vec<f64>,
}

impl TelemetrySynthesizer {
    pub fn new(config: PhoneConfig, start_unix_secs: i64) -> Self {
        let sample_interval = 1.0 / config.sampling_rate;
        Self {
            config,
            sample_interval,
            start_unix_secs,
            next_due: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &PhoneConfig {
        &self.config
    }

    /// Register a newly spawned car.  Cars must be registered in `CarId`
    /// order; the first sample is due at the spawn instant itself.
    pub fn register_car(&mut self, car: CarId, spawn_time: f64) {
        debug_assert_eq!(self.next_due.len(), car.index(), "cars register in id order");
        self.next_due.push(spawn_time);
    }

    /// Emit every frame due for `car` at or before `now` into `out`.
    ///
    /// A completed car stops sampling at its completion instant, so the
    /// stream spans exactly spawn → departure.
    pub fn emit_due(
        &mut self,
        car: &Car,
        waitline: &Waitline,
        now: f64,
        rng: &mut SimRng,
        out: &mut Vec<SensorFrame>,
    ) {
        let horizon = match (car.status, car.completed_at) {
            (CarStatus::Completed, Some(done)) => done.min(now),
            _ => now,
        };

        while self.next_due[car.id.index()] <= horizon {
            let t = self.next_due[car.id.index()];
            out.push(self.sample(car, waitline, t, rng));
            self.next_due[car.id.index()] = t + self.sample_interval;
        }
    }

    /// One frame for `car` at sim time `t`, using its current kinematics.
    fn sample(&self, car: &Car, waitline: &Waitline, t: f64, rng: &mut SimRng) -> SensorFrame {
        // The waitline is parametrized from the entry end; the car tracks
        // distance to the stop line.
        let s = (waitline.total_length() - car.position).clamp(0.0, waitline.total_length());
        let (point, heading) = waitline.point_and_heading(s);
        let kappa = waitline.curvature_at(s);

        // ── GPS ───────────────────────────────────────────────────────────
        let sigma_deg = self.config.gps_noise.horizontal_accuracy * 0.5 / METERS_PER_DEGREE;
        let latitude = point.lat + rng.gaussian(0.0, sigma_deg);
        let longitude = point.lon + rng.gaussian(0.0, sigma_deg);
        let altitude =
            REFERENCE_ALTITUDE_M + rng.gaussian(0.0, self.config.gps_noise.vertical_accuracy);

        // ── Accelerometer (car frame → device frame) ──────────────────────
        let noise = self.config.accelerometer_noise;
        let longitudinal = car.acceleration + rng.gaussian(0.0, noise);
        let lateral = car.velocity * car.velocity * kappa + rng.gaussian(0.0, noise);
        let vertical = GRAVITY + rng.gaussian(0.0, noise);
        let accel = match self.config.device_orientation {
            DeviceOrientation::Portrait => [lateral, longitudinal, vertical],
            DeviceOrientation::Landscape => [longitudinal, lateral, vertical],
        };

        // ── Gyroscope ─────────────────────────────────────────────────────
        let gnoise = self.config.gyro_noise;
        let yaw_rate = car.velocity * kappa + rng.gaussian(0.0, gnoise);
        let gyro = [
            rng.gaussian(0.0, gnoise),
            rng.gaussian(0.0, gnoise),
            yaw_rate,
        ];

        SensorFrame {
            timestamp: self.timestamp_at(t),
            car: car.id,
            status: car.status,
            queue: Some(car.queue),
            latitude,
            longitude,
            altitude,
            heading_deg: heading,
            speed_mps: car.velocity,
            accel,
            gyro,
        }
    }

    fn timestamp_at(&self, sim_time: f64) -> DateTime<Utc> {
        let total = self.start_unix_secs as f64 + sim_time;
        let secs = total.floor();
        let nanos = ((total - secs) * 1e9).round() as u32;
        DateTime::<Utc>::from_timestamp(secs as i64, nanos.min(999_999_999))
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }
}
