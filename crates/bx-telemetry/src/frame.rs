//! The plain data row emitted by the synthesizer.

use chrono::{DateTime, Utc};

use bx_core::{CarId, QueueId};
use bx_model::CarStatus;

/// One synthesized sensor sample for one car at one instant.
///
/// Axes are device coordinates after orientation remapping: see
/// [`TelemetrySynthesizer`][crate::TelemetrySynthesizer] for the mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorFrame {
    pub timestamp: DateTime<Utc>,
    pub car: CarId,
    pub status: CarStatus,
    pub queue: Option<QueueId>,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level, with vertical-accuracy noise applied.
    pub altitude: f64,
    /// Path heading, degrees clockwise from north.
    pub heading_deg: f64,
    pub speed_mps: f64,
    /// Accelerometer [x, y, z], m/s², gravity included on z.
    pub accel: [f64; 3],
    /// Gyroscope [x, y, z], rad/s.
    pub gyro: [f64; 3],
}
