//! `bx-core` — foundational types for the `bx` border-crossing simulator.
//!
//! This crate is a dependency of every other `bx-*` crate.  It intentionally
//! has no `bx-*` dependencies and a small external surface (`rand`,
//! `rand_distr`, `serde`, `thiserror`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`ids`]     | `CarId`, `QueueId`, `BoothId`                           |
//! | [`geo`]     | `GeoPoint`, haversine distance, bearings                |
//! | [`rng`]     | `SimRng` — the single per-simulation random stream      |
//! | [`clock`]   | `SimClock` — wall-clock → sim-time mapping              |
//! | [`config`]  | `BorderConfig`, `SimulationConfig`, `PhoneConfig`       |
//! | [`error`]   | `CoreError`, `CoreResult`                               |

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use clock::SimClock;
pub use config::{
    ArrivalProfile, BorderConfig, DeviceOrientation, GpsNoise, PhoneConfig, QueueAssignment,
    SimulationConfig,
};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{BoothId, CarId, QueueId};
pub use rng::SimRng;
