//! `bx-telemetry` — synthesized handset sensor frames.
//!
//! Converts car kinematics into the stream a phone mounted in the car would
//! record: GPS fixes with accuracy-scaled noise, accelerometer readings in
//! device coordinates, and gyroscope rates derived from path curvature.
//!
//! The synthesizer draws all noise from the simulation's single RNG stream,
//! so telemetry is reproducible under a fixed seed in batch mode.

pub mod frame;
pub mod synthesizer;


pub use frame::SensorFrame;
pub use synthesizer::TelemetrySynthesizer;
