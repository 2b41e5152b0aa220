//! `bx-output` — file-backed telemetry sinks.
//!
//! One backend today: [`CsvSink`], writing the wire-format CSV served by
//! the download interface.  It implements `bx_sim::TelemetrySink`, so the
//! orchestrator drives it like any other sink.

pub mod csv;
pub mod error;

#[cfg(test)]
mod tests;

pub use crate::csv::CsvSink;
pub use error::{OutputError, OutputResult};
