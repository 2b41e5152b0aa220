//! CSV telemetry backend.
//!
//! One file per run.  Column order is the wire format consumed by the
//! download interface:
//!
//! ```text
//! timestamp_iso8601, car_id, status, queue_id, latitude, longitude,
//! heading_deg, speed_mps, accel_x, accel_y, accel_z, gyro_x, gyro_y, gyro_z
//! ```
//!
//! Numeric formatting is fixed-precision so that identically-seeded batch
//! runs produce byte-identical files.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use csv::Writer;

use bx_sim::{SinkResult, TelemetrySink};
use bx_telemetry::SensorFrame;

use crate::{OutputError, OutputResult};

const HEADER: [&str; 14] = [
    "timestamp_iso8601",
    "car_id",
    "status",
    "queue_id",
    "latitude",
    "longitude",
    "heading_deg",
    "speed_mps",
    "accel_x",
    "accel_y",
    "accel_z",
    "gyro_x",
    "gyro_y",
    "gyro_z",
];

/// Append-only CSV file of sensor frames.
///
/// Created with the header already written; rows accumulate until
/// [`finalize`][TelemetrySink::finalize] flushes and seals the file.  After
/// finalization the path is safe to hand to the download surface.
pub struct CsvSink {
    writer: Writer<File>,
    path: PathBuf,
    rows: u64,
    finalized: bool,
}

impl CsvSink {
    /// Create (or truncate) the file at `path` and write the header row.
    pub fn create(path: &Path) -> OutputResult<Self> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
            finalized: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn write_frame(&mut self, frame: &SensorFrame) -> OutputResult<()> {
        if self.finalized {
            return Err(OutputError::Finalized);
        }
        self.writer.write_record([
            frame
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            frame.car.0.to_string(),
            frame.status.as_str().to_string(),
            frame.queue.map(|q| q.0.to_string()).unwrap_or_default(),
            format!("{:.7}", frame.latitude),
            format!("{:.7}", frame.longitude),
            format!("{:.2}", frame.heading_deg),
            format!("{:.3}", frame.speed_mps),
            format!("{:.5}", frame.accel[0]),
            format!("{:.5}", frame.accel[1]),
            format!("{:.5}", frame.accel[2]),
            format!("{:.6}", frame.gyro[0]),
            format!("{:.6}", frame.gyro[1]),
            format!("{:.6}", frame.gyro[2]),
        ])?;
        self.rows += 1;
        Ok(())
    }
}

impl TelemetrySink for CsvSink {
    fn append(&mut self, frames: &[SensorFrame]) -> SinkResult<()> {
        for frame in frames {
            self.write_frame(frame)?;
        }
        Ok(())
    }

    /// Flush and seal.  Idempotent.
    fn finalize(&mut self) -> SinkResult<()> {
        if self.finalized {
            return Ok(());
        }
        self.writer.flush().map_err(OutputError::Io)?;
        self.finalized = true;
        Ok(())
    }
}
