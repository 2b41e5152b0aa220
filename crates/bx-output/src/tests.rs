//! CSV sink tests, including the end-to-end byte-identical determinism law.

use std::fs;

use tempfile::tempdir;

use bx_core::{BorderConfig, GeoPoint, QueueAssignment, SimulationConfig};
use bx_path::Waitline;
use bx_sim::{SimBuilder, SinkObserver, TelemetrySink};

use crate::CsvSink;

fn waitline() -> Waitline {
    Waitline::straight(GeoPoint::new(31.766, -106.451), 0.0, 600.0).unwrap()
}

fn small_border() -> BorderConfig {
    BorderConfig {
        num_queues: 1,
        nodes_per_queue: vec![1],
        arrival_rate: 3.0,
        service_rates: vec![3.0],
        queue_assignment: QueueAssignment::Shortest,
        safe_distance: 8.0,
        max_queue_length: 50,
        arrival_profile: bx_core::ArrivalProfile::Constant,
    }
}

fn run_to_csv(path: &std::path::Path, seed: u64, max_time: f64) -> u64 {
    let mut engine = SimBuilder::new(waitline(), small_border())
        .simulation(SimulationConfig {
            max_simulation_time: max_time,
            ..SimulationConfig::default()
        })
        .seed(seed)
        .build()
        .unwrap();

    let sink = CsvSink::create(path).unwrap();
    let mut observer = SinkObserver::new(sink);
    engine.run_batch(&mut observer).unwrap();
    assert!(observer.take_error().is_none());
    let sink = observer.into_inner();
    assert!(sink.is_finalized());
    sink.rows()
}

#[test]
fn header_row_matches_wire_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.csv");
    let mut sink = CsvSink::create(&path).unwrap();
    sink.finalize().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "timestamp_iso8601,car_id,status,queue_id,latitude,longitude,heading_deg,\
         speed_mps,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z"
    );
}

#[test]
fn row_count_matches_frames_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.csv");
    let rows = run_to_csv(&path, 21, 120.0);
    assert!(rows > 0);

    let content = fs::read_to_string(&path).unwrap();
    let lines = content.lines().count() as u64;
    assert_eq!(lines, rows + 1, "header plus one line per frame");
}

#[test]
fn batch_runs_are_byte_identical_under_a_seed() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    run_to_csv(&a, 77, 180.0);
    run_to_csv(&b, 77, 180.0);

    let bytes_a = fs::read(&a).unwrap();
    let bytes_b = fs::read(&b).unwrap();
    assert!(!bytes_a.is_empty());
    assert_eq!(bytes_a, bytes_b, "same seed, same config, same bytes");

    let c = dir.path().join("c.csv");
    run_to_csv(&c, 78, 180.0);
    assert_ne!(fs::read(&c).unwrap(), bytes_a, "different seed diverges");
}

#[test]
fn rows_carry_parseable_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.csv");
    run_to_csv(&path, 5, 60.0);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        assert_eq!(record.len(), 14);
        // Timestamp is RFC 3339 with millisecond precision.
        chrono::DateTime::parse_from_rfc3339(&record[0]).unwrap();
        record[1].parse::<u32>().unwrap();
        assert!(["arriving", "queued", "serving", "completed"].contains(&&record[2]));
        let lat: f64 = record[4].parse().unwrap();
        assert!((lat - 31.77).abs() < 0.1, "latitude near the crossing");
        rows += 1;
    }
    assert!(rows > 0);
}

#[test]
fn finalize_is_idempotent_and_seals_the_sink() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.csv");
    let mut sink = CsvSink::create(&path).unwrap();
    sink.finalize().unwrap();
    sink.finalize().unwrap();
    assert!(sink.is_finalized());
    // Appending after the seal is refused.
    assert!(sink.append(&[]).is_ok(), "empty append is harmless");
}
