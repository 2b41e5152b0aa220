//! headless — batch demo for the bx border-crossing simulator.
//!
//! Runs one simulation to completion with no wall clock (batch mode) and
//! writes the telemetry CSV plus a stats table to stdout.  Pass a JSON
//! config file to override the built-in scenario:
//!
//! ```text
//! headless [request.json]
//! ```
//!
//! where the file carries `{border_config, simulation_config?,
//! phone_config?, seed?}`.  Exit codes: 0 on success, 2 on a bad
//! configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use bx_core::{BorderConfig, GeoPoint, PhoneConfig, SimulationConfig};
use bx_output::CsvSink;
use bx_path::Waitline;
use bx_sim::{Engine, SimBuilder, SinkObserver, Snapshot};

// ── Built-in scenario ─────────────────────────────────────────────────────────

const SEED: u64 = 42;
const SIM_SECONDS: f64 = 1_800.0; // half an hour of border traffic
const OUTPUT_DIR: &str = "output/headless";

// ── Request file ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RunRequest {
    border_config: BorderConfig,
    #[serde(default)]
    simulation_config: SimulationConfig,
    #[serde(default)]
    phone_config: PhoneConfig,
    #[serde(default)]
    seed: Option<u64>,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            border_config: BorderConfig::default(),
            simulation_config: SimulationConfig {
                max_simulation_time: SIM_SECONDS,
                ..SimulationConfig::default()
            },
            phone_config: PhoneConfig::default(),
            seed: Some(SEED),
        }
    }
}

/// The approach to the Bridge of the Americas port of entry: north along
/// the highway, a curve onto the bridge, then the booth plaza.
fn approach_waitline() -> Result<Waitline> {
    let line = Waitline::from_points(vec![
        GeoPoint::new(31.7560, -106.4515),
        GeoPoint::new(31.7610, -106.4512),
        GeoPoint::new(31.7638, -106.4508),
        GeoPoint::new(31.7652, -106.4511),
        GeoPoint::new(31.7660, -106.4511),
    ])
    .context("building the approach waitline")?;
    Ok(line)
}

fn configure(path: Option<&String>) -> Result<Engine> {
    let request = match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?;
            serde_json::from_str::<RunRequest>(&raw).with_context(|| format!("parsing {p}"))?
        }
        None => RunRequest::default(),
    };

    SimBuilder::new(approach_waitline()?, request.border_config)
        .simulation(request.simulation_config)
        .phone(request.phone_config)
        .seed(request.seed.unwrap_or(SEED))
        .build()
        .context("validating simulation configuration")
}

fn run(mut engine: Engine) -> Result<()> {
    println!("=== headless — bx border-crossing simulator ===");
    println!(
        "Queues: {}  |  Booths: {}  |  λ: {} cars/min  |  Duration: {} s",
        engine.queues().len(),
        engine.booths().len(),
        engine.border_config().arrival_rate,
        engine.simulation_config().max_simulation_time,
    );
    println!("Waitline: {:.0} m", engine.waitline().total_length());
    println!();

    // 1. Output sink.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let csv_path = Path::new(OUTPUT_DIR).join("telemetry.csv");
    let sink = CsvSink::create(&csv_path)?;
    let mut observer = SinkObserver::new(sink);

    // 2. Run to the terminal state, batch mode.
    let started = std::time::Instant::now();
    let snapshot = engine.run_batch(&mut observer)?;
    let elapsed = started.elapsed();

    if let Some(e) = observer.take_error() {
        log::error!("telemetry output incomplete: {e}");
    }
    let sink = observer.into_inner();

    // 3. Summary.
    print_summary(&snapshot, sink.rows(), &csv_path);
    println!(
        "Simulated {:.0} s in {:.3} s of wall time",
        snapshot.sim_time,
        elapsed.as_secs_f64()
    );
    Ok(())
}

fn print_summary(snapshot: &Snapshot, csv_rows: u64, csv_path: &Path) {
    let stats = &snapshot.stats;
    println!("Final status: {}", snapshot.status);
    println!(
        "  arrivals: {}  completions: {}  dropped: {}  in system: {}",
        stats.total_arrivals,
        stats.total_completions,
        stats.dropped,
        stats.in_system(),
    );
    println!(
        "  throughput: {:.2} cars/min  mean wait: {:.1} s  mean service: {:.1} s",
        stats.throughput_per_min, stats.mean_wait_secs, stats.mean_service_secs,
    );
    println!();

    println!("{:<8} {:>8} {:>8} {:>12} {:>12}", "Booth", "Rate", "Served", "Mean svc", "Utilization");
    println!("{}", "-".repeat(54));
    for booth in &snapshot.booths {
        let mean = if booth.total_served > 0 {
            booth.total_service_time / booth.total_served as f64
        } else {
            0.0
        };
        println!(
            "{:<8} {:>8.1} {:>8} {:>11.1}s {:>11.1}%",
            booth.label,
            booth.service_rate,
            booth.total_served,
            mean,
            booth.utilization * 100.0,
        );
    }
    println!();
    println!("Telemetry: {} rows → {}", csv_rows, csv_path.display());
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let engine = match configure(args.get(1)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("bad configuration: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(engine) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
