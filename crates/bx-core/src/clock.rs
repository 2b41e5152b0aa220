//! Simulation time model.
//!
//! # Design
//!
//! Sim time is a continuous `f64` second count starting at zero.  The
//! mapping to wall time is:
//!
//!   dt_sim = (wall_now − wall_last) · time_factor,  clamped to max_slice
//!
//! The clamp matters: if the orchestrator thread is descheduled for a long
//! stretch (laptop sleep, debugger pause), the next slice would otherwise be
//! enormous and one physics step would tunnel cars through each other.
//! Capping the slice trades wall-time fidelity for integrator stability.
//!
//! `start_unix_secs` anchors sim-time zero to an absolute timestamp so that
//! telemetry rows carry real-looking clock times; fixing it (instead of
//! sampling "now") makes batch runs byte-reproducible.

use std::time::Instant;

/// Maximum sim-time seconds consumed by a single tick, regardless of how
/// much wall time has passed.
pub const DEFAULT_MAX_SLICE_SECS: f64 = 1.0;

/// Converts wall-clock progress into bounded sim-time slices and tracks the
/// current sim time.
#[derive(Debug)]
pub struct SimClock {
    /// Unix timestamp (seconds since epoch) of sim time 0.
    start_unix_secs: i64,
    /// Current simulation time in seconds.  Non-decreasing.
    sim_time: f64,
    /// Simulated seconds per wall second.  Mutable at runtime.
    time_factor: f64,
    /// Upper bound on the sim-time length of one slice.
    max_slice_secs: f64,
    /// Wall instant of the previous `wall_slice` call.
    last_wall: Option<Instant>,
}

impl SimClock {
    pub fn new(start_unix_secs: i64, time_factor: f64) -> Self {
        Self {
            start_unix_secs,
            sim_time: 0.0,
            time_factor,
            max_slice_secs: DEFAULT_MAX_SLICE_SECS,
            last_wall: None,
        }
    }

    /// Override the per-tick slice cap.
    pub fn with_max_slice(mut self, secs: f64) -> Self {
        self.max_slice_secs = secs;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    #[inline]
    pub fn time_factor(&self) -> f64 {
        self.time_factor
    }

    #[inline]
    pub fn max_slice_secs(&self) -> f64 {
        self.max_slice_secs
    }

    #[inline]
    pub fn start_unix_secs(&self) -> i64 {
        self.start_unix_secs
    }

    /// Absolute Unix time (fractional seconds) corresponding to a sim time.
    #[inline]
    pub fn unix_time_at(&self, sim_time: f64) -> f64 {
        self.start_unix_secs as f64 + sim_time
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    pub fn set_time_factor(&mut self, factor: f64) {
        self.time_factor = factor;
    }

    /// Reset the wall reference without consuming time.  Call once before
    /// the first `wall_slice` and after any deliberate pause.
    pub fn mark_wall(&mut self, now: Instant) {
        self.last_wall = Some(now);
    }

    /// Sim-time slice corresponding to the wall time elapsed since the last
    /// call, clamped to `max_slice_secs`.  Updates the wall reference.
    ///
    /// Does not advance `sim_time` — the caller advances after the physics
    /// step actually consumes the slice.
    pub fn wall_slice(&mut self, now: Instant) -> f64 {
        let dt = match self.last_wall {
            Some(last) => now.duration_since(last).as_secs_f64() * self.time_factor,
            None => 0.0,
        };
        self.last_wall = Some(now);
        dt.min(self.max_slice_secs)
    }

    /// Advance sim time by `dt` seconds.
    ///
    /// # Panics
    /// Panics in debug mode if `dt` is negative.
    pub fn advance(&mut self, dt: f64) {
        debug_assert!(dt >= 0.0, "sim time must not move backwards");
        self.sim_time += dt;
    }
}

impl std::fmt::Display for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.2}s (x{})", self.sim_time, self.time_factor)
    }
}
