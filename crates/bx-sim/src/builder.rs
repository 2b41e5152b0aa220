//! Validating constructor for [`Engine`] and [`SimHandle`].

use bx_core::{BoothId, BorderConfig, PhoneConfig, QueueId, SimClock, SimRng, SimulationConfig};
use bx_model::{ArrivalSource, Assigner, Booth, PhysicsParams, Queue};
use bx_path::Waitline;
use bx_telemetry::TelemetrySynthesizer;

use crate::engine::Engine;
use crate::observer::TelemetrySink;
use crate::runner::{Runner, RunnerConfig, SimHandle};
use crate::SimResult;

/// Default Unix epoch for sim-time zero.  A fixed reference (not "now") so
/// that identically-seeded runs produce identical timestamps; callers that
/// want wall-clock-anchored telemetry pass their own via
/// [`start_epoch`][SimBuilder::start_epoch].
const DEFAULT_START_EPOCH: i64 = 1_700_000_000;

/// Fluent builder for a validated simulation.
///
/// # Required inputs
///
/// - a [`Waitline`] — the geographic path the queues follow
/// - a [`BorderConfig`] — layout and rates
///
/// # Optional inputs (have defaults)
///
/// | Method             | Default                          |
/// |--------------------|----------------------------------|
/// | `.simulation(cfg)` | `SimulationConfig::default()`    |
/// | `.phone(cfg)`      | `PhoneConfig::default()`         |
/// | `.seed(n)`         | `0`                              |
/// | `.start_epoch(t)`  | a fixed reference timestamp      |
/// | `.runner(cfg)`     | `RunnerConfig::default()`        |
///
/// # Example
///
/// ```rust,ignore
/// let engine = SimBuilder::new(waitline, border)
///     .simulation(sim_cfg)
///     .seed(42)
///     .build()?;
/// ```
pub struct SimBuilder {
    waitline: Waitline,
    border: BorderConfig,
    sim_cfg: SimulationConfig,
    phone: PhoneConfig,
    seed: u64,
    start_epoch: i64,
    runner: RunnerConfig,
}

impl SimBuilder {
    pub fn new(waitline: Waitline, border: BorderConfig) -> Self {
        Self {
            waitline,
            border,
            sim_cfg: SimulationConfig::default(),
            phone: PhoneConfig::default(),
            seed: 0,
            start_epoch: DEFAULT_START_EPOCH,
            runner: RunnerConfig::default(),
        }
    }

    pub fn simulation(mut self, cfg: SimulationConfig) -> Self {
        self.sim_cfg = cfg;
        self
    }

    pub fn phone(mut self, cfg: PhoneConfig) -> Self {
        self.phone = cfg;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Unix timestamp of sim-time zero, for absolute telemetry timestamps.
    pub fn start_epoch(mut self, unix_secs: i64) -> Self {
        self.start_epoch = unix_secs;
        self
    }

    pub fn runner(mut self, cfg: RunnerConfig) -> Self {
        self.runner = cfg;
        self
    }

    /// Validate every config and assemble a ready-to-step [`Engine`].
    pub fn build(self) -> SimResult<Engine> {
        self.border.validate()?;
        self.sim_cfg.validate()?;
        self.phone.validate()?;

        // ── Queues and their booth pools ──────────────────────────────────
        let mut queues = Vec::with_capacity(self.border.num_queues);
        let mut booths = Vec::with_capacity(self.border.total_booths());
        let mut rate_idx = 0;
        for qi in 0..self.border.num_queues {
            let queue_id = QueueId(qi as u16);
            let mut queue = Queue::new(queue_id, self.border.max_queue_length);
            for slot in 0..self.border.nodes_per_queue[qi] {
                let booth_id = BoothId(booths.len() as u16);
                let rate = self.border.service_rates[rate_idx];
                rate_idx += 1;
                booths.push(Booth::new(booth_id, queue_id, slot, rate));
                queue.booths.push(booth_id);
            }
            queues.push(queue);
        }

        let arrivals = ArrivalSource::new(self.border.arrival_rate, self.border.arrival_profile);
        let assigner = Assigner::new(self.border.queue_assignment);
        let physics = PhysicsParams::with_safe_distance(self.border.safe_distance);
        let synth = self
            .sim_cfg
            .enable_telemetry
            .then(|| TelemetrySynthesizer::new(self.phone.clone(), self.start_epoch));
        let clock = SimClock::new(self.start_epoch, self.sim_cfg.time_factor);

        log::debug!(
            "built engine: {} queues, {} booths, λ={} cars/min, seed={}",
            queues.len(),
            booths.len(),
            self.border.arrival_rate,
            self.seed
        );

        Ok(Engine::from_parts(
            clock,
            self.border,
            self.sim_cfg,
            physics,
            self.waitline,
            queues,
            booths,
            arrivals,
            assigner,
            synth,
            SimRng::new(self.seed),
        ))
    }

    /// Build and launch on a dedicated orchestrator thread.
    pub fn spawn<S: TelemetrySink + 'static>(self, sink: S) -> SimResult<SimHandle> {
        let runner_cfg = self.runner.clone();
        let engine = self.build()?;
        Ok(Runner::spawn(engine, sink, runner_cfg))
    }
}
