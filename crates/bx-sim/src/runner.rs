//! The orchestrator thread and its external handle.
//!
//! One [`Runner`] thread exists per simulation.  It is the exclusive writer
//! of simulation state: every external mutation travels through the control
//! FIFO and is applied at a tick boundary, and everything observable leaves
//! through the snapshot bus or the telemetry sink.
//!
//! A panic inside the tick body is contained: the run transitions to
//! Failed, a final snapshot is published, the sink is finalized with what
//! was written, and subscribers are closed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bx_core::{BoothId, CarId, QueueId};

use crate::control::{ControlEnvelope, ControlError, ControlRequest, ControlResponse};
use crate::engine::Engine;
use crate::observer::TelemetrySink;
use crate::snapshot::{
    PublishPolicy, SimStatus, Snapshot, SnapshotBus, SnapshotReceiver, DEFAULT_SUBSCRIBER_BACKLOG,
};
use crate::{SimError, SimResult};

static NEXT_SIM_ID: AtomicU64 = AtomicU64::new(0);

/// Pacing and publishing knobs for the orchestrator loop.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Target wall duration of one loop turn.
    pub tick_period: Duration,
    /// Minimum wall time between published snapshots.
    pub publish_period: Duration,
    pub publish_policy: PublishPolicy,
    /// Bounded per-subscriber queue depth.
    pub subscriber_backlog: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(50),
            publish_period: Duration::from_secs(1),
            publish_policy: PublishPolicy::default(),
            subscriber_backlog: DEFAULT_SUBSCRIBER_BACKLOG,
        }
    }
}

/// Result of an `advance` control op.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvanceReport {
    pub advanced_by: f64,
    pub completed_cars: u64,
    pub current_time: f64,
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Spawns and owns nothing itself — a namespace for [`Runner::spawn`].
pub struct Runner;

impl Runner {
    /// Launch `engine` on a dedicated thread, wiring the control FIFO, the
    /// snapshot bus, and the telemetry sink.
    pub fn spawn<S: TelemetrySink + 'static>(
        engine: Engine,
        sink: S,
        config: RunnerConfig,
    ) -> SimHandle {
        let id = format!("sim-{}", NEXT_SIM_ID.fetch_add(1, Ordering::Relaxed));
        let (control_tx, control_rx) = mpsc::channel();
        let bus = Arc::new(SnapshotBus::new(
            config.publish_policy,
            config.subscriber_backlog,
        ));

        let thread_bus = Arc::clone(&bus);
        let thread_id = id.clone();
        let join = thread::spawn(move || {
            let mut ctx = RunnerCtx {
                engine,
                sink,
                control_rx,
                bus: thread_bus,
                config,
            };

            let outcome = {
                let ctx = &mut ctx;
                catch_unwind(AssertUnwindSafe(|| ctx.run()))
            };
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => ctx.engine.fail(e.to_string()),
                Err(payload) => ctx.engine.fail(panic_message(payload.as_ref())),
            }
            ctx.shutdown(&thread_id);
        });

        SimHandle {
            id,
            control: control_tx,
            bus,
            join: Some(join),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("orchestrator panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("orchestrator panicked: {s}")
    } else {
        "orchestrator panicked".to_string()
    }
}

// ── Loop body ─────────────────────────────────────────────────────────────────

struct RunnerCtx<S: TelemetrySink> {
    engine: Engine,
    sink: S,
    control_rx: Receiver<ControlEnvelope>,
    bus: Arc<SnapshotBus>,
    config: RunnerConfig,
}

impl<S: TelemetrySink> RunnerCtx<S> {
    fn run(&mut self) -> SimResult<()> {
        self.engine.mark_wall(Instant::now());
        self.publish();
        let mut last_publish = Instant::now();

        while !self.engine.status().is_terminal() {
            let turn_start = Instant::now();

            // ── ① Control intake, FIFO order ──────────────────────────────
            while let Ok(envelope) = self.control_rx.try_recv() {
                let reply = self.engine.apply(&envelope.request);
                let frames = self.engine.take_spillover();
                if !frames.is_empty() {
                    self.sink.append(&frames).map_err(SimError::Sink)?;
                }
                // A caller that gave up on the reply is not an error.
                let _ = envelope.reply.send(reply);
            }
            if self.engine.status().is_terminal() {
                break;
            }

            // ── ② One clamped wall-clock slice ────────────────────────────
            let dt = self.engine.wall_slice(Instant::now());
            let out = self.engine.step(dt)?;
            if !out.frames.is_empty() {
                self.sink.append(&out.frames).map_err(SimError::Sink)?;
            }

            // ── ③ Publish at most every publish_period ────────────────────
            if last_publish.elapsed() >= self.config.publish_period {
                self.publish();
                last_publish = Instant::now();
            }

            // ── ④ Cooperative cadence ─────────────────────────────────────
            if let Some(rest) = self.config.tick_period.checked_sub(turn_start.elapsed()) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.bus.publish(Arc::new(self.engine.snapshot()));
    }

    /// Terminal sequence: reject stragglers, publish the final snapshot,
    /// finalize the sink, close the bus.
    fn shutdown(&mut self, id: &str) {
        let status = self.engine.status();
        while let Ok(envelope) = self.control_rx.try_recv() {
            let _ = envelope.reply.send(Err(ControlError::Terminal(status)));
        }
        self.publish();
        if let Err(e) = self.sink.finalize() {
            log::error!("{id}: telemetry sink finalize failed: {e}");
        }
        self.bus.close();
        log::info!(
            "{id}: {status} at t={:.1}s ({} completions)",
            self.engine.sim_time(),
            self.engine.stats().total_completions
        );
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// External face of one running simulation: the control surface plus the
/// observer plane.  Cloning is deliberately not offered — the handle is the
/// capability to control the run.
pub struct SimHandle {
    id: String,
    control: Sender<ControlEnvelope>,
    bus: Arc<SnapshotBus>,
    join: Option<JoinHandle<()>>,
}

impl SimHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    // ── Control operations ────────────────────────────────────────────────

    /// Admit one car now.  Returns its id and queue.
    pub fn add_car(&self) -> Result<(CarId, QueueId), ControlError> {
        match self.request(ControlRequest::AddCar)? {
            ControlResponse::CarAdded { car, queue } => Ok((car, queue)),
            _ => Err(ControlError::Disconnected),
        }
    }

    /// Change a booth's service rate (cars/minute, > 0).
    pub fn update_booth_rate(&self, booth: BoothId, rate: f64) -> Result<f64, ControlError> {
        match self.request(ControlRequest::UpdateBoothRate { booth, rate })? {
            ControlResponse::BoothRateUpdated { rate, .. } => Ok(rate),
            _ => Err(ControlError::Disconnected),
        }
    }

    /// Add a booth to `queue` at the default rate.
    pub fn add_booth(&self, queue: QueueId) -> Result<(BoothId, f64), ControlError> {
        match self.request(ControlRequest::AddBooth { queue })? {
            ControlResponse::BoothAdded { booth, rate, .. } => Ok((booth, rate)),
            _ => Err(ControlError::Disconnected),
        }
    }

    pub fn set_time_factor(&self, factor: f64) -> Result<(), ControlError> {
        self.request(ControlRequest::SetTimeFactor { factor })
            .map(|_| ())
    }

    /// Test hook: block until `dt` seconds of sim time have been consumed.
    pub fn advance(&self, dt: f64) -> Result<AdvanceReport, ControlError> {
        match self.request(ControlRequest::Advance { dt })? {
            ControlResponse::Advanced {
                dt,
                completed,
                sim_time,
            } => Ok(AdvanceReport {
                advanced_by: dt,
                completed_cars: completed,
                current_time: sim_time,
            }),
            _ => Err(ControlError::Disconnected),
        }
    }

    /// Cancel at the next tick boundary.
    pub fn cancel(&self) -> Result<(), ControlError> {
        self.request(ControlRequest::Cancel).map(|_| ())
    }

    // ── Observer plane ────────────────────────────────────────────────────

    /// Subscribe to published snapshots.  `None` once the run is terminal.
    pub fn subscribe(&self) -> Option<SnapshotReceiver> {
        self.bus.subscribe()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.bus.latest()
    }

    /// Status from the last published snapshot.
    pub fn status(&self) -> SimStatus {
        self.latest().map(|s| s.status).unwrap_or(SimStatus::Running)
    }

    /// Wait for the orchestrator thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }

    /// True once the orchestrator thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    fn request(&self, request: ControlRequest) -> Result<ControlResponse, ControlError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let envelope = ControlEnvelope {
            request,
            reply: reply_tx,
        };
        if self.control.send(envelope).is_err() {
            return Err(self.closed_error());
        }
        match reply_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(self.closed_error()),
        }
    }

    /// The runner is gone: report the terminal status if we saw one.
    fn closed_error(&self) -> ControlError {
        match self.latest() {
            Some(snap) if snap.status.is_terminal() => ControlError::Terminal(snap.status),
            _ => ControlError::Disconnected,
        }
    }
}
