//! The single-threaded simulation core.
//!
//! `Engine` owns every car, queue, and booth, the RNG, and the clock.  One
//! call to [`Engine::step`] advances the world by a bounded slice of sim
//! time through the fixed phase order:
//!
//! ```text
//! ① arrivals due in the slice, in scheduled order
//! ② car-following physics, per queue, front to back
//! ③ booth completions, then admissions from the queue heads
//! ④ telemetry frames that have come due
//! ```
//!
//! The phase order is what makes runs reproducible: every RNG draw happens
//! at a deterministic point in the sequence, so a fixed seed plus fixed
//! slices (batch mode) yields identical streams.

use bx_core::{BoothId, CarId, QueueId, SimClock, SimRng};
use bx_core::{BorderConfig, SimulationConfig};
use bx_model::{ArrivalSource, Assigner, Booth, Car, PhysicsParams, Queue};
use bx_path::Waitline;
use bx_telemetry::{SensorFrame, TelemetrySynthesizer};

use crate::control::{ControlError, ControlRequest, ControlResponse};
use crate::observer::SimObserver;
use crate::snapshot::{BoothView, CarView, QueueView, SimStatus, Snapshot};
use crate::stats::SimStats;
use crate::{SimError, SimResult};

/// Service rate (cars/minute) for booths added at runtime without an
/// explicit rate.
pub const DEFAULT_BOOTH_RATE: f64 = 3.0;

/// What one step produced.
#[derive(Debug, Default)]
pub struct StepOutput {
    /// Sim seconds consumed.
    pub dt: f64,
    /// Cars that finished service during the step.
    pub completed: u64,
    /// Cars that entered the system during the step.
    pub spawned: u64,
    /// Sensor frames that came due, ordered per car.
    pub frames: Vec<SensorFrame>,
}

impl StepOutput {
    fn absorb(&mut self, other: StepOutput) {
        self.dt += other.dt;
        self.completed += other.completed;
        self.spawned += other.spawned;
        self.frames.extend(other.frames);
    }
}

/// The simulation state machine.  Exclusive-writer: exactly one owner
/// advances it; everyone else sees published [`Snapshot`]s.
pub struct Engine {
    pub(crate) clock: SimClock,
    pub(crate) border: BorderConfig,
    pub(crate) sim_cfg: SimulationConfig,
    pub(crate) physics: PhysicsParams,
    pub(crate) waitline: Waitline,

    // Arenas, indexed by the typed ids.
    pub(crate) cars: Vec<Car>,
    pub(crate) queues: Vec<Queue>,
    pub(crate) booths: Vec<Booth>,

    pub(crate) arrivals: ArrivalSource,
    pub(crate) assigner: Assigner,
    pub(crate) synth: Option<TelemetrySynthesizer>,
    pub(crate) rng: SimRng,

    pub(crate) stats: SimStats,
    pub(crate) status: SimStatus,
    pub(crate) message: Option<String>,
    /// Frames produced inside `apply` (advance), drained by the driver.
    spillover: Vec<SensorFrame>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        clock: SimClock,
        border: BorderConfig,
        sim_cfg: SimulationConfig,
        physics: PhysicsParams,
        waitline: Waitline,
        queues: Vec<Queue>,
        booths: Vec<Booth>,
        arrivals: ArrivalSource,
        assigner: Assigner,
        synth: Option<TelemetrySynthesizer>,
        rng: SimRng,
    ) -> Self {
        Self {
            clock,
            border,
            sim_cfg,
            physics,
            waitline,
            cars: Vec::new(),
            queues,
            booths,
            arrivals,
            assigner,
            synth,
            rng,
            stats: SimStats::default(),
            status: SimStatus::Running,
            message: None,
            spillover: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    #[inline]
    pub fn status(&self) -> SimStatus {
        self.status
    }

    #[inline]
    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn booths(&self) -> &[Booth] {
        &self.booths
    }

    pub fn waitline(&self) -> &Waitline {
        &self.waitline
    }

    pub fn border_config(&self) -> &BorderConfig {
        &self.border
    }

    pub fn simulation_config(&self) -> &SimulationConfig {
        &self.sim_cfg
    }

    pub fn max_slice_secs(&self) -> f64 {
        self.clock.max_slice_secs()
    }

    // ── Wall-clock coupling (used by the runner) ──────────────────────────

    pub fn mark_wall(&mut self, now: std::time::Instant) {
        self.clock.mark_wall(now);
    }

    /// Clamped sim-time slice for the wall time elapsed since the last call.
    pub fn wall_slice(&mut self, now: std::time::Instant) -> f64 {
        self.clock.wall_slice(now)
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance the world by `dt` sim seconds.  No-op on a terminal engine.
    pub fn step(&mut self, dt: f64) -> SimResult<StepOutput> {
        let mut out = StepOutput::default();
        if self.status.is_terminal() {
            return Ok(out);
        }
        out.dt = dt;
        out.frames = std::mem::take(&mut self.spillover);

        self.clock.advance(dt);
        let now = self.clock.sim_time();

        // ── ① Arrivals ────────────────────────────────────────────────────
        while let Some(due) = self.arrivals.pop_due(now, &mut self.rng) {
            self.stats.record_arrival();
            match self.admit_car(due) {
                Some(_) => out.spawned += 1,
                None => self.stats.record_drop(),
            }
        }

        // ── ② Car-following physics ───────────────────────────────────────
        for queue in &self.queues {
            queue.advance_cars(&mut self.cars, dt, &self.physics);
        }

        // ── ③ Service: completions, then admissions ───────────────────────
        out.completed += self.process_completions(now)?;
        self.process_admissions(now)?;

        // ── ④ Telemetry ───────────────────────────────────────────────────
        if let Some(synth) = &mut self.synth {
            for car in &self.cars {
                synth.emit_due(car, &self.waitline, now, &mut self.rng, &mut out.frames);
            }
        }

        // ── Terminal check ────────────────────────────────────────────────
        if now >= self.sim_cfg.max_simulation_time {
            self.status = SimStatus::Completed;
            log::info!(
                "run complete at t={now:.1}s: {} arrivals, {} completions",
                self.stats.total_arrivals,
                self.stats.total_completions
            );
        }

        Ok(out)
    }

    /// Consume exactly `dt` sim seconds in clamped slices.  Used by the
    /// `advance` control op and by batch mode.
    pub fn advance_by(&mut self, dt: f64) -> SimResult<StepOutput> {
        let slice = self.clock.max_slice_secs();
        let mut out = StepOutput::default();
        let mut remaining = dt;
        while remaining > 0.0 && !self.status.is_terminal() {
            let step = remaining.min(slice);
            out.absorb(self.step(step)?);
            remaining -= step;
        }
        Ok(out)
    }

    /// Run to the terminal state with a fixed slice per step, no wall clock.
    /// This is the deterministic batch mode: fixed seed + fixed config give
    /// identical telemetry and stats across runs.
    pub fn run_batch<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<Snapshot> {
        let slice = self.clock.max_slice_secs();
        while !self.status.is_terminal() {
            let out = self.step(slice)?;
            observer.on_step(self.clock.sim_time(), &out);
        }
        let snap = self.snapshot();
        observer.on_end(&snap);
        Ok(snap)
    }

    // ── Control surface ───────────────────────────────────────────────────

    /// Apply one control operation.  Rejected wholesale on a terminal
    /// engine; failures leave the simulation unchanged.
    ///
    /// Frames produced by `Advance` are buffered internally — drivers must
    /// drain them with [`take_spillover`][Self::take_spillover].
    pub fn apply(&mut self, request: &ControlRequest) -> Result<ControlResponse, ControlError> {
        if self.status.is_terminal() {
            return Err(ControlError::Terminal(self.status));
        }

        match *request {
            ControlRequest::AddCar => {
                self.stats.record_arrival();
                match self.admit_car(self.clock.sim_time()) {
                    Some((car, queue)) => Ok(ControlResponse::CarAdded { car, queue }),
                    None => {
                        self.stats.record_drop();
                        Err(ControlError::AllQueuesFull)
                    }
                }
            }

            ControlRequest::UpdateBoothRate { booth, rate } => {
                let b = self
                    .booths
                    .get_mut(booth.index())
                    .ok_or(ControlError::BoothNotFound(booth))?;
                b.set_service_rate(rate)
                    .map_err(|_| ControlError::InvalidRate(rate))?;
                log::info!("booth {} rate set to {rate} cars/min", b.label());
                Ok(ControlResponse::BoothRateUpdated { booth, rate })
            }

            ControlRequest::AddBooth { queue } => {
                if queue.index() >= self.queues.len() {
                    return Err(ControlError::QueueNotFound(queue));
                }
                let id = match BoothId::try_from(self.booths.len()) {
                    Ok(id) => id,
                    Err(_) => return Err(ControlError::QueueNotFound(queue)),
                };
                let slot = self.queues[queue.index()].booths.len();
                let booth = Booth::new(id, queue, slot, DEFAULT_BOOTH_RATE);
                log::info!("added booth {} to queue {}", booth.label(), queue.0);
                self.booths.push(booth);
                self.queues[queue.index()].booths.push(id);
                Ok(ControlResponse::BoothAdded {
                    booth: id,
                    queue,
                    rate: DEFAULT_BOOTH_RATE,
                })
            }

            ControlRequest::SetTimeFactor { factor } => {
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(ControlError::InvalidTimeFactor(factor));
                }
                self.clock.set_time_factor(factor);
                Ok(ControlResponse::TimeFactorSet { factor })
            }

            ControlRequest::Advance { dt } => {
                if !dt.is_finite() || dt < 0.0 {
                    return Err(ControlError::InvalidAdvance(dt));
                }
                let out = self
                    .advance_by(dt)
                    .map_err(|e| ControlError::Internal(e.to_string()))?;
                self.spillover.extend(out.frames);
                Ok(ControlResponse::Advanced {
                    dt,
                    completed: out.completed,
                    sim_time: self.clock.sim_time(),
                })
            }

            ControlRequest::Cancel => {
                self.cancel();
                Ok(ControlResponse::Cancelled)
            }
        }
    }

    /// Frames buffered by `apply`, in order.
    pub fn take_spillover(&mut self) -> Vec<SensorFrame> {
        std::mem::take(&mut self.spillover)
    }

    /// Transition to Cancelled.  Idempotent; ignored on other terminal
    /// states.
    pub fn cancel(&mut self) {
        if self.status == SimStatus::Running {
            self.status = SimStatus::Cancelled;
            log::info!("run cancelled at t={:.1}s", self.clock.sim_time());
        }
    }

    /// Transition to Failed with a message.
    pub fn fail(&mut self, message: String) {
        if self.status == SimStatus::Running {
            log::error!("run failed at t={:.1}s: {message}", self.clock.sim_time());
            self.status = SimStatus::Failed;
            self.message = Some(message);
        }
    }

    // ── Snapshots ─────────────────────────────────────────────────────────

    /// Build a consistent copy of the current state.
    pub fn snapshot(&mut self) -> Snapshot {
        let now = self.clock.sim_time();
        self.stats.refresh(now);

        let cars = if self.sim_cfg.enable_position_tracking {
            self.cars
                .iter()
                .map(|c| CarView {
                    id: c.id,
                    queue: c.queue,
                    position: c.position,
                    velocity: c.velocity,
                    status: c.status,
                })
                .collect()
        } else {
            Vec::new()
        };

        let booths = self
            .booths
            .iter()
            .map(|b| BoothView {
                id: b.id,
                label: b.label(),
                queue: b.queue,
                is_busy: b.is_busy(),
                current_car: b.current_car(),
                service_rate: b.service_rate(),
                total_served: b.total_served,
                total_service_time: b.total_service_time,
                utilization: b.utilization(now),
            })
            .collect();

        let queues = self
            .queues
            .iter()
            .map(|q| QueueView {
                id: q.id,
                length: q.len(),
                num_booths: q.booths.len(),
                busy_booths: q
                    .booths
                    .iter()
                    .filter(|b| self.booths[b.index()].is_busy())
                    .count(),
            })
            .collect();

        Snapshot {
            sim_time: now,
            status: self.status,
            message: self.message.clone(),
            progress: (now / self.sim_cfg.max_simulation_time).clamp(0.0, 1.0),
            cars,
            booths,
            queues,
            stats: self.stats.clone(),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Admit one car at sim time `t` via the assignment policy.  `None`
    /// when every candidate queue is full.
    fn admit_car(&mut self, t: f64) -> Option<(CarId, QueueId)> {
        let queue_id = self.assigner.choose(&self.queues, &mut self.rng)?;
        let id = CarId(self.cars.len() as u32);
        let queue = &mut self.queues[queue_id.index()];
        let position = queue.entry_position(&self.cars, self.physics.safe_distance);
        queue.push_back(id);
        if let Some(synth) = &mut self.synth {
            synth.register_car(id, t);
        }
        self.cars.push(Car::spawn(id, queue_id, position, t));
        Some((id, queue_id))
    }

    /// Release cars whose service clock has run out.  Completion uses the
    /// drawn completion instant, not the tick boundary, so service-time
    /// statistics are exact.
    fn process_completions(&mut self, now: f64) -> SimResult<u64> {
        let mut completed = 0;
        for booth in &mut self.booths {
            let (Some(done), Some(car_id)) = (booth.completion_time(), booth.current_car())
            else {
                continue;
            };
            if done > now {
                continue;
            }
            let car = &mut self.cars[car_id.index()];
            let started = car.service_started_at.unwrap_or(done);
            car.complete(done).map_err(SimError::Model)?;
            booth.finish_service(done - started);
            self.stats.record_completion(done - started);
            completed += 1;
        }
        Ok(completed)
    }

    /// Hand front-of-queue cars that have reached the stop line to idle
    /// booths.
    fn process_admissions(&mut self, now: f64) -> SimResult<()> {
        for qi in 0..self.queues.len() {
            loop {
                let Some(car_id) = self.queues[qi].admission_candidate(&self.cars) else {
                    break;
                };
                let Some(&booth_id) = self.queues[qi]
                    .booths
                    .iter()
                    .find(|b| !self.booths[b.index()].is_busy())
                else {
                    break;
                };

                self.queues[qi].pop_front();
                let car = &mut self.cars[car_id.index()];
                car.begin_service(now).map_err(SimError::Model)?;
                self.stats.record_service_start(now - car.spawned_at);
                self.booths[booth_id.index()]
                    .start_service(car_id, now, &mut self.rng)
                    .map_err(SimError::Model)?;
            }
        }
        Ok(())
    }
}
