//! Observer and sink traits driven by the engine and runner.

use bx_telemetry::SensorFrame;

use crate::engine::StepOutput;
use crate::snapshot::Snapshot;

/// Result type for sink operations.  Backends bring their own error types;
/// the orchestrator only needs `Display` and `Send`.
pub type SinkResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

// ── Telemetry sink ────────────────────────────────────────────────────────────

/// Append-only consumer of sensor frames, owned and driven exclusively by
/// the orchestrator.
pub trait TelemetrySink: Send {
    /// Append a batch of frames, in order.
    fn append(&mut self, frames: &[SensorFrame]) -> SinkResult<()>;

    /// Flush and seal the output.  Called exactly once, on the terminal
    /// transition; implementations should be idempotent anyway.
    fn finalize(&mut self) -> SinkResult<()>;
}

/// A [`TelemetrySink`] that discards everything.
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn append(&mut self, _frames: &[SensorFrame]) -> SinkResult<()> {
        Ok(())
    }
    fn finalize(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// A [`TelemetrySink`] that buffers frames in memory.  Handy in tests.
#[derive(Default)]
pub struct VecSink {
    pub frames: Vec<SensorFrame>,
    pub finalized: bool,
}

impl TelemetrySink for VecSink {
    fn append(&mut self, frames: &[SensorFrame]) -> SinkResult<()> {
        self.frames.extend_from_slice(frames);
        Ok(())
    }
    fn finalize(&mut self) -> SinkResult<()> {
        self.finalized = true;
        Ok(())
    }
}

// ── Step observer ─────────────────────────────────────────────────────────────

/// Callbacks invoked by [`Engine::run_batch`][crate::Engine::run_batch] at
/// key points.  All methods default to no-ops so implementors only override
/// what they care about.
pub trait SimObserver {
    /// After every step.
    fn on_step(&mut self, _sim_time: f64, _output: &StepOutput) {}

    /// After the terminal transition, with the final snapshot.
    fn on_end(&mut self, _final_snapshot: &Snapshot) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Bridges batch runs to a [`TelemetrySink`]: frames from every step are
/// appended, and the sink is finalized at the end of the run.
///
/// Sink errors are stored internally because observer methods have no
/// return value; check with [`take_error`][Self::take_error] after the run.
pub struct SinkObserver<S: TelemetrySink> {
    sink: S,
    error: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl<S: TelemetrySink> SinkObserver<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, error: None }
    }

    /// The first sink error, if any write failed.
    pub fn take_error(&mut self) -> Option<Box<dyn std::error::Error + Send + Sync>> {
        self.error.take()
    }

    /// Unwrap the inner sink (e.g. to inspect files after the run).
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn store(&mut self, result: SinkResult<()>) {
        if let Err(e) = result {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }
}

impl<S: TelemetrySink> SimObserver for SinkObserver<S> {
    fn on_step(&mut self, _sim_time: f64, output: &StepOutput) {
        if !output.frames.is_empty() {
            let result = self.sink.append(&output.frames);
            self.store(result);
        }
    }

    fn on_end(&mut self, _final_snapshot: &Snapshot) {
        let result = self.sink.finalize();
        self.store(result);
    }
}
