//! `bx-sim` — the simulation orchestrator.
//!
//! # Architecture
//!
//! ```text
//!  control surface (any thread)          orchestrator thread            subscribers
//!  ───────────────────────────          ───────────────────────        ────────────
//!  SimHandle::add_car() ─┐              ┌─────────────────────┐
//!  SimHandle::cancel()  ─┼─ mpsc FIFO ─▶│  Runner              │
//!  SimHandle::advance() ─┘              │   ├ drain control    │
//!                                       │   ├ Engine::step     │──▶ TelemetrySink (CSV)
//!                                       │   └ publish snapshot │──▶ SnapshotBus ──▶ rx, rx, …
//!                                       └─────────────────────┘
//! ```
//!
//! [`Engine`] is the single-threaded core: it owns every car, queue, booth,
//! the RNG, and the clock, and is fully deterministic under a fixed seed
//! when stepped with fixed slices (batch mode).  [`Runner`] wraps it in a
//! wall-clock thread with a control FIFO and the snapshot broadcast plane.
//!
//! | Module       | Contents                                              |
//! |--------------|-------------------------------------------------------|
//! | [`engine`]   | The tick loop core and batch driver                   |
//! | [`runner`]   | Orchestrator thread, `SimHandle`                      |
//! | [`control`]  | Typed control operations and their errors             |
//! | [`snapshot`] | Snapshot views and the subscriber bus                 |
//! | [`stats`]    | Incremental run statistics                            |
//! | [`observer`] | `SimObserver` and `TelemetrySink` traits              |
//! | [`builder`]  | Validating constructor                                |

pub mod builder;
pub mod control;
pub mod engine;
pub mod error;
pub mod observer;
pub mod runner;
pub mod snapshot;
pub mod stats;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use control::{ControlError, ControlRequest, ControlResponse};
pub use engine::{Engine, StepOutput};
pub use error::{SimError, SimResult};
pub use observer::{
    NoopObserver, NoopSink, SimObserver, SinkObserver, SinkResult, TelemetrySink, VecSink,
};
pub use runner::{AdvanceReport, Runner, RunnerConfig, SimHandle};
pub use snapshot::{
    BoothView, CarView, PublishPolicy, QueueView, SimStatus, Snapshot, SnapshotBus,
    SnapshotReceiver,
};
pub use stats::SimStats;
