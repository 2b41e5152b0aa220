//! The typed control surface.
//!
//! Operations are deposited into a multi-producer FIFO and applied by the
//! orchestrator at the next tick boundary — nothing outside the orchestrator
//! thread ever touches simulation state.  Each envelope carries a reply
//! channel; callers block on it, which is what makes `advance` a
//! synchronous test hook.

use std::sync::mpsc;

use thiserror::Error;

use bx_core::{BoothId, CarId, QueueId};

use crate::snapshot::SimStatus;

/// A mutation or query accepted from outside the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlRequest {
    /// Admit one car immediately, via the configured assignment policy.
    AddCar,
    /// Change a booth's service rate.  Applies from its next acceptance.
    UpdateBoothRate { booth: BoothId, rate: f64 },
    /// Add a booth to a queue at the default service rate.
    AddBooth { queue: QueueId },
    /// Change the wall-clock → sim-time ratio.
    SetTimeFactor { factor: f64 },
    /// Consume exactly `dt` seconds of sim time before replying.
    Advance { dt: f64 },
    /// Terminate the run at this tick boundary.
    Cancel,
}

/// Successful outcome of a control request.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlResponse {
    CarAdded {
        car: CarId,
        queue: QueueId,
    },
    BoothRateUpdated {
        booth: BoothId,
        rate: f64,
    },
    BoothAdded {
        booth: BoothId,
        queue: QueueId,
        rate: f64,
    },
    TimeFactorSet {
        factor: f64,
    },
    Advanced {
        dt: f64,
        completed: u64,
        sim_time: f64,
    },
    Cancelled,
}

/// Why a control request was refused.  The simulation continues unchanged.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ControlError {
    #[error("simulation is {0}, no further operations accepted")]
    Terminal(SimStatus),

    #[error("every queue is full")]
    AllQueuesFull,

    #[error("service node {0} not found")]
    BoothNotFound(BoothId),

    #[error("queue {0} not found")]
    QueueNotFound(QueueId),

    #[error("service rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("time factor must be positive, got {0}")]
    InvalidTimeFactor(f64),

    #[error("advance amount must be non-negative, got {0}")]
    InvalidAdvance(f64),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("orchestrator is gone")]
    Disconnected,
}

/// One request plus its reply channel, as carried by the FIFO.
pub(crate) struct ControlEnvelope {
    pub request: ControlRequest,
    pub reply: mpsc::Sender<Result<ControlResponse, ControlError>>,
}
