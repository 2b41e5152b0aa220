use thiserror::Error;

use bx_core::CoreError;
use bx_model::ModelError;
use bx_path::PathError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("telemetry sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("orchestrator thread is gone")]
    RunnerGone,
}

pub type SimResult<T> = Result<T, SimError>;
