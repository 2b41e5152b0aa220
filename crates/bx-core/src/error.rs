//! Shared error type.
//!
//! Sub-crates define their own error enums and convert `CoreError` into them
//! via `#[from]`, or wrap it as one variant.  Both patterns appear; prefer
//! whichever keeps error sites clean.

use thiserror::Error;

use crate::{BoothId, CarId, QueueId};

/// The base error type for `bx-core` and common cases across `bx-*` crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("car {0} not found")]
    CarNotFound(CarId),

    #[error("queue {0} not found")]
    QueueNotFound(QueueId),

    #[error("service node {0} not found")]
    BoothNotFound(BoothId),
}

/// Shorthand result type for `bx-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
