use thiserror::Error;

use bx_core::{BoothId, CarId};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("service rate must be positive, got {0}")]
    InvalidServiceRate(f64),

    #[error("booth {0} is already serving a car")]
    BoothBusy(BoothId),

    #[error("car {car} is {status}, cannot transition to {wanted}")]
    BadStatusTransition {
        car: CarId,
        status: &'static str,
        wanted: &'static str,
    },
}

pub type ModelResult<T> = Result<T, ModelError>;
