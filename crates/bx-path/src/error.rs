use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("a waitline needs at least two distinct points, got {0}")]
    TooFewPoints(usize),

    #[error("waitline has zero total length")]
    ZeroLength,
}

pub type PathResult<T> = Result<T, PathError>;
