// Errors surfaced by application services
use crate::domain::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request rejected by the core (bad period, range or input).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The reading store could not be queried.
    #[error("repository error: {0:#}")]
    Repository(#[from] anyhow::Error),
}
