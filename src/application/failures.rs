use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerFailure {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("shift out of day bounds: {0}")]
    ShiftOutOfBounds(String),
    #[error("persistence failure: {0}")]
    Persistence(InfraError),
    #[error("invalid input: {0}")]
    Validation(String),
}

impl From<InfraError> for PlannerFailure {
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::NotFound(message) => Self::NotFound(message),
            other => Self::Persistence(other),
        }
    }
}
