//! Infrastructure error types

use rn_core::errors::DomainError;
use thiserror::Error;

/// Errors raised by the infrastructure layer
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<InfraError> for DomainError {
    fn from(err: InfraError) -> Self {
        DomainError::Persistence {
            message: err.to_string(),
        }
    }
}
