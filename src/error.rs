//! Error type shared across the cascade driver.
//!
//! Every failure is terminal for the run that raised it: staged fitting
//! assumes each stage must succeed for the next one to be numerically
//! meaningful, so nothing here is retried or masked.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// A caller bug: an argument that can never be valid (e.g. an empty
    /// source set passed to activation).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced source name is absent from the model.
    #[error("source '{0}' not found in model")]
    NotFound(String),

    /// An optimizer strategy name outside the closed set.
    #[error("unsupported optimizer strategy '{0}' (use 'fast' or 'precise')")]
    UnsupportedStrategy(String),

    /// The backend optimizer failed to converge or hit a numerical error.
    #[error("optimizer failed: {0}")]
    BackendFit(String),

    /// Run configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CascadeError {
    /// Process exit code for the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            CascadeError::Config(_) => 2,
            CascadeError::InvalidArgument(_) | CascadeError::UnsupportedStrategy(_) => 3,
            CascadeError::NotFound(_) => 4,
            CascadeError::BackendFit(_) => 5,
            CascadeError::Io(_) | CascadeError::Serialize(_) => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, CascadeError>;
