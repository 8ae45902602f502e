use thiserror::Error;

use crate::context::Interruption;

/// Boxed source error carried by collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{operation} failed for [{target}]: {source}")]
    Collaborator {
        operation: &'static str,
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Inconsistent organization hierarchy: {0}")]
    InconsistentHierarchy(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Wraps a collaborator failure with the failing operation and node id.
    pub fn collaborator(
        operation: &'static str,
        target: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        AppError::Collaborator {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }

    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::ValidationError(_) => 2,
            AppError::ConfigError(_) | AppError::UnsupportedConfiguration(_) => 4,
            AppError::Collaborator { .. } | AppError::InconsistentHierarchy(_) => 5,
            AppError::Cancelled => 130,
            AppError::DeadlineExceeded => 124,
            AppError::InternalError(_) => 1,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<Interruption> for AppError {
    fn from(interruption: Interruption) -> Self {
        match interruption {
            Interruption::Cancelled => AppError::Cancelled,
            Interruption::DeadlineExceeded => AppError::DeadlineExceeded,
        }
    }
}
