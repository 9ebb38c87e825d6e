//! Errors surfaced by the engine facade
//!
//! Execution-time failures never show up here; they travel inside
//! [`execution_flow::ExecutionResult`]. These are the errors that prevent a
//! request from being attempted at all.

use std::path::PathBuf;

use thiserror::Error;
use wizard_core_types::RunId;
use wizard_registry::RegistryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("wizard '{0}' not found")]
    WizardNotFound(String),

    #[error("wizard '{0}' has no data contract")]
    ContractNotFound(String),

    #[error("run {0} is already in flight")]
    RunInProgress(RunId),

    /// Artifacts exist but could not be loaded
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) | RegistryError::InvalidId(id) => {
                ServiceError::WizardNotFound(id)
            }
            RegistryError::ContractNotFound(id) => ServiceError::ContractNotFound(id),
            other => ServiceError::Registry(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    Level(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to attach log files: {0}")]
    Reload(#[from] tracing_subscriber::reload::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
