//! Wizard runner
//!
//! Contract-first execution of multi-page web wizards. Callers supply
//! `user_data` that satisfies a wizard's data contract; the engine resolves it
//! against the wizard structure and drives a browsing session page by page.

pub mod config;
pub mod errors;
pub mod logging;
pub mod service;

pub use config::{LoggingConfig, RunnerConfig, SessionSettings};
pub use errors::{ConfigError, LoggingError, ServiceError, ServiceResult};
pub use logging::{init_logging, LogFormat, LogHandle};
pub use service::{PlannedPage, RequestCheck, WizardService};

pub use execution_flow::{ExecutionResult, FailureKind, RunStatus};
pub use wizard_core_types::{RunId, UserData};
pub use wizard_registry::{WizardInfo, WizardSummary};
