//! Wizard execution
//!
//! The controller drives a resolved plan through a browsing session page by
//! page; the aggregator turns what it collected into an [`ExecutionResult`].

pub mod aggregator;
pub mod bounded;
pub mod controller;
pub mod errors;
pub mod evidence;
pub mod types;

pub use controller::{ControllerState, ExecutionController, WizardExecutor};
pub use errors::{Op, StepError};
pub use types::{
    ControllerConfig, Evidence, EvidenceInclusion, EvidencePolicy, ExecutionFailure,
    ExecutionResult, FailureKind, OperationTimeouts, RunStatus,
};
