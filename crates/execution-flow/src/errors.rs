//! Step error types

use std::fmt;

use session_driver::DriverError;
use thiserror::Error;

/// Session operation a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Open,
    Navigate,
    Locate,
    Interact,
    Screenshot,
    ReadText,
    PageInfo,
    Close,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Open => "open",
            Op::Navigate => "navigate",
            Op::Locate => "locate",
            Op::Interact => "interact",
            Op::Screenshot => "screenshot",
            Op::ReadText => "read_text",
            Op::PageInfo => "page_info",
            Op::Close => "close",
        };
        f.write_str(name)
    }
}

/// Why a bounded session step did not produce a value
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("{op} timed out after {after_ms}ms")]
    TimedOut { op: Op, after_ms: u64 },

    #[error("run cancelled during {0}")]
    Cancelled(Op),

    #[error("run deadline exceeded during {0}")]
    DeadlineExceeded(Op),
}

impl StepError {
    /// The run itself was interrupted, as opposed to a single step failing
    pub fn is_interruption(&self) -> bool {
        matches!(self, StepError::Cancelled(_) | StepError::DeadlineExceeded(_))
    }
}
