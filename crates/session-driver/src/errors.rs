//! Error types for session operations

use thiserror::Error;
use wizard_core_types::InteractionKind;

/// Failures a browsing session can report
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Browser could not be launched or a page could not be created
    #[error("Session acquisition failed: {0}")]
    SessionAcquisition(String),

    /// Page load failed
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// No element matched within the element wait
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Element exists but refused the interaction (disabled, no such option, ...)
    #[error("Interaction {kind} on {selector} rejected: {reason}")]
    InteractionRejected {
        selector: String,
        kind: InteractionKind,
        reason: String,
    },

    /// Network or browser process failure
    #[error("Session transport error: {0}")]
    Transport(String),
}

impl DriverError {
    pub fn not_found(selector: impl Into<String>) -> Self {
        DriverError::ElementNotFound {
            selector: selector.into(),
        }
    }

    pub fn rejected(
        selector: impl Into<String>,
        kind: InteractionKind,
        reason: impl Into<String>,
    ) -> Self {
        DriverError::InteractionRejected {
            selector: selector.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// Selector the failure is about, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            DriverError::ElementNotFound { selector }
            | DriverError::InteractionRejected { selector, .. } => Some(selector),
            _ => None,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Transport(err.to_string())
    }
}
