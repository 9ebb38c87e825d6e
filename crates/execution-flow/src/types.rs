//! Result and configuration types for wizard runs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use contract_validator::Violation;
use field_resolver::DriftFault;
use serde::{Deserialize, Serialize};
use session_driver::SessionConfig;
use wizard_core_types::RunId;

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every page submitted and outputs extracted
    Completed,
    /// Execution started and stopped on a failure
    Failed,
    /// Caller cancelled the run
    Cancelled,
    /// Refused before any session was opened
    Rejected,
}

/// Machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    ContractViolation,
    StructureDriftFault,
    SessionAcquisitionError,
    NavigationError,
    ElementNotFound,
    InteractionRejected,
    SessionTransportError,
    Cancelled,
    DeadlineExceeded,
}

impl FailureKind {
    /// Whether the caller can fix this by resubmitting corrected data
    pub fn is_caller_recoverable(self) -> bool {
        matches!(self, FailureKind::ContractViolation)
    }
}

/// One captured screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub captured_at: DateTime<Utc>,
    pub byte_len: usize,
    /// JPEG, base64 encoded
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
}

/// Structured failure carried by a failed, cancelled or rejected result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Best-effort screenshot taken when the failure happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Evidence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drift_faults: Vec<DriftFault>,
}

impl ExecutionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            page_number: None,
            field_id: None,
            selector: None,
            snapshot: None,
            violations: Vec::new(),
            drift_faults: Vec::new(),
        }
    }

    pub fn on_page(mut self, page_number: Option<u32>) -> Self {
        self.page_number = page_number;
        self
    }

    pub fn with_field(mut self, field_id: Option<String>) -> Self {
        self.field_id = field_id;
        self
    }

    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector;
        self
    }
}

/// Outcome of one wizard execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: RunId,
    pub wizard_id: String,
    pub success: bool,
    pub status: RunStatus,
    /// Values read from the final page, empty unless completed
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// Page evidence in page order
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    /// Pages whose continue action succeeded
    pub pages_completed: u32,
    /// Last page the run entered, 0 if none
    pub furthest_page: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionFailure>,
}

impl ExecutionResult {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|failure| failure.kind)
    }
}

/// Per-operation bounds in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationTimeouts {
    pub session_open: u64,
    pub navigation: u64,
    pub element: u64,
    pub interaction: u64,
    pub screenshot: u64,
    pub close: u64,
    /// Whole run
    pub run: u64,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            session_open: 30_000,
            navigation: 30_000,
            element: 10_000,
            interaction: 10_000,
            screenshot: 10_000,
            close: 5_000,
            run: 60_000,
        }
    }
}

impl OperationTimeouts {
    pub fn all(ms: u64) -> Self {
        Self {
            session_open: ms,
            navigation: ms,
            element: ms,
            interaction: ms,
            screenshot: ms,
            close: ms,
            run: ms,
        }
    }

    pub fn with_run(mut self, ms: u64) -> Self {
        self.run = ms;
        self
    }

    /// Names of bounds set to zero
    pub fn zero_bounds(&self) -> Vec<&'static str> {
        [
            ("session_open", self.session_open),
            ("navigation", self.navigation),
            ("element", self.element),
            ("interaction", self.interaction),
            ("screenshot", self.screenshot),
            ("close", self.close),
            ("run", self.run),
        ]
        .into_iter()
        .filter(|(_, ms)| *ms == 0)
        .map(|(name, _)| name)
        .collect()
    }

    pub(crate) fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// Which committed page evidence ends up in the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceInclusion {
    #[default]
    All,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidencePolicy {
    pub jpeg_quality: u8,
    pub save_dir: Option<PathBuf>,
    pub include_in_result: EvidenceInclusion,
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            save_dir: None,
            include_in_result: EvidenceInclusion::All,
        }
    }
}

/// Everything the controller needs besides the plan
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    pub session: SessionConfig,
    pub timeouts: OperationTimeouts,
    pub evidence: EvidencePolicy,
}

impl ControllerConfig {
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidencePolicy) -> Self {
        self.evidence = evidence;
        self
    }
}
