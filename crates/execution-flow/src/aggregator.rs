//! Result assembly
//!
//! Pure transformation of the controller's final run record into an
//! [`ExecutionResult`]. Nothing here talks to a session.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use contract_validator::Violation;
use field_resolver::DriftFault;
use wizard_core_types::RunId;

use crate::types::{
    Evidence, EvidenceInclusion, ExecutionFailure, ExecutionResult, FailureKind, RunStatus,
};

/// What the controller accumulated during one run
#[derive(Debug)]
pub struct RunRecord {
    pub run_id: RunId,
    pub wizard_id: String,
    pub started_at: DateTime<Utc>,
    pub requested: Instant,
    /// Set once the session is open; elapsed time is measured from here
    pub session_opened: Option<Instant>,
    /// Committed page evidence, in page order
    pub evidence: Vec<Evidence>,
    pub pages_completed: u32,
    pub furthest_page: u32,
}

impl RunRecord {
    pub fn new(run_id: RunId, wizard_id: impl Into<String>) -> Self {
        Self {
            run_id,
            wizard_id: wizard_id.into(),
            started_at: Utc::now(),
            requested: Instant::now(),
            session_opened: None,
            evidence: Vec::new(),
            pages_completed: 0,
            furthest_page: 0,
        }
    }
}

pub fn assemble(
    record: RunRecord,
    outcome: Result<BTreeMap<String, String>, ExecutionFailure>,
    inclusion: EvidenceInclusion,
) -> ExecutionResult {
    let elapsed = record
        .session_opened
        .map(|opened| opened.elapsed())
        .unwrap_or_else(|| record.requested.elapsed());

    let mut evidence = record.evidence;
    if inclusion == EvidenceInclusion::Last && evidence.len() > 1 {
        evidence = evidence.split_off(evidence.len() - 1);
    }

    let (status, outputs, error) = match outcome {
        Ok(outputs) => (RunStatus::Completed, outputs, None),
        Err(failure) => (status_for(failure.kind), BTreeMap::new(), Some(failure)),
    };

    ExecutionResult {
        run_id: record.run_id,
        wizard_id: record.wizard_id,
        success: status == RunStatus::Completed,
        status,
        outputs,
        evidence,
        pages_completed: record.pages_completed,
        furthest_page: record.furthest_page,
        started_at: record.started_at,
        finished_at: Utc::now(),
        elapsed_ms: elapsed.as_millis() as u64,
        error,
    }
}

/// Result for a request refused before any session was opened
pub fn rejected(run_id: RunId, wizard_id: impl Into<String>, failure: ExecutionFailure) -> ExecutionResult {
    assemble(
        RunRecord::new(run_id, wizard_id),
        Err(failure),
        EvidenceInclusion::All,
    )
}

pub fn contract_violation(violations: Vec<Violation>) -> ExecutionFailure {
    let fields: Vec<&str> = violations.iter().map(Violation::field).collect();
    let mut failure = ExecutionFailure::new(
        FailureKind::ContractViolation,
        format!("user data violates the contract: {}", fields.join(", ")),
    );
    failure.violations = violations;
    failure
}

pub fn structure_drift(faults: Vec<DriftFault>) -> ExecutionFailure {
    let mut failure = ExecutionFailure::new(
        FailureKind::StructureDriftFault,
        format!("wizard structure and contract disagree ({} fault(s))", faults.len()),
    );
    if let [only] = faults.as_slice() {
        failure.page_number = Some(only.page_number());
        failure.field_id = Some(only.field_id().to_string());
    }
    failure.drift_faults = faults;
    failure
}

fn status_for(kind: FailureKind) -> RunStatus {
    match kind {
        FailureKind::ContractViolation | FailureKind::StructureDriftFault => RunStatus::Rejected,
        FailureKind::Cancelled => RunStatus::Cancelled,
        _ => RunStatus::Failed,
    }
}
