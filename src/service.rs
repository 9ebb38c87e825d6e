//! Engine facade
//!
//! `WizardService` is the public call surface: list wizards, describe one,
//! dry-run a request, and execute it. Every request is checked against the
//! contract and resolved into a concrete plan before a session is opened.

use std::sync::Arc;

use contract_validator::ContractValidator;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use execution_flow::aggregator;
use execution_flow::{ExecutionController, ExecutionFailure, ExecutionResult, WizardExecutor};
use field_resolver::{resolve, ResolveError, ResolvedPlan};
use serde::{Deserialize, Serialize};
use session_driver::{ChromiumDriver, SessionDriver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wizard_core_types::{DataContract, RunId, UserData, WizardStructure};
use wizard_registry::{FsCatalog, WizardCatalog, WizardInfo, WizardSummary};

use crate::config::RunnerConfig;
use crate::errors::{ServiceError, ServiceResult};

/// Planned work for one page of a checked request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPage {
    pub page_number: u32,
    pub page_title: String,
    /// Field actions, excluding the continue action
    pub actions: usize,
}

/// Outcome of a dry run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCheck {
    pub wizard_id: String,
    pub ready: bool,
    #[serde(default)]
    pub pages: Vec<PlannedPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionFailure>,
}

pub struct WizardService {
    catalog: Arc<dyn WizardCatalog>,
    executor: Arc<dyn WizardExecutor>,
    in_flight: DashMap<RunId, CancellationToken>,
}

/// Removes a run from the in-flight table however the run ends
struct InFlight<'a> {
    table: &'a DashMap<RunId, CancellationToken>,
    run_id: RunId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.run_id);
    }
}

/// Either a plan ready to execute or the rejection that replaces it
enum Prepared {
    Plan(ResolvedPlan),
    Rejected(ExecutionFailure),
}

impl WizardService {
    pub fn new(catalog: Arc<dyn WizardCatalog>, executor: Arc<dyn WizardExecutor>) -> Self {
        Self {
            catalog,
            executor,
            in_flight: DashMap::new(),
        }
    }

    /// Service over `config.wizards_dir` driving sessions through `driver`
    pub fn with_driver(config: &RunnerConfig, driver: Arc<dyn SessionDriver>) -> Self {
        let catalog = Arc::new(FsCatalog::new(config.wizards_dir.clone()));
        let controller = ExecutionController::new(driver, config.controller_config());
        Self::new(catalog, Arc::new(controller))
    }

    /// Production wiring: filesystem catalog and Chromium sessions
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::with_driver(config, Arc::new(ChromiumDriver::new()))
    }

    pub async fn list_wizards(&self) -> Vec<WizardSummary> {
        self.catalog.list().await
    }

    pub async fn get_wizard_info(&self, wizard_id: &str) -> ServiceResult<WizardInfo> {
        Ok(self.catalog.info(wizard_id).await?)
    }

    /// Validate and resolve without opening a session.
    pub async fn validate_request(
        &self,
        wizard_id: &str,
        user_data: &UserData,
    ) -> ServiceResult<RequestCheck> {
        let (structure, contract) = self.artifacts(wizard_id).await?;
        let check = match prepare(&structure, &contract, user_data) {
            Prepared::Plan(plan) => RequestCheck {
                wizard_id: wizard_id.to_string(),
                ready: true,
                pages: plan
                    .pages
                    .iter()
                    .map(|page| PlannedPage {
                        page_number: page.page_number,
                        page_title: page.page_title.clone(),
                        actions: page.actions.len(),
                    })
                    .collect(),
                error: None,
            },
            Prepared::Rejected(failure) => RequestCheck {
                wizard_id: wizard_id.to_string(),
                ready: false,
                pages: Vec::new(),
                error: Some(failure),
            },
        };
        debug!(wizard_id, ready = check.ready, "checked request");
        Ok(check)
    }

    pub async fn execute_wizard(
        &self,
        wizard_id: &str,
        user_data: &UserData,
    ) -> ServiceResult<ExecutionResult> {
        self.execute_wizard_with_cancel(wizard_id, user_data, CancellationToken::new())
            .await
    }

    pub async fn execute_wizard_with_cancel(
        &self,
        wizard_id: &str,
        user_data: &UserData,
        cancel: CancellationToken,
    ) -> ServiceResult<ExecutionResult> {
        self.execute_wizard_as(RunId::new(), wizard_id, user_data, cancel)
            .await
    }

    /// Execute under a caller-chosen run id, so another task can
    /// [`cancel`](Self::cancel) it while it is in flight. An id that is
    /// already in flight is refused with [`ServiceError::RunInProgress`].
    pub async fn execute_wizard_as(
        &self,
        run_id: RunId,
        wizard_id: &str,
        user_data: &UserData,
        cancel: CancellationToken,
    ) -> ServiceResult<ExecutionResult> {
        let (structure, contract) = self.artifacts(wizard_id).await?;

        let plan = match prepare(&structure, &contract, user_data) {
            Prepared::Plan(plan) => plan,
            Prepared::Rejected(failure) => {
                warn!(
                    run_id = %run_id,
                    wizard_id,
                    kind = ?failure.kind,
                    "request rejected before execution: {}",
                    failure.message
                );
                return Ok(aggregator::rejected(run_id, wizard_id, failure));
            }
        };

        let token = cancel.child_token();
        match self.in_flight.entry(run_id.clone()) {
            Entry::Occupied(_) => return Err(ServiceError::RunInProgress(run_id)),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }
        let _tracked = InFlight {
            table: &self.in_flight,
            run_id: run_id.clone(),
        };

        info!(
            run_id = %run_id,
            wizard_id,
            fields = user_data.len(),
            "executing wizard"
        );
        let result = self.executor.execute(run_id, &plan, token).await;
        info!(
            run_id = %result.run_id,
            wizard_id,
            status = ?result.status,
            pages_completed = result.pages_completed,
            elapsed_ms = result.elapsed_ms,
            "wizard run finished"
        );
        Ok(result)
    }

    /// Cancel an in-flight run. Returns `false` if no such run is active.
    pub fn cancel(&self, run_id: &RunId) -> bool {
        match self.in_flight.get(run_id) {
            Some(entry) => {
                info!(run_id = %run_id, "cancelling run");
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> Vec<RunId> {
        self.in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    async fn artifacts(&self, wizard_id: &str) -> ServiceResult<(WizardStructure, DataContract)> {
        let structure = self.catalog.structure(wizard_id).await?;
        let contract = self.catalog.contract(wizard_id).await?;
        Ok((structure, contract))
    }
}

fn prepare(structure: &WizardStructure, contract: &DataContract, user_data: &UserData) -> Prepared {
    let outcome = ContractValidator::new(contract).validate(user_data);
    if !outcome.is_valid() {
        return Prepared::Rejected(aggregator::contract_violation(
            outcome.violations().to_vec(),
        ));
    }

    match resolve(structure, contract, user_data) {
        Ok(plan) => Prepared::Plan(plan),
        Err(ResolveError::Drift { faults, .. }) => {
            Prepared::Rejected(aggregator::structure_drift(faults))
        }
    }
}
