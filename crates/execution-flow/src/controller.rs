//! Execution controller
//!
//! Drives one resolved plan through one browsing session:
//! `Idle → SessionOpen → PageLoop(n) → Completed | Failed`.
//!
//! Interactions are never retried. The first failing step ends the run, a
//! best-effort snapshot is attached to the failure, and the session is closed
//! before the result is returned on every path that opened one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use field_resolver::{ResolvedAction, ResolvedPlan};
use session_driver::{BrowsingSession, DriverError, SessionDriver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wizard_core_types::RunId;

use crate::aggregator::{self, RunRecord};
use crate::bounded::{uninterruptible, RunGuard};
use crate::errors::{Op, StepError};
use crate::evidence::{failure_label, page_label, EvidenceRecorder};
use crate::types::{ControllerConfig, ExecutionFailure, ExecutionResult, FailureKind, OperationTimeouts};

const BODY_TEXT_LIMIT: usize = 2000;

/// Executes resolved wizard plans
#[async_trait]
pub trait WizardExecutor: Send + Sync {
    /// Run `plan` to a terminal state. Never panics on driver failure and
    /// always returns a result, including when `cancel` fires.
    async fn execute(
        &self,
        run_id: RunId,
        plan: &ResolvedPlan,
        cancel: CancellationToken,
    ) -> ExecutionResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    SessionOpen,
    PageLoop(u32),
    Completed,
    Failed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => f.write_str("idle"),
            ControllerState::SessionOpen => f.write_str("session-open"),
            ControllerState::PageLoop(page) => write!(f, "page-loop({page})"),
            ControllerState::Completed => f.write_str("completed"),
            ControllerState::Failed => f.write_str("failed"),
        }
    }
}

/// Where in the run a step failed; decides how failures are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Entry,
    Page,
    Outputs,
}

#[derive(Debug, Default)]
struct StepContext {
    page_number: Option<u32>,
    field_id: Option<String>,
    selector: Option<String>,
}

struct Run {
    record: RunRecord,
    state: ControllerState,
    guard: RunGuard,
    recorder: EvidenceRecorder,
}

impl Run {
    fn transition(&mut self, next: ControllerState) {
        debug!(
            run_id = %self.record.run_id,
            from = %self.state,
            to = %next,
            "controller transition"
        );
        self.state = next;
    }

    fn enter_page(&mut self, page_number: u32) {
        self.transition(ControllerState::PageLoop(page_number));
        self.record.furthest_page = page_number;
    }
}

/// Default executor over any [`SessionDriver`]
pub struct ExecutionController {
    driver: Arc<dyn SessionDriver>,
    config: ControllerConfig,
}

impl ExecutionController {
    pub fn new(driver: Arc<dyn SessionDriver>, config: ControllerConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn timeouts(&self) -> &OperationTimeouts {
        &self.config.timeouts
    }

    /// Navigate to the entry URL and perform the start action.
    async fn enter_wizard(
        &self,
        session: &mut dyn BrowsingSession,
        plan: &ResolvedPlan,
        run: &mut Run,
    ) -> Result<(), ExecutionFailure> {
        info!(run_id = %run.record.run_id, url = %plan.url, "navigating to wizard");
        let ctx = StepContext::default();
        run.guard
            .step(
                Op::Navigate,
                OperationTimeouts::ms(self.timeouts().navigation),
                session.navigate(&plan.url),
            )
            .await
            .map_err(|err| classify(Phase::Entry, err, ctx))?;

        if let Some(start) = &plan.start_action {
            self.apply(session, start, None, Phase::Entry, run).await?;
        }
        Ok(())
    }

    async fn apply(
        &self,
        session: &mut dyn BrowsingSession,
        action: &ResolvedAction,
        page_number: Option<u32>,
        phase: Phase,
        run: &Run,
    ) -> Result<(), ExecutionFailure> {
        debug!(
            run_id = %run.record.run_id,
            page = ?page_number,
            field_id = ?action.field_id,
            selector = %action.selector,
            kind = %action.interaction,
            "applying action"
        );
        let context = || StepContext {
            page_number,
            field_id: action.field_id.clone(),
            selector: Some(action.selector.clone()),
        };

        let element = run
            .guard
            .step(
                Op::Locate,
                OperationTimeouts::ms(self.timeouts().element),
                session.locate(&action.selector),
            )
            .await
            .map_err(|err| classify(phase, err, context()))?;

        run.guard
            .step(
                Op::Interact,
                OperationTimeouts::ms(self.timeouts().interaction),
                session.interact(&element, action.interaction, action.value.as_deref()),
            )
            .await
            .map_err(|err| classify(phase, err, context()))
    }

    async fn drive(
        &self,
        session: &mut dyn BrowsingSession,
        plan: &ResolvedPlan,
        run: &mut Run,
    ) -> Result<BTreeMap<String, String>, ExecutionFailure> {
        self.enter_wizard(session, plan, run).await?;

        for page in &plan.pages {
            let number = page.page_number;
            run.enter_page(number);

            for action in &page.actions {
                self.apply(session, action, Some(number), Phase::Page, run)
                    .await?;
            }

            let shot = run
                .guard
                .step(
                    Op::Screenshot,
                    OperationTimeouts::ms(self.timeouts().screenshot),
                    session.screenshot(),
                )
                .await
                .map_err(|err| {
                    classify(
                        Phase::Page,
                        err,
                        StepContext {
                            page_number: Some(number),
                            ..StepContext::default()
                        },
                    )
                })?;

            self.apply(session, &page.continue_action, Some(number), Phase::Page, run)
                .await?;

            // Page evidence only counts once the page was accepted.
            let evidence = run.recorder.record(&page_label(number), Some(number), shot).await;
            run.record.evidence.push(evidence);
            run.record.pages_completed += 1;
            info!(
                run_id = %run.record.run_id,
                page = number,
                actions = page.actions.len(),
                "page submitted"
            );
        }

        self.extract_outputs(session, plan, run).await
    }

    async fn extract_outputs(
        &self,
        session: &mut dyn BrowsingSession,
        plan: &ResolvedPlan,
        run: &Run,
    ) -> Result<BTreeMap<String, String>, ExecutionFailure> {
        let last_page = plan.last_page_number();
        let element_limit = OperationTimeouts::ms(self.timeouts().element);
        let mut outputs = BTreeMap::new();

        for output in &plan.outputs {
            let text = run
                .guard
                .step(Op::ReadText, element_limit, session.read_text(&output.selector))
                .await
                .map_err(|err| {
                    classify(
                        Phase::Outputs,
                        err,
                        StepContext {
                            page_number: last_page,
                            field_id: None,
                            selector: Some(output.selector.clone()),
                        },
                    )
                })?;
            outputs.insert(output.name.clone(), text);
        }

        let info = run
            .guard
            .step(
                Op::PageInfo,
                OperationTimeouts::ms(self.timeouts().screenshot),
                session.page_info(),
            )
            .await
            .map_err(|err| {
                classify(
                    Phase::Outputs,
                    err,
                    StepContext {
                        page_number: last_page,
                        ..StepContext::default()
                    },
                )
            })?;
        outputs.entry("page_url".to_string()).or_insert(info.url);
        outputs.entry("page_title".to_string()).or_insert(info.title);

        if plan.outputs.is_empty() {
            match run
                .guard
                .step(Op::ReadText, element_limit, session.read_text("body"))
                .await
            {
                Ok(body) => {
                    outputs.insert(
                        "body_text".to_string(),
                        body.chars().take(BODY_TEXT_LIMIT).collect(),
                    );
                }
                Err(err) if err.is_interruption() => {
                    return Err(classify(
                        Phase::Outputs,
                        err,
                        StepContext {
                            page_number: last_page,
                            ..StepContext::default()
                        },
                    ))
                }
                Err(err) => warn!(run_id = %run.record.run_id, "could not read page body: {err}"),
            }
        }

        Ok(outputs)
    }

    async fn failure_snapshot(
        &self,
        session: &mut dyn BrowsingSession,
        run: &Run,
        page_number: Option<u32>,
    ) -> Option<crate::types::Evidence> {
        if run.guard.is_interrupted() {
            return None;
        }
        match run
            .guard
            .step(
                Op::Screenshot,
                OperationTimeouts::ms(self.timeouts().screenshot),
                session.screenshot(),
            )
            .await
        {
            Ok(bytes) => Some(
                run.recorder
                    .record(&failure_label(page_number), page_number, bytes)
                    .await,
            ),
            Err(err) => {
                debug!(run_id = %run.record.run_id, "failure snapshot unavailable: {err}");
                None
            }
        }
    }

    fn finish(
        &self,
        run: Run,
        outcome: Result<BTreeMap<String, String>, ExecutionFailure>,
    ) -> ExecutionResult {
        let result = aggregator::assemble(
            run.record,
            outcome,
            self.config.evidence.include_in_result,
        );
        match &result.error {
            None => info!(
                run_id = %result.run_id,
                wizard_id = %result.wizard_id,
                pages = result.pages_completed,
                elapsed_ms = result.elapsed_ms,
                "wizard run completed"
            ),
            Some(failure) => warn!(
                run_id = %result.run_id,
                wizard_id = %result.wizard_id,
                kind = ?failure.kind,
                page = ?failure.page_number,
                field_id = ?failure.field_id,
                selector = ?failure.selector,
                furthest_page = result.furthest_page,
                "wizard run did not complete: {}",
                failure.message
            ),
        }
        result
    }
}

#[async_trait]
impl WizardExecutor for ExecutionController {
    async fn execute(
        &self,
        run_id: RunId,
        plan: &ResolvedPlan,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let timeouts = self.timeouts().clone();
        let mut run = Run {
            record: RunRecord::new(run_id.clone(), plan.wizard_id.clone()),
            state: ControllerState::Idle,
            guard: RunGuard::new(cancel, OperationTimeouts::ms(timeouts.run)),
            recorder: EvidenceRecorder::new(run_id.clone(), &self.config.evidence),
        };
        info!(
            run_id = %run_id,
            wizard_id = %plan.wizard_id,
            pages = plan.page_count(),
            actions = plan.action_count(),
            "starting wizard run"
        );

        let opened = run
            .guard
            .step(
                Op::Open,
                OperationTimeouts::ms(timeouts.session_open),
                self.driver.open(&self.config.session),
            )
            .await;
        let mut session = match opened {
            Ok(session) => session,
            Err(err) => {
                run.transition(ControllerState::Failed);
                let failure = classify(Phase::Open, err, StepContext::default());
                return self.finish(run, Err(failure));
            }
        };
        run.record.session_opened = Some(Instant::now());
        run.transition(ControllerState::SessionOpen);

        let mut outcome = self.drive(session.as_mut(), plan, &mut run).await;

        if let Err(failure) = &mut outcome {
            failure.snapshot = self
                .failure_snapshot(session.as_mut(), &run, failure.page_number)
                .await;
        }

        match uninterruptible(
            Op::Close,
            OperationTimeouts::ms(timeouts.close),
            session.close(),
        )
        .await
        {
            Ok(()) => debug!(run_id = %run_id, "session closed"),
            Err(err) => warn!(run_id = %run_id, "session close failed: {err}"),
        }

        run.transition(match outcome {
            Ok(_) => ControllerState::Completed,
            Err(_) => ControllerState::Failed,
        });
        self.finish(run, outcome)
    }
}

fn classify(phase: Phase, err: StepError, ctx: StepContext) -> ExecutionFailure {
    let kind = match &err {
        StepError::Cancelled(_) => FailureKind::Cancelled,
        StepError::DeadlineExceeded(_) => FailureKind::DeadlineExceeded,
        _ if phase == Phase::Open => FailureKind::SessionAcquisitionError,
        _ if phase == Phase::Entry => FailureKind::NavigationError,
        StepError::Driver(driver) => driver_kind(driver),
        StepError::TimedOut { op, .. } => timeout_kind(*op),
    };
    let selector = ctx.selector.or_else(|| match &err {
        StepError::Driver(driver) => driver.selector().map(str::to_string),
        _ => None,
    });
    ExecutionFailure::new(kind, err.to_string())
        .on_page(ctx.page_number)
        .with_field(ctx.field_id)
        .with_selector(selector)
}

fn driver_kind(err: &DriverError) -> FailureKind {
    match err {
        DriverError::SessionAcquisition(_) => FailureKind::SessionAcquisitionError,
        DriverError::Navigation { .. } => FailureKind::NavigationError,
        DriverError::ElementNotFound { .. } => FailureKind::ElementNotFound,
        DriverError::InteractionRejected { .. } => FailureKind::InteractionRejected,
        DriverError::Transport(_) => FailureKind::SessionTransportError,
    }
}

fn timeout_kind(op: Op) -> FailureKind {
    match op {
        Op::Open => FailureKind::SessionAcquisitionError,
        Op::Navigate => FailureKind::NavigationError,
        Op::Locate | Op::ReadText => FailureKind::ElementNotFound,
        Op::Interact => FailureKind::InteractionRejected,
        Op::Screenshot | Op::PageInfo | Op::Close => FailureKind::SessionTransportError,
    }
}
