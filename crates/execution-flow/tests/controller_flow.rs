use std::sync::Arc;
use std::time::Duration;

use execution_flow::{
    ControllerConfig, EvidenceInclusion, EvidencePolicy, ExecutionController, FailureKind,
    OperationTimeouts, RunStatus, WizardExecutor,
};
use field_resolver::{resolve, ResolvedPlan};
use serde_json::json;
use session_driver::{DriverCall, DriverError, DriverOp, ScriptedDriver};
use tokio_util::sync::CancellationToken;
use wizard_core_types::{DataContract, InteractionKind, RunId, WizardStructure};

fn plan(with_outputs: bool) -> ResolvedPlan {
    let mut doc = json!({
        "wizard_id": "fsa-estimator",
        "name": "FSA Student Aid Estimator",
        "url": "https://studentaid.example/estimator",
        "start_action": { "selector": "text=Start Estimate" },
        "pages": [
            {
                "page_number": 1,
                "page_title": "Student",
                "fields": [
                    {
                        "field_id": "birth_year",
                        "selector": "#year",
                        "interaction_kind": "fill",
                        "required": true
                    },
                    {
                        "field_id": "marital_status",
                        "selector": "input[name=marital]",
                        "interaction_kind": "script-click",
                        "value_kind": "single-choice",
                        "choice_set": [
                            { "value": "unmarried", "selector": "#unmarried" },
                            { "value": "married", "selector": "#married" }
                        ]
                    }
                ],
                "continue_action": { "selector": "#next" }
            },
            {
                "page_number": 2,
                "page_title": "Residence",
                "fields": [
                    {
                        "field_id": "state",
                        "selector": "#state",
                        "interaction_kind": "fill-then-submit",
                        "required": true
                    }
                ],
                "continue_action": { "selector": "#finish" }
            }
        ]
    });
    if with_outputs {
        doc["outputs"] = json!([{ "name": "award", "selector": "#award" }]);
    }
    let structure = WizardStructure::from_json(&doc.to_string()).unwrap();
    let contract = DataContract::from_json(
        &json!({
            "type": "object",
            "required": ["birth_year", "state"],
            "properties": {
                "birth_year": { "type": "string", "pattern": "^[12][0-9]{3}$" },
                "marital_status": { "type": "string", "enum": ["unmarried", "married"] },
                "state": { "type": "string" }
            }
        })
        .to_string(),
    )
    .unwrap();
    let data = json!({"birth_year": "2007", "marital_status": "unmarried", "state": "IL"});
    resolve(&structure, &contract, data.as_object().unwrap()).unwrap()
}

fn fast_config() -> ControllerConfig {
    ControllerConfig::default().with_timeouts(OperationTimeouts::all(2_000).with_run(10_000))
}

fn controller(driver: &ScriptedDriver, config: ControllerConfig) -> ExecutionController {
    ExecutionController::new(Arc::new(driver.clone()), config)
}

async fn run(driver: &ScriptedDriver, config: ControllerConfig, with_outputs: bool) -> execution_flow::ExecutionResult {
    controller(driver, config)
        .execute(RunId::new(), &plan(with_outputs), CancellationToken::new())
        .await
}

#[tokio::test]
async fn completes_every_page_in_declared_order() {
    let driver = ScriptedDriver::new()
        .with_text("#award", "$7,395")
        .with_title("Your Estimate");
    let result = run(&driver, fast_config(), true).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.pages_completed, 2);
    assert_eq!(result.furthest_page, 2);
    assert_eq!(result.outputs["award"], "$7,395");
    assert_eq!(result.outputs["page_title"], "Your Estimate");
    assert_eq!(result.outputs["page_url"], "https://studentaid.example/estimator");
    assert!(!result.outputs.contains_key("body_text"));

    let labels: Vec<_> = result.evidence.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["page-1", "page-2"]);

    assert_eq!(
        driver.interactions(),
        vec![
            ("text=Start Estimate".to_string(), InteractionKind::Click, None),
            ("#year".to_string(), InteractionKind::Fill, Some("2007".to_string())),
            ("#unmarried".to_string(), InteractionKind::ScriptClick, None),
            ("#next".to_string(), InteractionKind::Click, None),
            ("#state".to_string(), InteractionKind::FillThenSubmit, Some("IL".to_string())),
            ("#finish".to_string(), InteractionKind::Click, None),
        ]
    );
    assert_eq!(
        driver.calls().first(),
        Some(&DriverCall::Open {
            headless: true,
            engine_profile: Default::default()
        })
    );
    assert_eq!(driver.close_count(), 1);
    assert_eq!(driver.leaked_count(), 0);
}

#[tokio::test]
async fn failed_continue_on_last_page_keeps_only_earlier_evidence() {
    let driver = ScriptedDriver::new().fail_on(
        DriverOp::Interact,
        Some("#finish"),
        DriverError::rejected("#finish", InteractionKind::Click, "element is disabled"),
    );
    let result = run(&driver, fast_config(), true).await;

    assert!(!result.success);
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.furthest_page, 2);
    assert_eq!(result.pages_completed, 1);

    let pages: Vec<_> = result.evidence.iter().map(|e| e.page_number).collect();
    assert_eq!(pages, vec![Some(1)]);

    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::InteractionRejected);
    assert_eq!(failure.page_number, Some(2));
    assert_eq!(failure.selector.as_deref(), Some("#finish"));
    let snapshot = failure.snapshot.unwrap();
    assert_eq!(snapshot.label, "failure-page-2");

    assert!(result.outputs.is_empty());
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn missing_field_aborts_the_run_on_its_page() {
    let driver = ScriptedDriver::new().without_element("#year");
    let result = run(&driver, fast_config(), true).await;

    let failure = result.error.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::ElementNotFound);
    assert_eq!(failure.page_number, Some(1));
    assert_eq!(failure.field_id.as_deref(), Some("birth_year"));
    assert_eq!(result.furthest_page, 1);
    assert!(result.evidence.is_empty());

    // Nothing after the failing field was attempted.
    assert!(driver
        .interactions()
        .iter()
        .all(|(selector, _, _)| selector == "text=Start Estimate"));
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn session_acquisition_failure_opens_nothing() {
    let driver = ScriptedDriver::new().fail_on(
        DriverOp::Open,
        None,
        DriverError::SessionAcquisition("chromium not installed".into()),
    );
    let result = run(&driver, fast_config(), true).await;

    assert_eq!(result.failure_kind(), Some(FailureKind::SessionAcquisitionError));
    assert_eq!(result.furthest_page, 0);
    assert_eq!(driver.open_count(), 0);
    assert_eq!(driver.close_count(), 0);
    assert_eq!(driver.calls().len(), 1);
}

#[tokio::test]
async fn navigation_failure_closes_session_and_keeps_snapshot() {
    let driver = ScriptedDriver::new().fail_on(
        DriverOp::Navigate,
        None,
        DriverError::Navigation {
            url: "https://studentaid.example/estimator".into(),
            reason: "net::ERR_NAME_NOT_RESOLVED".into(),
        },
    );
    let result = run(&driver, fast_config(), true).await;

    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::NavigationError);
    assert_eq!(failure.snapshot.map(|s| s.label), Some("failure-start".to_string()));
    assert_eq!(result.furthest_page, 0);
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn missing_start_action_target_is_a_navigation_error() {
    let driver = ScriptedDriver::new().without_element("text=Start Estimate");
    let result = run(&driver, fast_config(), true).await;
    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::NavigationError);
    assert_eq!(failure.selector.as_deref(), Some("text=Start Estimate"));
}

#[tokio::test]
async fn hanging_locate_is_bounded_by_element_timeout() {
    let driver = ScriptedDriver::new().hang_on(DriverOp::Locate, Some("#state"));
    let mut timeouts = OperationTimeouts::all(2_000).with_run(10_000);
    timeouts.element = 100;
    let result = run(&driver, ControllerConfig::default().with_timeouts(timeouts), true).await;

    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::ElementNotFound);
    assert!(failure.message.contains("timed out"));
    assert_eq!(failure.page_number, Some(2));
    assert_eq!(result.pages_completed, 1);
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn cancellation_unblocks_and_closes_before_returning() {
    let driver = ScriptedDriver::new().hang_on(DriverOp::Interact, Some("#state"));
    let controller = controller(&driver, fast_config());
    let token = CancellationToken::new();
    let plan = plan(true);

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
    };
    let result = controller.execute(RunId::new(), &plan, token).await;
    canceller.await.unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
    assert!(result.error.as_ref().unwrap().snapshot.is_none());
    assert_eq!(result.furthest_page, 2);
    assert_eq!(driver.close_count(), 1);
    assert_eq!(driver.leaked_count(), 0);
}

#[tokio::test]
async fn cancelled_before_start_never_opens_a_session() {
    let driver = ScriptedDriver::new();
    let token = CancellationToken::new();
    token.cancel();
    let result = controller(&driver, fast_config())
        .execute(RunId::new(), &plan(true), token)
        .await;
    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(driver.open_count(), 0);
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn run_deadline_stops_a_hung_run() {
    let driver = ScriptedDriver::new().hang_on(DriverOp::Navigate, None);
    let timeouts = OperationTimeouts::all(5_000).with_run(150);
    let result = run(&driver, ControllerConfig::default().with_timeouts(timeouts), true).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.failure_kind(), Some(FailureKind::DeadlineExceeded));
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn hanging_close_does_not_hang_the_run() {
    let driver = ScriptedDriver::new()
        .with_text("#award", "$0")
        .hang_on(DriverOp::Close, None);
    let mut timeouts = OperationTimeouts::all(2_000).with_run(10_000);
    timeouts.close = 50;
    let result = run(&driver, ControllerConfig::default().with_timeouts(timeouts), true).await;

    assert!(result.success);
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn missing_declared_output_fails_on_final_page() {
    let driver = ScriptedDriver::new().without_element("#award");
    let result = run(&driver, fast_config(), true).await;

    assert!(!result.success);
    let failure = result.error.unwrap();
    assert_eq!(failure.kind, FailureKind::ElementNotFound);
    assert_eq!(failure.page_number, Some(2));
    assert_eq!(failure.selector.as_deref(), Some("#award"));
    assert_eq!(result.pages_completed, 2);
}

#[tokio::test]
async fn body_text_is_recorded_without_declared_outputs() {
    let long_body = "x".repeat(2_500);
    let driver = ScriptedDriver::new().with_text("body", &long_body);
    let result = run(&driver, fast_config(), false).await;

    assert!(result.success);
    assert_eq!(result.outputs["body_text"].chars().count(), 2_000);
    assert!(result.outputs.contains_key("page_url"));
}

#[tokio::test]
async fn evidence_is_saved_and_trimmed_to_last_page() {
    let dir = tempfile::tempdir().unwrap();
    let driver = ScriptedDriver::new().with_text("#award", "$1");
    let config = fast_config().with_evidence(EvidencePolicy {
        jpeg_quality: 60,
        save_dir: Some(dir.path().to_path_buf()),
        include_in_result: EvidenceInclusion::Last,
    });
    let run_id = RunId("run-evidence".into());
    let result = controller(&driver, config)
        .execute(run_id, &plan(true), CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(result.evidence.len(), 1);
    assert_eq!(result.evidence[0].label, "page-2");
    assert!(dir.path().join("run-evidence_page-1.jpg").exists());
    assert!(dir.path().join("run-evidence_page-2.jpg").exists());
}
