use std::time::Duration;

use session_driver::{
    DriverCall, DriverError, DriverOp, ScriptedDriver, SessionConfig, SessionDriver,
};
use wizard_core_types::InteractionKind;

#[tokio::test]
async fn records_calls_in_order() {
    let driver = ScriptedDriver::new().with_text("#award", "$7,395");
    let mut session = driver.open(&SessionConfig::default()).await.unwrap();

    session.navigate("https://example.test/start").await.unwrap();
    let field = session.locate("#state").await.unwrap();
    session
        .interact(&field, InteractionKind::FillThenSubmit, Some("IL"))
        .await
        .unwrap();
    assert_eq!(session.read_text("#award").await.unwrap(), "$7,395");
    let shot = session.screenshot().await.unwrap();
    assert_eq!(&shot[..2], &[0xFF, 0xD8]);
    session.close().await.unwrap();

    assert_eq!(
        driver.interactions(),
        vec![(
            "#state".to_string(),
            InteractionKind::FillThenSubmit,
            Some("IL".to_string())
        )]
    );
    assert_eq!(driver.calls().last(), Some(&DriverCall::Close));
    assert_eq!(driver.open_count(), 1);
    assert_eq!(driver.close_count(), 1);
    assert_eq!(driver.leaked_count(), 0);
}

#[tokio::test]
async fn failures_can_target_one_selector() {
    let driver = ScriptedDriver::new()
        .fail_on(
            DriverOp::Interact,
            Some("#submit"),
            DriverError::rejected("#submit", InteractionKind::Click, "element is disabled"),
        )
        .without_element("#ghost");
    let mut session = driver.open(&SessionConfig::default()).await.unwrap();

    let ok = session.locate("#next").await.unwrap();
    session
        .interact(&ok, InteractionKind::Click, None)
        .await
        .unwrap();

    let submit = session.locate("#submit").await.unwrap();
    let err = session
        .interact(&submit, InteractionKind::Click, None)
        .await
        .unwrap_err();
    assert_eq!(err.selector(), Some("#submit"));

    assert_eq!(
        session.locate("#ghost").await.unwrap_err(),
        DriverError::not_found("#ghost")
    );
    session.close().await.unwrap();
}

#[tokio::test]
async fn hang_never_completes() {
    let driver = ScriptedDriver::new().hang_on(DriverOp::Navigate, None);
    let mut session = driver.open(&SessionConfig::default()).await.unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        session.navigate("https://example.test"),
    )
    .await;
    assert!(outcome.is_err());
    session.close().await.unwrap();
}

#[tokio::test]
async fn dropped_session_counts_as_leaked() {
    let driver = ScriptedDriver::new();
    let session = driver.open(&SessionConfig::default()).await.unwrap();
    drop(session);
    assert_eq!(driver.leaked_count(), 1);
    assert_eq!(driver.close_count(), 0);
}

#[test]
fn open_failure_is_reported() {
    let driver = ScriptedDriver::new().fail_on(
        DriverOp::Open,
        None,
        DriverError::SessionAcquisition("no chromium".into()),
    );
    let result = tokio_test::block_on(driver.open(&SessionConfig::default()));
    assert!(matches!(result, Err(DriverError::SessionAcquisition(_))));
    assert_eq!(driver.open_count(), 0);
}
