use wizard_runner::{init_logging, LogFormat, LoggingConfig, RunnerConfig};

fn logged_lines(dir: &std::path::Path) -> String {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect()
}

// One test per binary: the subscriber is process-global.
#[tokio::test]
async fn config_diagnostics_reach_the_installed_subscriber() {
    let logs = tempfile::tempdir().unwrap();
    let handle = init_logging("info", LogFormat::Human).unwrap();

    let files = LoggingConfig {
        dir: Some(logs.path().to_path_buf()),
        ..LoggingConfig::default()
    };
    let guard = handle.attach_files(&files).unwrap();
    assert!(guard.is_some());

    let missing = logs.path().join("absent.yaml");
    let config = RunnerConfig::load(Some(&missing)).await.unwrap();
    assert_eq!(config.logging, LoggingConfig::default());

    let mut config = RunnerConfig::default();
    config.apply_overrides(|key| match key {
        "WIZARD_RUNNER_HEADLESS" => Some("sometimes".to_string()),
        _ => None,
    });

    drop(guard);
    let written = logged_lines(logs.path());
    assert!(
        written.contains("Config file not found, using defaults"),
        "{written}"
    );
    assert!(written.contains("WIZARD_RUNNER_HEADLESS=sometimes"), "{written}");
}
