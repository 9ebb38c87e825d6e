use std::fs;
use std::path::Path;

use serde_json::json;
use wizard_registry::{FsCatalog, InMemoryCatalog, RegistryError, WizardCatalog};
use wizard_core_types::{DataContract, WizardStructure};

fn structure(wizard_id: &str, name: &str) -> serde_json::Value {
    json!({
        "wizard_id": wizard_id,
        "name": name,
        "url": format!("https://{wizard_id}.example/start"),
        "discovered_at": "2025-01-10T12:00:00Z",
        "pages": [
            {
                "page_number": 1,
                "fields": [
                    { "field_id": "state", "selector": "#state", "interaction_kind": "fill" }
                ],
                "continue_action": { "selector": "#next" }
            }
        ]
    })
}

fn contract() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["state"],
        "properties": { "state": { "type": "string", "examples": ["IL"] } }
    })
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seeded() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "wizard-structures/loan-simulator.json",
        &structure("loan-simulator", "Loan Simulator").to_string(),
    );
    write(
        root,
        "wizard-structures/fsa-estimator.json",
        &structure("fsa-estimator", "FSA Estimator").to_string(),
    );
    write(root, "wizard-structures/broken.json", "{ not json");
    write(
        root,
        "wizard-structures/renamed.json",
        &structure("something-else", "Renamed").to_string(),
    );
    write(root, "wizard-structures/README.md", "ignored");
    write(
        root,
        "data-schemas/fsa-estimator-schema.json",
        &contract().to_string(),
    );
    dir
}

#[tokio::test]
async fn list_skips_bad_artifacts_and_sorts() {
    let dir = seeded();
    let catalog = FsCatalog::new(dir.path());
    let ids: Vec<_> = catalog
        .list()
        .await
        .into_iter()
        .map(|summary| summary.wizard_id)
        .collect();
    assert_eq!(ids, vec!["fsa-estimator", "loan-simulator"]);
}

#[tokio::test]
async fn direct_lookup_reports_what_list_skipped() {
    let dir = seeded();
    let catalog = FsCatalog::new(dir.path());

    assert!(matches!(
        catalog.structure("broken").await,
        Err(RegistryError::Structure { .. })
    ));
    assert!(matches!(
        catalog.structure("renamed").await,
        Err(RegistryError::IdMismatch { .. })
    ));
    assert!(matches!(
        catalog.structure("missing").await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        catalog.structure("../etc/passwd").await,
        Err(RegistryError::InvalidId(_))
    ));
    assert!(matches!(
        catalog.contract("loan-simulator").await,
        Err(RegistryError::ContractNotFound(_))
    ));
}

#[tokio::test]
async fn info_is_stable_across_calls() {
    let dir = seeded();
    let catalog = FsCatalog::new(dir.path());

    let first = catalog.info("fsa-estimator").await.unwrap();
    let second = catalog.info("fsa-estimator").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.page_count, 1);
    assert_eq!(first.name, "FSA Estimator");
    assert_eq!(first.example_user_data["state"], json!("IL"));
    assert!(first.contract.is_required("state"));
}

#[tokio::test]
async fn missing_root_lists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FsCatalog::new(dir.path().join("nope"));
    assert!(catalog.list().await.is_empty());
}

#[tokio::test]
async fn in_memory_catalog_matches_fs_behaviour() {
    let catalog = InMemoryCatalog::new();
    let structure =
        WizardStructure::from_json(&structure("fsa-estimator", "FSA Estimator").to_string()).unwrap();
    let contract = DataContract::from_json(&contract().to_string()).unwrap();
    catalog.insert(structure, contract).unwrap();

    assert_eq!(catalog.list().await.len(), 1);
    assert_eq!(catalog.info("fsa-estimator").await.unwrap().page_count, 1);
    assert!(catalog.info("other").await.unwrap_err().is_not_found());

    catalog.remove("fsa-estimator");
    assert!(catalog.list().await.is_empty());
}
