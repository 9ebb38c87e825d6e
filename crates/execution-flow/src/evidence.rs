//! Screenshot evidence encoding and optional persistence

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use tracing::{debug, warn};
use wizard_core_types::RunId;

use crate::types::{Evidence, EvidencePolicy};

pub struct EvidenceRecorder {
    run_id: RunId,
    save_dir: Option<PathBuf>,
}

impl EvidenceRecorder {
    pub fn new(run_id: RunId, policy: &EvidencePolicy) -> Self {
        Self {
            run_id,
            save_dir: policy.save_dir.clone(),
        }
    }

    /// Encode `bytes` and, when a save directory is configured, write them
    /// to `<run_id>_<label>.jpg`. A failed write only loses the file copy.
    pub async fn record(&self, label: &str, page_number: Option<u32>, bytes: Vec<u8>) -> Evidence {
        let saved_to = match &self.save_dir {
            Some(dir) => self.save(dir, label, &bytes).await,
            None => None,
        };
        Evidence {
            label: label.to_string(),
            page_number,
            captured_at: Utc::now(),
            byte_len: bytes.len(),
            image_base64: STANDARD.encode(&bytes),
            saved_to,
        }
    }

    async fn save(&self, dir: &Path, label: &str, bytes: &[u8]) -> Option<PathBuf> {
        let path = dir.join(format!("{}_{}.jpg", self.run_id, label));
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(run_id = %self.run_id, dir = %dir.display(), "cannot create evidence dir: {err}");
            return None;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
                debug!(run_id = %self.run_id, path = %path.display(), "evidence saved");
                Some(path)
            }
            Err(err) => {
                warn!(run_id = %self.run_id, path = %path.display(), "cannot save evidence: {err}");
                None
            }
        }
    }
}

pub fn page_label(page_number: u32) -> String {
    format!("page-{page_number}")
}

pub fn failure_label(page_number: Option<u32>) -> String {
    match page_number {
        Some(page) => format!("failure-page-{page}"),
        None => "failure-start".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let policy = EvidencePolicy {
            save_dir: Some(dir.path().join("shots")),
            ..EvidencePolicy::default()
        };
        let run_id = RunId("run-1".into());
        let recorder = EvidenceRecorder::new(run_id, &policy);

        let evidence = recorder
            .record(&page_label(2), Some(2), vec![0xFF, 0xD8, 0xFF])
            .await;
        assert_eq!(evidence.image_base64, "/9j/");
        assert_eq!(evidence.byte_len, 3);

        let saved = evidence.saved_to.unwrap();
        assert!(saved.ends_with("run-1_page-2.jpg"));
        assert_eq!(std::fs::read(saved).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn unwritable_dir_keeps_inline_copy() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let policy = EvidencePolicy {
            save_dir: Some(file.path().join("nested")),
            ..EvidencePolicy::default()
        };
        let recorder = EvidenceRecorder::new(RunId("run-2".into()), &policy);
        let evidence = recorder.record(&failure_label(None), None, vec![1, 2, 3]).await;
        assert!(evidence.saved_to.is_none());
        assert_eq!(evidence.label, "failure-start");
        assert!(!evidence.image_base64.is_empty());
    }
}
