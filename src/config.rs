//! Runner configuration
//!
//! Loaded from YAML (`--config FILE` or `<config dir>/wizard-runner/config.yaml`),
//! then overridden by `WIZARD_RUNNER_*` environment variables.

use std::path::{Path, PathBuf};

use execution_flow::{ControllerConfig, EvidencePolicy, OperationTimeouts};
use serde::{Deserialize, Serialize};
use session_driver::{EngineProfile, SessionConfig, Viewport};
use tracing::{info, warn};

use crate::errors::ConfigError;

pub const ENV_PREFIX: &str = "WIZARD_RUNNER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Root holding `wizard-structures/` and `data-schemas/`
    pub wizards_dir: PathBuf,
    pub session: SessionSettings,
    pub timeouts: OperationTimeouts,
    pub evidence: EvidencePolicy,
    pub logging: LoggingConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            wizards_dir: PathBuf::from("wizards"),
            session: SessionSettings::default(),
            timeouts: OperationTimeouts::default(),
            evidence: EvidencePolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub headless: bool,
    pub engine_profile: EngineProfile,
    pub viewport: Viewport,
    pub chrome_path: Option<PathBuf>,
    pub launch_args: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            headless: true,
            engine_profile: EngineProfile::default(),
            viewport: Viewport::default(),
            chrome_path: None,
            launch_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Daily rolling log files are written here when set
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "wizard-runner.log".to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wizard-runner").join("config.yaml"))
    }

    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the file at `path` (or the default location). A missing file
    /// yields defaults. Environment overrides are applied and the result is
    /// validated.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let config = Self::from_yaml(&raw, &path)?;
                info!("Loaded configuration from: {}", path.display());
                config
            }
            Some(path) => {
                warn!("Config file not found, using defaults: {}", path.display());
                Self::default()
            }
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `WIZARD_RUNNER_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(dir) = var("WIZARDS_DIR") {
            self.wizards_dir = PathBuf::from(dir);
        }
        if let Some(raw) = var("HEADLESS") {
            match raw.trim().parse::<bool>() {
                Ok(headless) => self.session.headless = headless,
                Err(_) => warn!("ignoring {ENV_PREFIX}HEADLESS={raw}: expected true or false"),
            }
        }
        if let Some(raw) = var("ENGINE_PROFILE") {
            match raw.parse::<EngineProfile>() {
                Ok(profile) => self.session.engine_profile = profile,
                Err(err) => warn!("ignoring {ENV_PREFIX}ENGINE_PROFILE: {err}"),
            }
        }
        if let Some(path) = var("CHROME_PATH") {
            self.session.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = var("SCREENSHOT_DIR") {
            self.evidence.save_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        if !(1..=100).contains(&self.evidence.jpeg_quality) {
            problems.push(format!(
                "evidence.jpeg_quality must be within 1..=100, got {}",
                self.evidence.jpeg_quality
            ));
        }
        for name in self.timeouts.zero_bounds() {
            problems.push(format!("timeouts.{name} must be greater than zero"));
        }
        if self.session.viewport.width == 0 || self.session.viewport.height == 0 {
            problems.push("session.viewport must have a non-zero size".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            headless: self.session.headless,
            engine_profile: self.session.engine_profile,
            viewport: self.session.viewport,
            chrome_path: self.session.chrome_path.clone(),
            launch_args: self.session.launch_args.clone(),
            element_wait: std::time::Duration::from_millis(self.timeouts.element),
            jpeg_quality: self.evidence.jpeg_quality,
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::default()
            .with_session(self.session_config())
            .with_timeouts(self.timeouts.clone())
            .with_evidence(self.evidence.clone())
    }
}
