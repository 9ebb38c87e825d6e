//! Session configuration and handle types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browsing-engine identity presented to the target site.
///
/// Some sites behave differently depending on which engine they believe they
/// are talking to. The session is always driven through Chromium; the profile
/// selects the identity (user agent) it announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineProfile {
    #[default]
    Chromium,
    Webkit,
    Firefox,
}

impl EngineProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineProfile::Chromium => "chromium",
            EngineProfile::Webkit => "webkit",
            EngineProfile::Firefox => "firefox",
        }
    }

    /// User agent override, `None` keeps the browser's own.
    pub fn user_agent(self) -> Option<&'static str> {
        match self {
            EngineProfile::Chromium => None,
            EngineProfile::Webkit => Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
            ),
            EngineProfile::Firefox => Some(
                "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
            ),
        }
    }
}

impl std::str::FromStr for EngineProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(EngineProfile::Chromium),
            "webkit" | "safari" => Ok(EngineProfile::Webkit),
            "firefox" => Ok(EngineProfile::Firefox),
            other => Err(format!("unknown engine profile '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 1024,
        }
    }
}

/// Options used to open one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub headless: bool,
    pub engine_profile: EngineProfile,
    pub viewport: Viewport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    #[serde(default)]
    pub launch_args: Vec<String>,
    /// How long `locate` polls for an element to appear
    #[serde(with = "duration_ms")]
    pub element_wait: Duration,
    /// JPEG quality for screenshots, 1..=100
    pub jpeg_quality: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            engine_profile: EngineProfile::default(),
            viewport: Viewport::default(),
            chrome_path: None,
            launch_args: Vec::new(),
            element_wait: Duration::from_millis(10_000),
            jpeg_quality: 80,
        }
    }
}

impl SessionConfig {
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_engine_profile(mut self, profile: EngineProfile) -> Self {
        self.engine_profile = profile;
        self
    }

    pub fn with_element_wait(mut self, wait: Duration) -> Self {
        self.element_wait = wait;
        self
    }
}

/// Opaque reference to an element located in the current session.
///
/// Only valid for the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: u64,
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_profile_parses_aliases() {
        assert_eq!("Safari".parse::<EngineProfile>(), Ok(EngineProfile::Webkit));
        assert_eq!("chrome".parse::<EngineProfile>(), Ok(EngineProfile::Chromium));
        assert!("lynx".parse::<EngineProfile>().is_err());
    }

    #[test]
    fn only_foreign_profiles_override_user_agent() {
        assert!(EngineProfile::Chromium.user_agent().is_none());
        assert!(EngineProfile::Firefox
            .user_agent()
            .map(|ua| ua.contains("Firefox"))
            .unwrap_or(false));
    }

    #[test]
    fn config_round_trips_with_millisecond_wait() {
        let config = SessionConfig::default().with_element_wait(Duration::from_millis(2500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["element_wait"], 2500);
        let back: SessionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
