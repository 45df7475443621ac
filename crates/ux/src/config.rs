//! Run configuration
//!
//! Layered the same way for every entry point: built-in defaults, then an
//! optional YAML file, then `CONDA_STORE_UX_*` environment variables. The
//! binary applies its command-line flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::driver::PlaywrightConfig;
use crate::error::{UxError, UxResult};
use crate::readiness::ReadinessConfig;

/// Default base URL of the conda-store UI
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default action/assertion timeout (1 minute)
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Slow-motion delay used for interactive runs
pub const MANUAL_SLOW_MO_MS: u64 = 500;

/// Complete configuration for one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UxConfig {
    /// Base URL of the UI under test
    pub base_url: String,

    /// Capture PNG screenshots at the named checkpoints
    pub screenshot: bool,

    /// Directory for screenshots and the JSON report
    pub results_dir: PathBuf,

    /// Namespace the environment is created in
    pub namespace: String,

    /// Login credentials
    pub credentials: Credentials,

    /// Timeouts for page interactions
    pub timeouts: Timeouts,

    /// Server readiness polling
    pub readiness: ReadinessConfig,

    /// Browser and Node.js settings
    pub playwright: PlaywrightConfig,
}

impl Default for UxConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            screenshot: false,
            results_dir: PathBuf::from("test-results"),
            namespace: "username".to_string(),
            credentials: Credentials::default(),
            timeouts: Timeouts::default(),
            readiness: ReadinessConfig::default(),
            playwright: PlaywrightConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "username".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default for every click, fill and expectation
    pub default_ms: u64,

    /// Initial page load; `None` falls back to `default_ms`
    pub navigation_ms: Option<u64>,

    /// Waiting for an environment build to reach `Completed`
    pub build_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: DEFAULT_TIMEOUT_MS,
            navigation_ms: Some(4 * 60 * 1000),
            build_ms: 5 * 60 * 1000,
        }
    }
}

impl Timeouts {
    pub fn build(&self) -> Duration {
        Duration::from_millis(self.build_ms)
    }
}

impl UxConfig {
    /// Load configuration: defaults, optional YAML file, then environment
    pub fn load(path: Option<&Path>) -> UxResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file
    pub fn from_file(path: &Path) -> UxResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> UxResult<Self> {
        serde_yaml::from_str(yaml).map_err(UxError::from)
    }

    /// Apply `CONDA_STORE_UX_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> UxResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONDA_STORE_UX_BASE_URL") {
            debug!("base_url overridden from environment");
            self.base_url = url;
        }
        if let Some(flag) = lookup("CONDA_STORE_UX_SCREENSHOT") {
            self.screenshot = parse_flag("CONDA_STORE_UX_SCREENSHOT", &flag)?;
        }
        if let Some(dir) = lookup("CONDA_STORE_UX_RESULTS_DIR") {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(username) = lookup("CONDA_STORE_UX_USERNAME") {
            self.credentials.username = username;
        }
        if let Some(password) = lookup("CONDA_STORE_UX_PASSWORD") {
            self.credentials.password = password;
        }
        Ok(())
    }

    /// Switch to interactive settings: visible browser, slowed-down
    /// actions, no readiness wait and no extended navigation timeout
    pub fn manual(mut self) -> Self {
        self.playwright.headless = false;
        self.playwright.slow_mo_ms = MANUAL_SLOW_MO_MS;
        self.readiness.enabled = false;
        self.timeouts.navigation_ms = None;
        self
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> UxResult<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            UxError::InvalidConfig(format!("base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UxError::InvalidConfig(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.namespace.trim().is_empty() {
            return Err(UxError::InvalidConfig("namespace is empty".to_string()));
        }
        if self.timeouts.default_ms == 0 || self.timeouts.build_ms == 0 {
            return Err(UxError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        self.readiness.validate()?;
        Ok(())
    }

    /// Path of the JSON report for this run
    pub fn report_path(&self) -> PathBuf {
        self.results_dir.join("ux-results.json")
    }
}

fn parse_flag(key: &str, value: &str) -> UxResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(UxError::InvalidConfig(format!("{}: not a boolean: '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = UxConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(!config.screenshot);
        assert_eq!(config.timeouts.build(), Duration::from_secs(300));
        assert_eq!(config.report_path(), PathBuf::from("test-results/ux-results.json"));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
base_url: http://conda-store.test:8080
screenshot: true
timeouts:
  build_ms: 600000
"#;
        let config = UxConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "http://conda-store.test:8080");
        assert!(config.screenshot);
        assert_eq!(config.timeouts.build_ms, 600_000);
        assert_eq!(config.timeouts.default_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.namespace, "username");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = UxConfig::default();
        config
            .apply_env(lookup(&[
                ("CONDA_STORE_UX_BASE_URL", "http://127.0.0.1:5000"),
                ("CONDA_STORE_UX_SCREENSHOT", "yes"),
                ("CONDA_STORE_UX_RESULTS_DIR", "/tmp/ux"),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
        assert!(config.screenshot);
        assert_eq!(config.results_dir, PathBuf::from("/tmp/ux"));
    }

    #[test]
    fn test_bad_screenshot_flag() {
        let mut config = UxConfig::default();
        let err = config
            .apply_env(lookup(&[("CONDA_STORE_UX_SCREENSHOT", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, UxError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_non_http() {
        let config = UxConfig {
            base_url: "ftp://localhost".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = UxConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_manual_mode() {
        let config = UxConfig::default().manual();
        assert!(!config.playwright.headless);
        assert_eq!(config.playwright.slow_mo_ms, MANUAL_SLOW_MO_MS);
        assert!(!config.readiness.enabled);
        assert_eq!(config.timeouts.navigation_ms, None);
    }
}
