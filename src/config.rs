//! Persisted settings, read from TOML.
//!
//! Every key is optional; absent keys fall back to the built-in defaults,
//! including the design-token table and component patterns.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::{
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
use crate::design_qa::{default_component_patterns, ComponentPatterns, TokenConfig};
use crate::payload::Budget;
use crate::relay::{DEFAULT_BACKEND_URL, DEFAULT_READY_TIMEOUT, DEFAULT_RELAY_TIMEOUT};
use crate::survey::DEFAULT_MAX_ELEMENTS;
use crate::{AstraError, Result, Viewport};

const CONFIG_DIR: &str = "astra";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai_enabled: bool,
    pub backend_url: String,
    pub viewport: Viewport,
    pub timeouts: Timeouts,
    pub survey: SurveyConfig,
    pub budgets: Budgets,
    pub token_config: TokenConfig,
    pub component_patterns: ComponentPatterns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub process: Duration,
    /// One backend HTTP call, and one relay exchange.
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    /// Wait for the background service's ready signal.
    #[serde(with = "humantime_serde")]
    pub ready: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process: DEFAULT_PROCESS_TIMEOUT,
            request: DEFAULT_RELAY_TIMEOUT,
            ready: DEFAULT_READY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub max_elements: usize,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    pub ai_analysis: Budget,
    pub design_analysis: Budget,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            ai_analysis: Budget::AI_ANALYSIS,
            design_analysis: Budget::DESIGN_ANALYSIS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            viewport: Viewport::default(),
            timeouts: Timeouts::default(),
            survey: SurveyConfig::default(),
            budgets: Budgets::default(),
            token_config: TokenConfig::default(),
            component_patterns: default_component_patterns(),
        }
    }
}

impl Config {
    /// `<config dir>/astra/config.toml`, when the platform has a config dir.
    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads `path` when given; otherwise the central file if it exists;
    /// otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path().filter(|p| p.is_file()) {
                Some(central) => Self::from_file(&central),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            AstraError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| AstraError::Config(format!("Invalid config ({}): {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        url::Url::parse(&self.backend_url)
            .map_err(|e| format!("backend_url '{}' is not a valid URL: {}", self.backend_url, e))?;
        if self.survey.max_elements == 0 {
            return Err("survey.max_elements must be at least 1".to_string());
        }
        for (name, budget) in [
            ("ai_analysis", self.budgets.ai_analysis),
            ("design_analysis", self.budgets.design_analysis),
        ] {
            if budget.max_bytes == 0 {
                return Err(format!("budgets.{name}.max_bytes must be positive"));
            }
        }
        for (name, timeout) in [
            ("navigation", self.timeouts.navigation),
            ("network_idle", self.timeouts.network_idle),
            ("process", self.timeouts.process),
            ("request", self.timeouts.request),
            ("ready", self.timeouts.ready),
        ] {
            if timeout.is_zero() {
                return Err(format!("timeouts.{name} must be greater than zero"));
            }
        }
        Ok(())
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| AstraError::Config(format!("Failed to encode config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert!(cfg.ai_enabled);
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(cfg.viewport.width, 1440);
        assert_eq!(cfg.viewport.height, 900);
        assert_eq!(cfg.timeouts.request, Duration::from_secs(30));
        assert_eq!(cfg.timeouts.ready, Duration::from_secs(5));
        assert_eq!(cfg.survey.max_elements, 200);
        assert_eq!(cfg.budgets.ai_analysis.max_bytes, 1_000_000);
        assert_eq!(cfg.budgets.design_analysis.max_bytes, 800_000);
        assert!(cfg.component_patterns.contains_key("button"));
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::from_toml(
            r#"
ai_enabled = false
backend_url = "https://astra.example.dev"
viewport = "1280x800"

[timeouts]
request = "45s"

[token_config.spacing]
gutter = "24px"
"#,
        )
        .unwrap();

        assert!(!cfg.ai_enabled);
        assert_eq!(cfg.backend_url, "https://astra.example.dev");
        assert_eq!(cfg.viewport.to_string(), "1280x800");
        assert_eq!(cfg.timeouts.request, Duration::from_secs(45));
        assert_eq!(cfg.timeouts.navigation, DEFAULT_NAVIGATION_TIMEOUT);
        assert_eq!(cfg.token_config.spacing.get("gutter").map(String::as_str), Some("24px"));
        // a user table replaces the built-in one; siblings keep their defaults
        assert!(!cfg.token_config.spacing.contains_key("4"));
        assert_eq!(cfg.token_config.colors, TokenConfig::default().colors);
        assert_eq!(cfg.component_patterns, default_component_patterns());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Config::from_toml("backend_url = \"not a url\"").unwrap_err();
        assert!(err.contains("backend_url"));

        let err = Config::from_toml("[survey]\nmax_elements = 0").unwrap_err();
        assert!(err.contains("max_elements"));

        let err = Config::from_toml("[timeouts]\nrequest = \"0s\"").unwrap_err();
        assert!(err.contains("timeouts.request"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let cfg = Config {
            ai_enabled: false,
            ..Config::default()
        };
        cfg.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        let err = Config::load(Some(Path::new("/nope/astra.toml"))).unwrap_err();
        assert!(matches!(err, AstraError::Config(ref m) if m.contains("/nope/astra.toml")));
    }
}
