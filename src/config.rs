use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::estimate::CompletionTimes;

pub const DEFAULT_FALLBACK_RATE: f64 = 200.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateDefaults {
    /// Creation hours per hour of learner completion time when nothing more
    /// specific is configured.
    pub fallback_rate: f64,
}

impl Default for RateDefaults {
    fn default() -> Self {
        Self {
            fallback_rate: DEFAULT_FALLBACK_RATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    pub debounce_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 2000 }
    }
}

impl AutoSaveConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub endpoint: String,
    pub api_prefix: String,
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            api_prefix: "/api/custom".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub rates: RateDefaults,
    pub completion: CompletionTimes,
    pub autosave: AutoSaveConfig,
    pub backend: BackendConfig,
}

impl PlannerConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                Self::from_toml(&contents)?
            } else {
                PlannerConfig::default()
            }
        } else {
            PlannerConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|err| format!("failed to parse config: {}", err))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| format!("failed to create config dir: {}", err))?;
            }
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload)
            .map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(rate) = env::var("PLANNER_FALLBACK_RATE") {
            if let Ok(value) = rate.parse::<f64>() {
                if value.is_finite() && value >= 0.0 {
                    self.rates.fallback_rate = value;
                }
            }
        }
        if let Ok(debounce) = env::var("PLANNER_AUTOSAVE_MS") {
            if let Ok(value) = debounce.parse::<u64>() {
                self.autosave.debounce_ms = value;
            }
        }
        if let Ok(endpoint) = env::var("PLANNER_BACKEND_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.backend.endpoint = endpoint;
            }
        }
        if let Ok(prefix) = env::var("PLANNER_BACKEND_PREFIX") {
            self.backend.api_prefix = prefix;
        }
        if let Ok(timeout) = env::var("PLANNER_BACKEND_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.backend.timeout_ms = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("PLANNER_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/planner.toml")))
}
