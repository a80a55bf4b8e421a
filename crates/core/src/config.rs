//! Configuration
//!
//! Settings come from an optional TOML file with every field defaulted.
//! Secrets are read from the environment only.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::providers::warehouse::EndpointConfig;
use crate::resolver::RoutingPolicy;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "skyroute.toml";

/// Directory under the user config dir
const CONFIG_SUBDIR: &str = "skyroute";

pub const STATUS_API_KEY_VAR: &str = "AVIATIONSTACK_API_KEY";
pub const LLM_API_KEY_VAR: &str = "SKYROUTE_LLM_API_KEY";
const LLM_BASE_URL_VAR: &str = "SKYROUTE_LLM_BASE_URL";
const LLM_MODEL_VAR: &str = "SKYROUTE_LLM_MODEL";

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub status: StatusSettings,
    pub llm: LlmSettings,
    pub routing: RoutingPolicy,
    pub analytics: AnalyticsSettings,
}

/// Live flight status API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            base_url: "http://api.aviationstack.com/v1/flights".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Intent classifier backend (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8000/v1".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Historical analytics endpoints, keyed by intent label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub timeout_secs: u64,
    pub endpoints: HashMap<String, EndpointConfig>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            endpoints: HashMap::new(),
        }
    }
}

impl AnalyticsSettings {
    pub fn is_configured(&self) -> bool {
        !self.endpoints.is_empty()
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Settings {
    /// Load settings from the first config file found, then apply env overrides
    ///
    /// An explicit path must exist; the default locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_locations().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        settings.apply_env();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_var(LLM_BASE_URL_VAR) {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty_var(LLM_MODEL_VAR) {
            self.llm.model = model;
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![env::current_dir()
        .map(|p| p.join(LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| PathBuf::from(LOCAL_CONFIG_FILE))];

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_SUBDIR).join("config.toml"));
    }
    paths
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// AviationStack access key, if set
pub fn status_api_key() -> Option<String> {
    non_empty_var(STATUS_API_KEY_VAR)
}

/// Bearer token for the classifier endpoint, if set
pub fn llm_api_key() -> Option<String> {
    non_empty_var(LLM_API_KEY_VAR)
}
