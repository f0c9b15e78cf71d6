//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Top-level bridge configuration, stored as JSON5.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Template and image API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the admin API (default: http://localhost:8080).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the template collection (default: /api/admin/automated-emails).
    #[serde(default = "default_templates_path")]
    pub templates_path: String,

    /// Path of the image file library (default: /api/admin/files).
    #[serde(default = "default_files_path")]
    pub files_path: String,

    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            templates_path: default_templates_path(),
            files_path: default_files_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_templates_path() -> String {
    "/api/admin/automated-emails".into()
}

fn default_files_path() -> String {
    "/api/admin/files".into()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Collapse concurrent template fetches on a cache miss into one request.
    #[serde(default = "default_true")]
    pub single_flight: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            single_flight: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "email_bridge_host=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| BridgeError::Config(e.to_string()))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw)?;

        json5::from_str(&substituted).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Default config file: `~/.email_bridge/config.json`
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// API settings, falling back to defaults.
    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    pub fn single_flight(&self) -> bool {
        self.bridge.as_ref().map(|b| b.single_flight).unwrap_or(true)
    }

    /// Get a config value by dotted path (e.g. "api.base_url").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Set a config value by dotted path, creating intermediate sections.
    pub fn set_path(&mut self, path: &str, value: serde_json::Value) -> Result<()> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(BridgeError::Config("Empty path".into()));
        };

        let mut json = serde_json::to_value(&*self)?;
        let mut current = &mut json;
        for segment in parents {
            let object = current
                .as_object_mut()
                .ok_or_else(|| BridgeError::Config(format!("'{segment}' is not a section")))?;
            current = object
                .entry(segment.to_string())
                .or_insert_with(|| serde_json::json!({}));
        }
        let object = current
            .as_object_mut()
            .ok_or_else(|| BridgeError::Config(format!("cannot set '{path}'")))?;
        object.insert(last.to_string(), value);

        *self = serde_json::from_value(json)
            .map_err(|e| BridgeError::Config(format!("invalid value for '{path}': {e}")))?;
        Ok(())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let api = self.api();
        match api.base_url.split_once("://") {
            Some(("https", host)) | Some(("http", host)) if !host.is_empty() => {
                let is_local = host.starts_with("localhost") || host.starts_with("127.0.0.1");
                if api.base_url.starts_with("http://") && !is_local {
                    warnings.push(format!(
                        "API base URL uses plain HTTP for a remote host: {}",
                        api.base_url
                    ));
                }
            }
            _ => errors.push(format!("Invalid API base URL: {}", api.base_url)),
        }

        for (name, path) in [
            ("templates_path", &api.templates_path),
            ("files_path", &api.files_path),
        ] {
            if !path.starts_with('/') {
                errors.push(format!("API {name} must start with '/': {path}"));
            }
        }

        if api.timeout_secs == 0 {
            errors.push("API timeout cannot be 0".to_string());
        }

        if !self.single_flight() {
            warnings.push(
                "Single-flight template fetching is disabled; concurrent cache misses will each hit the API"
                    .to_string(),
            );
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for bridge data: `~/.email_bridge/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".email_bridge")
}
