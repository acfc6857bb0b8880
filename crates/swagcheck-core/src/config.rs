//! Project configuration for scenario runs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::synth::substitute::Variables;

/// Project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API description path (JSON or YAML)
    pub spec: PathBuf,

    /// Overrides the description's `host`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Overrides the description's `basePath`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Values for `$name` placeholders in example parameters
    pub variables: Variables,

    /// HTTP client timeout in seconds
    pub timeout_secs: u64,

    /// Stop at the first scenario that does not pass
    pub stop_on_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: PathBuf::from("swagger.json"),
            host: None,
            base_path: None,
            variables: Variables::new(),
            timeout_secs: 10,
            stop_on_failure: false,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from the first default location found (`.swagcheck.toml`, ...)
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Like [`Config::load_default`], searching `dir` instead of the working directory.
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [".swagcheck.toml", ".swagcheck.json", "swagcheck.toml"];

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# swagcheck configuration

# API description with x-test examples (JSON or YAML)
spec = "swagger.json"

# Override the description's host / basePath
# host = "localhost:8080"
# base_path = "/v1"

# HTTP client timeout in seconds
timeout_secs = 10

# Stop at the first scenario that does not pass
stop_on_failure = false

# Values for "$name" placeholders in x-test parameters
[variables]
# petId = 101
# token = "secret"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
