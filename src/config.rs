//! Configuration management for codescreen
//!
//! Defaults are compiled in. A TOML file (`--config PATH`, or
//! `~/.config/codescreen/config.toml` when present) overrides them, and a
//! handful of environment variables override the file.

use crate::llm::models::ModelTier;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),

    #[error("exclusion pattern {pattern:?} does not compile: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub filter: FilterConfig,
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub region: String,
    /// Full base URL replacing `https://bedrock-runtime.{region}.amazonaws.com`
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
    pub temperature: f64,
    pub top_p: f64,
    pub micro: TierConfig,
    pub lite: TierConfig,
    pub premier: TierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierConfig {
    pub id: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Lower-case extensions including the dot
    pub supported_extensions: Vec<String>,
    /// Full-match regexes over the candidate path
    pub exclude_patterns: Vec<String>,
    /// Test-directory patterns, dropped when a batch asks to include tests
    pub test_patterns: Vec<String>,
    pub max_file_size: u64,
    /// Cap on accepted files per batch; 0 means no cap
    pub max_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between dispatches to one model tier
    pub min_call_interval_ms: u64,
    /// Minimum quiet time after a call completes before the next dispatch
    pub pacing_delay_ms: u64,
    /// Attempt ceiling per invocation, first attempt included
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Hard ceiling on candidate size; batch options may only lower it.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            request_timeout_secs: 60,
            temperature: 0.1,
            top_p: 0.9,
            micro: TierConfig::default_for(ModelTier::Micro),
            lite: TierConfig::default_for(ModelTier::Lite),
            premier: TierConfig::default_for(ModelTier::Premier),
        }
    }
}

impl TierConfig {
    fn default_for(tier: ModelTier) -> Self {
        Self {
            id: tier.default_id().to_string(),
            max_tokens: tier.default_max_tokens(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            supported_extensions: owned(&[
                ".java", ".py", ".js", ".ts", ".cs", ".go", ".rb", ".php", ".cpp", ".c", ".kt",
                ".scala", ".swift",
            ]),
            exclude_patterns: owned(&[
                r".*/node_modules/.*",
                r".*/__pycache__/.*",
                r".*/target/.*",
                r".*/build/.*",
                r".*/dist/.*",
                r".*/\.git/.*",
                r".*/vendor/.*",
                r".*/coverage/.*",
                r".*\.min\.(js|css)$",
                r".*\.generated\.(java|cs)$",
            ]),
            test_patterns: owned(&[r".*/test/.*", r".*/tests/.*"]),
            max_file_size: MAX_FILE_SIZE,
            max_files: 0,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // Nova Micro allows 5 requests per second
        Self {
            min_call_interval_ms: 200,
            pacing_delay_ms: 100,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ModelConfig {
    pub fn tier(&self, tier: ModelTier) -> &TierConfig {
        match tier {
            ModelTier::Micro => &self.micro,
            ModelTier::Lite => &self.lite,
            ModelTier::Premier => &self.premier,
        }
    }

    /// Base URL of the model-serving endpoint
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

impl ThrottleConfig {
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("codescreen").join("config.toml"))
    }

    /// Load configuration: defaults, then the file, then the process environment.
    ///
    /// An explicitly given path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.is_file() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("MODEL_ID").filter(|v| !v.trim().is_empty()) {
            self.model.micro.id = id.trim().to_string();
        }
        if let Some(region) = lookup("BEDROCK_REGION").filter(|v| !v.trim().is_empty()) {
            self.model.region = region.trim().to_string();
        }
        if let Some(endpoint) = lookup("CODESCREEN_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            self.model.endpoint = Some(endpoint.trim().to_string());
        }
        if let Some(raw) = lookup("MAX_TOKENS") {
            self.model.micro.max_tokens = parse_number("MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("CODESCREEN_MIN_CALL_INTERVAL_MS") {
            self.throttle.min_call_interval_ms = parse_number("CODESCREEN_MIN_CALL_INTERVAL_MS", &raw)?;
        }
        if let Some(raw) = lookup("CODESCREEN_RETRY_DELAY_MS") {
            self.throttle.retry_delay_ms = parse_number("CODESCREEN_RETRY_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("CODESCREEN_MAX_RETRIES") {
            self.throttle.max_retries = parse_number("CODESCREEN_MAX_RETRIES", &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "throttle.max_retries must allow at least one attempt".to_string(),
            ));
        }
        for tier in [ModelTier::Micro, ModelTier::Lite, ModelTier::Premier] {
            let settings = self.model.tier(tier);
            if settings.id.trim().is_empty() || settings.max_tokens == 0 {
                return Err(ConfigError::Invalid(format!(
                    "model.{} needs a model id and a non-zero max_tokens",
                    tier.name()
                )));
            }
        }
        if self.filter.max_file_size == 0 || self.filter.max_file_size > MAX_FILE_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "filter.max_file_size",
                value: self.filter.max_file_size.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(ConfigError::InvalidValue {
                key: "model.top_p",
                value: self.model.top_p.to_string(),
            });
        }
        for pattern in self.filter.exclude_patterns.iter().chain(&self.filter.test_patterns) {
            regex::Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
