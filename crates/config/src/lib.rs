//! Configuration loading, validation, and management for fieldnote.
//!
//! Loads configuration from `~/.fieldnote/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.fieldnote/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the LLM provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model for planning and summarizing
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Iteration loop tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Built-in agent endpoints
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Report output
    #[serde(default)]
    pub report: ReportConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("engine", &self.engine)
            .field("agents", &self.agents)
            .field("report", &self.report)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Tuning for the dispatch-evaluate-replan loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on iterations (must be >= 1)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Agents running at once within an iteration
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay after each agent completion, in milliseconds (0 disables)
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// A summary needs more than this many words to satisfy the goal
    #[serde(default = "default_min_summary_words")]
    pub min_summary_words: usize,

    /// Extra attempts when the planner reply cannot be used
    #[serde(default = "default_planner_retries")]
    pub planner_retries: u32,
}

fn default_max_iterations() -> usize {
    3
}
fn default_concurrency() -> usize {
    4
}
fn default_pacing_ms() -> u64 {
    100
}
fn default_min_summary_words() -> usize {
    30
}
fn default_planner_retries() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            concurrency: default_concurrency(),
            pacing_ms: default_pacing_ms(),
            min_summary_words: default_min_summary_words(),
            planner_retries: default_planner_retries(),
        }
    }
}

/// An HTTP endpoint an agent calls, plus the env var holding its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,

    /// Name of the environment variable holding the API key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl EndpointConfig {
    fn new(endpoint: &str, api_key_env: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key_env: api_key_env.map(Into::into),
            enabled: true,
        }
    }

    /// Resolve the API key from the environment. Missing or unset → `None`.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
    }
}

/// Endpoints for the built-in agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Per-request timeout for agent HTTP calls, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// City used by `weather` when the goal names none
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default = "default_weather")]
    pub weather: EndpointConfig,

    #[serde(default = "default_spacex_next")]
    pub spacex_next: EndpointConfig,

    /// Base URL for launchpad lookups; the id is appended as a path segment
    #[serde(default = "default_launchpads")]
    pub launchpads: EndpointConfig,

    #[serde(default = "default_news")]
    pub news: EndpointConfig,

    /// Base URL for page summaries; the title is appended as a path segment
    #[serde(default = "default_wikipedia_summary")]
    pub wikipedia_summary: EndpointConfig,

    #[serde(default = "default_true")]
    pub sentiment: bool,
}

fn default_http_timeout_secs() -> u64 {
    10
}
fn default_city() -> String {
    "New York".into()
}
fn default_weather() -> EndpointConfig {
    EndpointConfig::new(
        "https://api.openweathermap.org/data/2.5/weather",
        Some("OPENWEATHER_KEY"),
    )
}
fn default_spacex_next() -> EndpointConfig {
    EndpointConfig::new("https://api.spacexdata.com/v4/launches/next", None)
}
fn default_launchpads() -> EndpointConfig {
    EndpointConfig::new("https://api.spacexdata.com/v4/launchpads", None)
}
fn default_news() -> EndpointConfig {
    EndpointConfig::new("https://newsdata.io/api/1/news", Some("NEWSDATA_API_KEY"))
}
fn default_wikipedia_summary() -> EndpointConfig {
    EndpointConfig::new("https://en.wikipedia.org/api/rest_v1/page/summary", None)
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            default_city: default_city(),
            weather: default_weather(),
            spacex_next: default_spacex_next(),
            launchpads: default_launchpads(),
            news: default_news(),
            wikipedia_summary: default_wikipedia_summary(),
            sentiment: true,
        }
    }
}

/// Report rendering and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory reports are written to (relative paths resolve against cwd)
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Whether `research` saves the report to disk
    #[serde(default = "default_true")]
    pub save: bool,

    /// Wrap width for report paragraphs
    #[serde(default = "default_text_width")]
    pub text_width: usize,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}
fn default_text_width() -> usize {
    80
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            save: true,
            text_width: default_text_width(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.fieldnote/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `FIELDNOTE_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("FIELDNOTE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("FIELDNOTE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("FIELDNOTE_MODEL") {
            self.default_model = model;
        }

        if let Ok(dir) = std::env::var("FIELDNOTE_REPORTS_DIR") {
            self.report.reports_dir = PathBuf::from(dir);
        }
    }

    /// Write this configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".fieldnote")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.engine.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_iterations must be at least 1".into(),
            ));
        }

        if self.engine.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "engine.concurrency must be at least 1".into(),
            ));
        }

        if self.agents.http_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agents.http_timeout_secs must be > 0".into(),
            ));
        }

        if self.report.text_width < 20 {
            return Err(ConfigError::ValidationError(
                "report.text_width must be at least 20".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            engine: EngineConfig::default(),
            agents: AgentsConfig::default(),
            report: ReportConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },
}

impl From<ConfigError> for fieldnote_core::Error {
    fn from(e: ConfigError) -> Self {
        fieldnote_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openrouter");
        assert_eq!(config.engine.max_iterations, 3);
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.engine.pacing_ms, 100);
        assert_eq!(config.engine.min_summary_words, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.agents.weather.endpoint, config.agents.weather.endpoint);
        assert_eq!(parsed.report.reports_dir, config.report.reports_dir);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let toml_str = r#"
default_model = "gpt-4o"

[engine]
max_iterations = 5

[agents.weather]
endpoint = "http://localhost:9000/weather"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.engine.max_iterations, 5);
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.agents.weather.endpoint, "http://localhost:9000/weather");
        assert!(config.agents.weather.api_key_env.is_none());
        assert!(config.agents.weather.enabled);
        assert_eq!(config.agents.news.api_key_env.as_deref(), Some("NEWSDATA_API_KEY"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.engine.max_iterations = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.engine.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openrouter");
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "engine = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.engine.pacing_ms = 0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.engine.pacing_ms, 0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn endpoint_without_key_env_has_no_key() {
        let endpoint = default_spacex_next();
        assert!(endpoint.api_key().is_none());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("newsdata.io"));
    }

    #[test]
    fn config_error_converts_to_core_error() {
        let err: fieldnote_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(err.to_string().contains("bad"));
    }
}
