//! Configuration loading, validation, and management for localpilot.
//!
//! Loads configuration from `~/.localpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.localpilot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model server and sampling settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Token budget for a single request
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Agent loop behavior
    #[serde(default)]
    pub agent: AgentConfig,

    /// Context assembly limits
    #[serde(default)]
    pub context: ContextConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Which kind of local model server to talk to.
///
/// All of them speak the OpenAI chat-completions dialect; the kind only
/// decides the default endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Lmstudio,
    Llamacpp,
    OpenaiCompatible,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Lmstudio => "lmstudio",
            Self::Llamacpp => "llamacpp",
            Self::OpenaiCompatible => "openai-compatible",
        }
    }

    /// The endpoint the server listens on out of the box.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434/v1",
            Self::Lmstudio => "http://localhost:1234/v1",
            Self::Llamacpp | Self::OpenaiCompatible => "http://localhost:8080/v1",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Base URL ending in `/v1`; the provider's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_model_name")]
    pub name: String,

    /// Only needed for servers started with an API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Cap on generated tokens per reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_tokens: Option<u32>,
}

fn default_model_name() -> String {
    "qwen2.5-coder:7b".into()
}
fn default_temperature() -> f32 {
    0.2
}

impl ModelConfig {
    /// The configured endpoint, or the provider kind's default.
    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: None,
            name: default_model_name(),
            api_key: None,
            temperature: default_temperature(),
            max_response_tokens: None,
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_response_tokens", &self.max_response_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Hard limit for one request (system prompt + context + message)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Fraction of `max_tokens` at which the budget is "approaching"
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f32,

    /// Fraction of `max_tokens` above which context is condensed
    #[serde(default = "default_condensation_ratio")]
    pub condensation_ratio: f32,

    /// Passed through to the model transport
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_tokens() -> usize {
    32_768
}
fn default_warning_ratio() -> f32 {
    0.8
}
fn default_condensation_ratio() -> f32 {
    0.9
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            warning_ratio: default_warning_ratio(),
            condensation_ratio: default_condensation_ratio(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model turns allowed per chat before the progress summary
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// How many times an empty model reply is retried
    #[serde(default = "default_max_empty_retries")]
    pub max_empty_retries: usize,

    /// Full tool output in progress events instead of a short preview
    #[serde(default)]
    pub verbose_events: bool,

    /// Summarize context through the model when a request nears the token limit
    #[serde(default = "default_true")]
    pub condense_context: bool,

    /// Replace the built-in base prompt (the tool catalog is still appended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_turns() -> usize {
    256
}
fn default_max_empty_retries() -> usize {
    1
}
fn default_true() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_empty_retries: default_max_empty_retries(),
            verbose_events: false,
            condense_context: true,
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Lines kept from a single context file
    #[serde(default = "default_max_file_lines")]
    pub max_file_lines: usize,

    /// Token budget of the sliding window over the master context
    #[serde(default = "default_max_window_tokens")]
    pub max_window_tokens: usize,
}

fn default_max_file_lines() -> usize {
    256
}
fn default_max_window_tokens() -> usize {
    256_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_file_lines: default_max_file_lines(),
            max_window_tokens: default_max_window_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Root all file tools resolve against; the working directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Programs `run_command` may start. Empty = allow all.
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    60
}

impl ToolsConfig {
    /// The configured root, or the process working directory.
    pub fn effective_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_root: None,
            allowed_commands: vec![],
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.localpilot/config.toml).
    ///
    /// Environment variables override the file:
    /// - `LOCALPILOT_ENDPOINT`
    /// - `LOCALPILOT_MODEL`
    /// - `LOCALPILOT_API_KEY`
    /// - `LOCALPILOT_MAX_TURNS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
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

    /// Apply `LOCALPILOT_*` overrides read through `lookup`, then re-validate.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(endpoint) = lookup("LOCALPILOT_ENDPOINT") {
            self.model.endpoint = Some(endpoint);
        }
        if let Some(model) = lookup("LOCALPILOT_MODEL") {
            self.model.name = model;
        }
        if let Some(key) = lookup("LOCALPILOT_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(turns) = lookup("LOCALPILOT_MAX_TURNS") {
            self.agent.max_turns = turns.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LOCALPILOT_MAX_TURNS must be a positive integer, got '{turns}'"
                ))
            })?;
        }
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".localpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.tokens.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "tokens.max_tokens must be > 0".into(),
            ));
        }

        let (warn, condense) = (self.tokens.warning_ratio, self.tokens.condensation_ratio);
        if !(warn > 0.0 && warn <= condense && condense <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "token ratios must satisfy 0 < warning_ratio <= condensation_ratio <= 1 \
                 (got {warn} and {condense})"
            )));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be >= 1".into(),
            ));
        }

        if self.context.max_file_lines == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_file_lines must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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
}
