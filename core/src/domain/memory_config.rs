// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// Memory Configuration Types
//
// Defines the configuration schema for a memlink host, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - LLM backend configuration (external CLI tools)
// - Extra model aliases per backend
// - Categorization strategy and its retry policy
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::model_alias::{is_canonical_model, CANONICAL_MODELS, DEFAULT_MODEL};

pub const API_VERSION: &str = "memlink.dev/v1";
pub const KIND: &str = "MemoryConfig";

/// Backend type handled by `ClaudeCliAdapter`
pub const CLAUDE_CLI_BACKEND: &str = "claude-cli";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfigManifest {
    /// API version (must be "memlink.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "MemoryConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: MemoryConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable host name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Configuration specification (content under spec:)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfigSpec {
    /// LLM backend configurations
    #[serde(default)]
    pub llm_backends: Vec<LLMBackendConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    #[serde(default)]
    pub categorization: CategorizationConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMBackendConfig {
    /// Unique backend name (e.g., "claude")
    pub name: String,

    /// Backend type ("claude-cli")
    #[serde(rename = "type")]
    pub backend_type: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Executable name or path (looked up on PATH when bare)
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Model alias or canonical identifier
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Kill the backend process after this long (e.g. "2m")
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Fail requests that carry tool definitions instead of ignoring them
    #[serde(default)]
    pub reject_tool_calls: bool,

    /// Extra aliases on top of the built-in table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelAliasConfig>,
}

impl LLMBackendConfig {
    /// `claude-cli` backend with every optional setting left unset
    pub fn claude_cli(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_type: CLAUDE_CLI_BACKEND.to_string(),
            enabled: true,
            executable: default_executable(),
            model: default_model(),
            max_tokens: None,
            temperature: None,
            timeout: None,
            reject_tool_calls: false,
            models: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAliasConfig {
    /// User-facing name (e.g., "smart")
    pub alias: String,

    /// Canonical identifier the backend accepts (e.g., "opus")
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMSelection {
    /// Backend used when a caller does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategorizationStrategy {
    #[default]
    Keyword,
    Llm,
}

impl std::str::FromStr for CategorizationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "llm" => Ok(Self::Llm),
            other => anyhow::bail!("Unknown categorization strategy: '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationConfig {
    #[serde(default)]
    pub strategy: CategorizationStrategy,

    /// Backend for the llm strategy (default backend when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Attempts before falling back to keyword matching
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_min_backoff", with = "humantime_serde")]
    pub min_backoff: Duration,

    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            strategy: CategorizationStrategy::Keyword,
            backend: None,
            max_attempts: default_max_attempts(),
            min_backoff: default_min_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_executable() -> String {
    "claude".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_backoff() -> Duration {
    Duration::from_secs(4)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(15)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for MemoryConfigSpec {
    fn default() -> Self {
        Self {
            llm_backends: vec![LLMBackendConfig::claude_cli("claude")],
            llm_selection: LLMSelection {
                default_backend: Some("claude".to_string()),
            },
            categorization: CategorizationConfig::default(),
            observability: None,
        }
    }
}

impl Default for MemoryConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "memlink-host".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: MemoryConfigSpec::default(),
        }
    }
}

impl MemoryConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate configuration paths in precedence order
    /// 1. MEMLINK_CONFIG_PATH environment variable
    /// 2. ./memlink-config.yaml (working directory)
    /// 3. ~/.memlink/config.yaml (user home)
    /// 4. /etc/memlink/config.yaml (system, Unix) or C:\ProgramData\memlink\config.yaml (Windows)
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var("MEMLINK_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("./memlink-config.yaml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".memlink").join("config.yaml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/memlink/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\memlink\\config.yaml"));

        paths
    }

    /// First existing path from [`Self::search_paths`]
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| path.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(&config_path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e)
            })?
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bin) = std::env::var("MEMLINK_CLAUDE_BIN") {
            if !bin.trim().is_empty() {
                tracing::info!("Environment override: MEMLINK_CLAUDE_BIN={}", bin);
                for backend in self.claude_cli_backends_mut() {
                    backend.executable = bin.clone();
                }
            }
        }

        if let Ok(model) = std::env::var("MEMLINK_MODEL") {
            if !model.trim().is_empty() {
                tracing::info!("Environment override: MEMLINK_MODEL={}", model);
                for backend in self.claude_cli_backends_mut() {
                    backend.model = model.clone();
                }
            }
        }

        if let Ok(val) = std::env::var("MEMLINK_CATEGORIZATION_STRATEGY") {
            match val.parse::<CategorizationStrategy>() {
                Ok(strategy) => {
                    tracing::info!("Environment override: MEMLINK_CATEGORIZATION_STRATEGY={}", val);
                    self.spec.categorization.strategy = strategy;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for MEMLINK_CATEGORIZATION_STRATEGY: '{}'. Expected keyword/llm. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    fn claude_cli_backends_mut(&mut self) -> impl Iterator<Item = &mut LLMBackendConfig> {
        self.spec
            .llm_backends
            .iter_mut()
            .filter(|b| b.backend_type == CLAUDE_CLI_BACKEND)
    }

    /// Name of the backend callers get when they do not ask for one
    pub fn default_backend_name(&self) -> Option<&str> {
        self.spec.default_backend_name()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec.validate()
    }
}

impl MemoryConfigSpec {
    pub fn default_backend_name(&self) -> Option<&str> {
        self.llm_selection
            .default_backend
            .as_deref()
            .or_else(|| {
                self.llm_backends
                    .iter()
                    .find(|b| b.enabled)
                    .map(|b| b.name.as_str())
            })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for backend in &self.llm_backends {
            if backend.name.is_empty() {
                anyhow::bail!("LLM backend name cannot be empty");
            }

            if !seen.insert(backend.name.as_str()) {
                anyhow::bail!("Duplicate LLM backend name: {}", backend.name);
            }

            if backend.backend_type != CLAUDE_CLI_BACKEND {
                anyhow::bail!(
                    "Unsupported backend type '{}' for: {}",
                    backend.backend_type,
                    backend.name
                );
            }

            if backend.executable.trim().is_empty() {
                anyhow::bail!("LLM backend executable cannot be empty for: {}", backend.name);
            }

            if backend.max_tokens == Some(0) {
                anyhow::bail!("max_tokens must be positive for: {}", backend.name);
            }

            if let Some(temperature) = backend.temperature {
                if !(0.0..=1.0).contains(&temperature) {
                    anyhow::bail!(
                        "temperature must be between 0.0 and 1.0 for: {} (got {})",
                        backend.name,
                        temperature
                    );
                }
            }

            for alias in &backend.models {
                if alias.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in backend: {}", backend.name);
                }

                if !is_canonical_model(&alias.model) {
                    anyhow::bail!(
                        "Alias '{}' maps to '{}', which is not one of {:?}",
                        alias.alias,
                        alias.model,
                        CANONICAL_MODELS
                    );
                }
            }
        }

        if let Some(default_backend) = &self.llm_selection.default_backend {
            if !self.llm_backends.iter().any(|b| &b.name == default_backend) {
                anyhow::bail!("Default backend '{}' not found in llm_backends", default_backend);
            }
        }

        let categorization = &self.categorization;
        if let Some(backend) = &categorization.backend {
            if !self.llm_backends.iter().any(|b| &b.name == backend) {
                anyhow::bail!("Categorization backend '{}' not found in llm_backends", backend);
            }
        }

        if categorization.strategy == CategorizationStrategy::Llm
            && categorization.backend.is_none()
            && self.default_backend_name().is_none()
        {
            anyhow::bail!("Categorization strategy 'llm' needs an LLM backend");
        }

        if categorization.max_attempts == 0 {
            anyhow::bail!("categorization.max_attempts must be at least 1");
        }

        if categorization.min_backoff > categorization.max_backoff {
            anyhow::bail!(
                "categorization.min_backoff ({:?}) exceeds max_backoff ({:?})",
                categorization.min_backoff,
                categorization.max_backoff
            );
        }

        Ok(())
    }
}
