// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// LLM Backend Registry
//
// Builds every configured backend once at startup and hands out shared
// handles by name. No retries or fallbacks happen here: a failing backend
// call surfaces to the caller unchanged.

use crate::domain::llm::{GenerationConfig, LLMBackend, LLMError};
use crate::domain::memory_config::{LLMBackendConfig, MemoryConfigSpec, CLAUDE_CLI_BACKEND};
use crate::domain::model_alias::ModelAliasTable;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use super::claude_cli::ClaudeCliAdapter;

/// Registry of named LLM backends
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn LLMBackend>>,
    default_backend: Option<String>,
}

impl BackendRegistry {
    /// Create backend registry from configuration
    pub fn from_config(config: &MemoryConfigSpec) -> anyhow::Result<Self> {
        let mut registry = Self {
            backends: HashMap::new(),
            default_backend: None,
        };

        info!("Initializing LLM backend registry");

        for backend_config in &config.llm_backends {
            if !backend_config.enabled {
                info!("Backend '{}' disabled, skipping", backend_config.name);
                continue;
            }

            match Self::create_backend(backend_config) {
                Ok(backend) => {
                    info!(
                        "Registered backend '{}' ({})",
                        backend_config.name, backend_config.backend_type
                    );
                    registry.register(backend);
                }
                Err(e) => {
                    warn!("Failed to initialize backend '{}': {}", backend_config.name, e);
                }
            }
        }

        if registry.backends.is_empty() {
            warn!("No LLM backends configured - generation and llm categorization are unavailable");
        }

        // Explicit selection wins over the first registered backend, and
        // leaves no default when that backend was not built
        if let Some(name) = config.llm_selection.default_backend.as_deref() {
            registry.default_backend = registry.has_backend(name).then(|| name.to_string());
        }

        Ok(registry)
    }

    /// Create a backend instance from configuration
    fn create_backend(config: &LLMBackendConfig) -> anyhow::Result<Arc<dyn LLMBackend>> {
        match config.backend_type.as_str() {
            CLAUDE_CLI_BACKEND => {
                let mut aliases = ModelAliasTable::builtin();
                for alias in &config.models {
                    if !aliases.insert(alias.alias.clone(), &alias.model) {
                        anyhow::bail!(
                            "Alias '{}' targets unknown model '{}'",
                            alias.alias,
                            alias.model
                        );
                    }
                }

                let generation = GenerationConfig {
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    timeout: config.timeout,
                };

                let adapter = ClaudeCliAdapter::new(Some(generation))
                    .with_name(config.name.clone())
                    .with_executable(config.executable.clone())
                    .with_aliases(aliases)
                    .reject_tool_calls(config.reject_tool_calls);

                Ok(Arc::new(adapter))
            }
            _ => anyhow::bail!("Unsupported backend type: {}", config.backend_type),
        }
    }

    /// Add or replace a backend under its own name. The first backend
    /// registered becomes the default.
    pub fn register(&mut self, backend: Arc<dyn LLMBackend>) {
        let name = backend.name().to_string();
        if self.default_backend.is_none() {
            self.default_backend = Some(name.clone());
        }
        self.backends.insert(name, backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LLMBackend>> {
        self.backends.get(name).cloned()
    }

    /// Backend for callers that do not name one
    pub fn default_backend(&self) -> Option<Arc<dyn LLMBackend>> {
        self.default_backend.as_deref().and_then(|name| self.get(name))
    }

    /// Named backend, or the default when `name` is `None`
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn LLMBackend>, LLMError> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| LLMError::BackendUnavailable {
                backend: name.to_string(),
                hint: format!(
                    "no backend named '{}' is configured (available: {})",
                    name,
                    self.available_backends().join(", ")
                ),
            }),
            None => self.default_backend().ok_or_else(|| LLMError::BackendUnavailable {
                backend: "default".to_string(),
                hint: "no LLM backend is configured; add one under spec.llm_backends".to_string(),
            }),
        }
    }

    /// Check health of all backends, sorted by name
    pub async fn health_check_all(&self) -> BTreeMap<String, Result<(), LLMError>> {
        let mut results = BTreeMap::new();

        for (name, backend) in &self.backends {
            info!("Health checking backend: {}", name);
            results.insert(name.clone(), backend.health_check().await);
        }

        results
    }

    /// Registered backend names, sorted
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_backend(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }
}
