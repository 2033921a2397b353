// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0
//! LLM Backend
//!
//! Domain interface every LLM backend adapter implements, plus the
//! conversation and generation value objects that flow through it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption layer between memory logic and LLM vendors

// Implementations in infrastructure/llm/ directory.
// Callers hold an `Arc<dyn LLMBackend>` built by the BackendRegistry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Domain interface for LLM backends
#[async_trait]
pub trait LLMBackend: Send + Sync {
    /// Name this backend was registered under
    fn name(&self) -> &str;

    /// Generate a text response for an ordered conversation
    async fn generate_response(
        &self,
        messages: &[Message],
        options: &ResponseOptions,
    ) -> Result<String, LLMError>;

    /// Check if the backend is reachable without generating anything
    async fn health_check(&self) -> Result<(), LLMError>;
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    /// Any role the backends do not understand (tool, function, ...)
    #[serde(other)]
    Other,
}

/// One turn of a conversation. Position in the list is its only identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Generation parameters owned by an adapter for its whole lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// User-facing model name; adapters resolve it to a canonical identifier
    pub model: String,

    /// Maximum tokens to generate (adapter default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Kill the backend if it runs longer than this. No limit when unset.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
            timeout: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Requested output shape. Accepted for compatibility with richer backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { schema: serde_json::Value },
}

/// A function the model may ask to call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// How the model should pick among the offered tools
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    Function(String),
}

/// Per-call options for [`LLMBackend::generate_response`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    #[serde(default)]
    pub tool_choice: ToolChoice,
}

impl ResponseOptions {
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    /// Tool definitions, treating `Some(vec![])` like `None`
    pub fn tools(&self) -> Option<&[ToolDefinition]> {
        self.tools.as_deref().filter(|tools| !tools.is_empty())
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// The backend tool could not be found or launched
    #[error("{backend} is not available: {hint}")]
    BackendUnavailable { backend: String, hint: String },

    /// The backend tool ran and exited with a failure status
    #[error("backend exited with {}: {stderr}", describe_exit(.code))]
    BackendExecution { code: Option<i32>, stderr: String },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("backend did not finish within {0:?}")]
    Timeout(Duration),

    /// I/O failure while talking to a running backend process
    #[error("process error: {0}")]
    Process(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl LLMError {
    /// Whether trying the same call again could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            LLMError::BackendUnavailable { .. } | LLMError::UnsupportedFeature(_)
        )
    }
}
