// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// Claude CLI Backend Adapter
//
// Anti-Corruption Layer for the `claude` command-line assistant.
// Formats the conversation, runs the CLI once per call and returns its
// trimmed stdout.

use super::process::{InvocationResult, ProcessInvoker};
use super::transcript::format_transcript;
use crate::domain::llm::{
    GenerationConfig, LLMBackend, LLMError, Message, ResponseOptions, ToolDefinition,
};
use crate::domain::model_alias::{ModelAliasTable, DEFAULT_MODEL};
use async_trait::async_trait;
use tracing::debug;

pub const DEFAULT_EXECUTABLE: &str = "claude";

pub struct ClaudeCliAdapter {
    name: String,
    config: GenerationConfig,
    invoker: ProcessInvoker,
    reject_tool_calls: bool,
}

impl ClaudeCliAdapter {
    /// Adapter for the `claude` executable on PATH. A missing or empty model
    /// becomes the mid-tier default.
    pub fn new(config: Option<GenerationConfig>) -> Self {
        let mut config = config.unwrap_or_else(|| GenerationConfig::new(DEFAULT_MODEL));
        if config.model.trim().is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Self {
            name: DEFAULT_EXECUTABLE.to_string(),
            config,
            invoker: ProcessInvoker::new(DEFAULT_EXECUTABLE, ModelAliasTable::builtin()),
            reject_tool_calls: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Run a different executable (name on PATH or full path)
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        let aliases = self.invoker.aliases().clone();
        self.invoker = ProcessInvoker::new(executable, aliases);
        self
    }

    pub fn with_aliases(mut self, aliases: ModelAliasTable) -> Self {
        let executable = self.invoker.executable().to_string();
        self.invoker = ProcessInvoker::new(executable, aliases);
        self
    }

    /// Fail with `UnsupportedFeature` when a request offers tools
    pub fn reject_tool_calls(mut self, reject: bool) -> Self {
        self.reject_tool_calls = reject;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Canonical model identifier the CLI will be started with
    pub fn resolved_model(&self) -> &'static str {
        self.invoker.aliases().resolve(&self.config.model)
    }

    pub fn executable(&self) -> &str {
        self.invoker.executable()
    }
}

/// Pick the final text out of a finished invocation.
///
/// Tool-call extraction is not implemented: offered tools are ignored unless
/// `reject_tools` is set, in which case they are refused.
pub fn resolve_response(
    result: InvocationResult,
    tools: Option<&[ToolDefinition]>,
    reject_tools: bool,
) -> Result<String, LLMError> {
    if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
        if reject_tools {
            return Err(tools_refused(tools.len()));
        }
        debug!("Ignoring {} tool definitions; returning plain text", tools.len());
    }

    Ok(result.stdout.trim().to_string())
}

fn tools_refused(count: usize) -> LLMError {
    LLMError::UnsupportedFeature(format!(
        "tool calling is not supported by the claude CLI backend ({} tools offered)",
        count
    ))
}

#[async_trait]
impl LLMBackend for ClaudeCliAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_response(
        &self,
        messages: &[Message],
        options: &ResponseOptions,
    ) -> Result<String, LLMError> {
        // Refuse before spending a process on a request we will reject anyway
        if self.reject_tool_calls {
            if let Some(tools) = options.tools() {
                return Err(tools_refused(tools.len()));
            }
        }

        if let Some(format) = &options.response_format {
            debug!("response_format {:?} is not supported by {}; ignoring", format, self.name);
        }
        debug!("tool_choice {:?} ignored by {}", options.tool_choice, self.name);

        let transcript = format_transcript(messages);
        let result = self.invoker.invoke(&transcript, &self.config).await?;

        resolve_response(result, options.tools(), self.reject_tool_calls)
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let path = self.invoker.locate()?;
        debug!("{} resolved to {:?}", self.name, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ToolChoice;

    fn output(stdout: &str) -> InvocationResult {
        InvocationResult {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn tool() -> ToolDefinition {
        ToolDefinition {
            name: "lookup".to_string(),
            description: None,
            parameters: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(resolve_response(output("  hello\n"), None, false).unwrap(), "hello");
    }

    #[test]
    fn test_resolve_passes_tools_through() {
        let tools = vec![tool()];
        let text = resolve_response(output("plain\n"), Some(tools.as_slice()), false).unwrap();
        assert_eq!(text, "plain");
    }

    #[test]
    fn test_resolve_can_refuse_tools() {
        let tools = vec![tool()];
        assert!(matches!(
            resolve_response(output("x"), Some(tools.as_slice()), true),
            Err(LLMError::UnsupportedFeature(_))
        ));
        // An empty list is not a tool request
        assert!(resolve_response(output("x"), Some(&[][..]), true).is_ok());
    }

    #[test]
    fn test_default_model_is_sonnet() {
        let adapter = ClaudeCliAdapter::new(None);
        assert_eq!(adapter.config().model, "sonnet");
        assert_eq!(adapter.resolved_model(), "sonnet");
        assert_eq!(adapter.executable(), "claude");
        assert_eq!(adapter.name(), "claude");

        let adapter = ClaudeCliAdapter::new(Some(GenerationConfig::new("")));
        assert_eq!(adapter.config().model, "sonnet");
    }

    #[test]
    fn test_custom_aliases_survive_executable_change() {
        let mut aliases = ModelAliasTable::builtin();
        aliases.insert("smart", "opus");

        let adapter = ClaudeCliAdapter::new(Some(GenerationConfig::new("smart")))
            .with_aliases(aliases)
            .with_executable("/opt/claude/bin/claude");

        assert_eq!(adapter.resolved_model(), "opus");
        assert_eq!(adapter.executable(), "/opt/claude/bin/claude");
    }

    #[tokio::test]
    async fn test_rejected_tools_never_spawn() {
        let adapter = ClaudeCliAdapter::new(None)
            .with_executable("memlink-definitely-not-installed-cli")
            .reject_tool_calls(true);

        let options = ResponseOptions::default()
            .with_tools(vec![tool()])
            .with_tool_choice(ToolChoice::Required);

        let err = adapter
            .generate_response(&[Message::user("hi")], &options)
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::UnsupportedFeature(_)));
    }
}
