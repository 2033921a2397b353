// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// Backend Process Invoker
//
// Runs one `<tool> chat ...` process per call: transcript on stdin,
// generated text on stdout, diagnostics on stderr.

use crate::domain::llm::{GenerationConfig, LLMError};
use crate::domain::model_alias::ModelAliasTable;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Token limit passed when the config leaves it unset
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Remediation shown when the CLI cannot be found
pub const INSTALL_HINT: &str =
    "Please install it with: npm install -g @anthropic-ai/claude-code";

/// Captured outcome of one backend process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub struct ProcessInvoker {
    executable: String,
    aliases: ModelAliasTable,
}

impl ProcessInvoker {
    pub fn new(executable: impl Into<String>, aliases: ModelAliasTable) -> Self {
        Self {
            executable: executable.into(),
            aliases,
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn aliases(&self) -> &ModelAliasTable {
        &self.aliases
    }

    /// Arguments after the executable:
    /// `chat --model <canonical> --max-tokens <n> [--temperature <t>]`
    pub fn build_args(&self, config: &GenerationConfig) -> Vec<String> {
        let max_tokens = config
            .max_tokens
            .filter(|tokens| *tokens > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let model = self.aliases.resolve(&config.model);
        if !self.aliases.contains(&config.model) {
            debug!("Unknown model '{}', falling back to {}", config.model, model);
        }

        let mut args = vec![
            "chat".to_string(),
            "--model".to_string(),
            model.to_string(),
            "--max-tokens".to_string(),
            max_tokens.to_string(),
        ];

        if let Some(temperature) = config.temperature {
            args.push("--temperature".to_string());
            args.push(temperature.to_string());
        }

        args
    }

    /// Resolve the executable on PATH (or as a literal path)
    pub fn locate(&self) -> Result<PathBuf, LLMError> {
        which::which(&self.executable).map_err(|e| self.unavailable(format!(
            "{} CLI not found ({}). {}",
            self.executable, e, INSTALL_HINT
        )))
    }

    /// Run the backend to completion.
    ///
    /// Fails with `BackendUnavailable` when the process cannot be started,
    /// `BackendExecution` when it exits non-zero, and `Timeout` when
    /// `config.timeout` elapses first (the process is killed).
    pub async fn invoke(
        &self,
        transcript: &str,
        config: &GenerationConfig,
    ) -> Result<InvocationResult, LLMError> {
        let args = self.build_args(config);
        debug!("Launching backend: {} {}", self.executable, args.join(" "));

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LLMError::Process("backend stdin was not captured".to_string()))?;

        // Feed stdin from its own task so a chatty backend cannot fill the
        // stdout pipe while we are still writing.
        let input = transcript.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let waited = match config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    writer.abort();
                    warn!("Backend {} exceeded {:?}, killed", self.executable, limit);
                    return Err(LLMError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited
            .map_err(|e| LLMError::Process(format!("failed to wait for backend: {}", e)))?;

        let write_result = writer
            .await
            .map_err(|e| LLMError::Process(format!("stdin writer task failed: {}", e)))?;

        let result = InvocationResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(LLMError::BackendExecution {
                code: result.code,
                stderr: result.stderr,
            });
        }

        // A backend that succeeds without reading all of stdin closes the
        // pipe early; only other write failures matter.
        if let Err(e) = write_result {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(LLMError::Process(format!(
                    "failed to write transcript to backend: {}",
                    e
                )));
            }
        }

        if !result.stderr.trim().is_empty() {
            warn!("{} CLI warning: {}", self.executable, result.stderr.trim());
        }

        Ok(result)
    }

    fn launch_error(&self, err: std::io::Error) -> LLMError {
        match err.kind() {
            ErrorKind::NotFound => self.unavailable(format!(
                "{} CLI not found. {}",
                self.executable, INSTALL_HINT
            )),
            ErrorKind::PermissionDenied => self.unavailable(format!(
                "{} is not executable ({}). Check its permissions or reinstall. {}",
                self.executable, err, INSTALL_HINT
            )),
            _ => self.unavailable(format!(
                "failed to launch {} ({}). {}",
                self.executable, err, INSTALL_HINT
            )),
        }
    }

    fn unavailable(&self, hint: String) -> LLMError {
        LLMError::BackendUnavailable {
            backend: self.executable.clone(),
            hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker() -> ProcessInvoker {
        ProcessInvoker::new("claude", ModelAliasTable::builtin())
    }

    #[test]
    fn test_args_with_defaults() {
        let args = invoker().build_args(&GenerationConfig::new("claude-opus"));
        assert_eq!(args, vec!["chat", "--model", "opus", "--max-tokens", "2000"]);
    }

    #[test]
    fn test_args_with_temperature() {
        let config = GenerationConfig::new("gpt-4")
            .with_max_tokens(512)
            .with_temperature(0.7);
        let args = invoker().build_args(&config);
        assert_eq!(
            args,
            vec!["chat", "--model", "sonnet", "--max-tokens", "512", "--temperature", "0.7"]
        );
    }

    #[test]
    fn test_zero_temperature_is_passed_through() {
        let args = invoker().build_args(&GenerationConfig::new("opus").with_temperature(0.0));
        assert_eq!(&args[5..], &["--temperature", "0"]);
    }

    #[test]
    fn test_zero_max_tokens_falls_back_to_default() {
        let args = invoker().build_args(&GenerationConfig::new("opus").with_max_tokens(0));
        assert_eq!(args[4], "2000");
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let invoker = ProcessInvoker::new(
            "memlink-definitely-not-installed-cli",
            ModelAliasTable::builtin(),
        );

        match invoker.invoke("Human: hi", &GenerationConfig::new("sonnet")).await {
            Err(LLMError::BackendUnavailable { backend, hint }) => {
                assert_eq!(backend, "memlink-definitely-not-installed-cli");
                assert!(hint.contains("npm install -g @anthropic-ai/claude-code"));
            }
            other => panic!("expected BackendUnavailable, got {:?}", other),
        }

        assert!(matches!(
            invoker.locate(),
            Err(LLMError::BackendUnavailable { .. })
        ));
    }
}
