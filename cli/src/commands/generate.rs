// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! Generate command
//!
//! Builds a conversation from flags, a JSON file or stdin and prints the
//! backend's answer.

use anyhow::{Context, Result};
use clap::Args;
use memlink_core::domain::llm::{LLMBackend, Message, ResponseOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{load_registry, read_stdin};

#[derive(Args)]
pub struct GenerateCommand {
    /// User message. Read from stdin when neither this nor --messages is given
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// System message placed before the conversation
    #[arg(long)]
    system: Option<String>,

    /// JSON array of {"role", "content"} objects ("-" for stdin)
    #[arg(long, value_name = "FILE")]
    messages: Option<PathBuf>,

    /// Backend name from the configuration (default backend when omitted)
    #[arg(short, long)]
    backend: Option<String>,
}

pub async fn handle_command(command: GenerateCommand, config_override: Option<PathBuf>) -> Result<()> {
    let messages = build_messages(&command)?;
    let (_, registry) = load_registry(config_override)?;

    let backend = registry.resolve(command.backend.as_deref())?;
    debug!("Generating with backend '{}' ({} messages)", backend.name(), messages.len());

    let text = generate(backend.as_ref(), &messages).await?;
    println!("{}", text);

    Ok(())
}

async fn generate(backend: &dyn LLMBackend, messages: &[Message]) -> Result<String> {
    backend
        .generate_response(messages, &ResponseOptions::default())
        .await
        .with_context(|| format!("Backend '{}' failed", backend.name()))
}

fn build_messages(command: &GenerateCommand) -> Result<Vec<Message>> {
    let mut messages = Vec::new();

    if let Some(system) = &command.system {
        messages.push(Message::system(system.clone()));
    }

    if let Some(path) = &command.messages {
        let json = if path == Path::new("-") {
            read_stdin()?
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read messages from {:?}", path))?
        };
        messages.extend(parse_messages(&json)?);
    }

    match &command.prompt {
        Some(prompt) => messages.push(Message::user(prompt.clone())),
        None if command.messages.is_none() => {
            let prompt = read_stdin()?;
            messages.push(Message::user(prompt.trim_end().to_string()));
        }
        None => {}
    }

    if messages.is_empty() {
        anyhow::bail!("No messages to send. Pass a PROMPT or --messages FILE");
    }

    Ok(messages)
}

fn parse_messages(json: &str) -> Result<Vec<Message>> {
    serde_json::from_str(json).context("Messages must be a JSON array of {\"role\", \"content\"} objects")
}
