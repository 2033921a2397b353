// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! Categorize command

use anyhow::Result;
use clap::Args;
use memlink_core::application::CategorizationService;
use memlink_core::domain::memory_config::CategorizationStrategy;
use std::path::PathBuf;

use super::{load_registry, read_stdin};

#[derive(Args)]
pub struct CategorizeCommand {
    /// Memory text (read from stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Override the configured strategy (keyword, llm)
    #[arg(long)]
    strategy: Option<CategorizationStrategy>,

    /// Print a JSON array instead of one tag per line
    #[arg(long)]
    json: bool,
}

pub async fn handle_command(command: CategorizeCommand, config_override: Option<PathBuf>) -> Result<()> {
    let memory = if command.text.is_empty() {
        read_stdin()?
    } else {
        command.text.join(" ")
    };

    let (config, registry) = load_registry(config_override)?;

    let mut categorization = config.spec.categorization.clone();
    if let Some(strategy) = command.strategy {
        categorization.strategy = strategy;
    }

    let service = CategorizationService::from_config(&categorization, &registry);
    let categories = service.categorize(memory.trim()).await;

    if command.json {
        println!("{}", serde_json::to_string(&categories)?);
    } else {
        for category in &categories {
            println!("{}", category);
        }
    }

    Ok(())
}
