// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! Health command

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use super::load_registry;

pub async fn handle_command(config_override: Option<PathBuf>) -> Result<()> {
    let (_, registry) = load_registry(config_override)?;

    let results = registry.health_check_all().await;
    if results.is_empty() {
        println!("{}", "No LLM backends configured".yellow());
        return Ok(());
    }

    let mut failures = 0;
    for (name, result) in &results {
        match result {
            Ok(()) => println!("{} {}", "✓".green(), name.bold()),
            Err(e) => {
                failures += 1;
                println!("{} {}: {}", "✗".red(), name.bold(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} backends unavailable", failures, results.len());
    }

    Ok(())
}
