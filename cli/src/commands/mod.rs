// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for memlink CLI

pub mod categorize;
pub mod config;
pub mod generate;
pub mod health;

pub use self::categorize::CategorizeCommand;
pub use self::config::ConfigCommand;
pub use self::generate::GenerateCommand;

use anyhow::{Context, Result};
use memlink_core::domain::memory_config::MemoryConfigManifest;
use memlink_core::infrastructure::llm::BackendRegistry;
use std::io::Read;
use std::path::PathBuf;

/// Load configuration and build the backend registry from it
pub(crate) fn load_registry(
    config_override: Option<PathBuf>,
) -> Result<(MemoryConfigManifest, BackendRegistry)> {
    let config = MemoryConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    let registry = BackendRegistry::from_config(&config.spec)
        .context("Failed to initialize LLM backends")?;
    Ok((config, registry))
}

/// Read all of stdin as UTF-8
pub(crate) fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    Ok(input)
}
