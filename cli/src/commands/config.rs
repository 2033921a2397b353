// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use memlink_core::domain::memory_config::MemoryConfigManifest;
use memlink_core::domain::model_alias::ModelAliasTable;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./memlink-config.yaml)
        #[arg(short, long, default_value = "./memlink-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Write the effective configuration (file, defaults and
        /// environment overrides) instead of a sample
        #[arg(long, conflicts_with = "examples")]
        resolved: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate {
            output,
            examples,
            resolved,
            force,
        } => {
            if output.exists() && !force {
                anyhow::bail!("{:?} already exists (use --force to overwrite)", output);
            }
            if resolved {
                write_resolved(config_override, &output)
            } else {
                generate(output, examples).await
            }
        }
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = MemoryConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        for (i, path) in MemoryConfigManifest::search_paths().iter().enumerate() {
            let marker = if path.exists() { "found".green() } else { "missing".dimmed() };
            println!("  {}. {} ({})", i + 1, path.display(), marker);
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "LLM Backends:".bold());
    for backend in &config.spec.llm_backends {
        let state = if backend.enabled { "enabled".green() } else { "disabled".dimmed() };
        println!("  {} ({}, {})", backend.name.bold(), backend.backend_type, state);
        println!("    Executable: {}", backend.executable);

        let mut aliases = ModelAliasTable::builtin();
        for alias in &backend.models {
            aliases.insert(alias.alias.clone(), &alias.model);
        }
        println!("    Model: {} → {}", backend.model, aliases.resolve(&backend.model));

        if let Some(max_tokens) = backend.max_tokens {
            println!("    Max tokens: {}", max_tokens);
        }
        if let Some(temperature) = backend.temperature {
            println!("    Temperature: {}", temperature);
        }
        if let Some(timeout) = backend.timeout {
            println!("    Timeout: {:?}", timeout);
        }
        println!("    Aliases:");
        for alias in aliases.aliases() {
            println!("      - {} → {}", alias, aliases.resolve(alias));
        }
    }
    println!();

    println!("{}", "LLM Selection:".bold());
    println!(
        "  Default backend: {}",
        config.default_backend_name().unwrap_or("(none)")
    );
    println!();

    let categorization = &config.spec.categorization;
    println!("{}", "Categorization:".bold());
    println!("  Strategy: {:?}", categorization.strategy);
    if let Some(backend) = &categorization.backend {
        println!("  Backend: {}", backend);
    }
    println!(
        "  Attempts: {} (backoff {:?}..{:?})",
        categorization.max_attempts, categorization.min_backoff, categorization.max_backoff
    );

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = MemoryConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn write_resolved(config_override: Option<PathBuf>, output: &Path) -> Result<()> {
    let config = MemoryConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    config
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Effective configuration written: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let manifest = MemoryConfigManifest::from_yaml_str(template).unwrap();
            manifest.validate().unwrap();
        }
    }

    #[test]
    fn test_resolved_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.yaml");
        std::fs::write(&source, include_str!("../../templates/config-with-examples.yaml")).unwrap();
        let output = dir.path().join("resolved.yaml");

        write_resolved(Some(source), &output).unwrap();

        let written = MemoryConfigManifest::from_yaml_file(&output).unwrap();
        written.validate().unwrap();
        assert_eq!(written.spec.llm_backends.len(), 2);
        assert_eq!(written.spec.llm_backends[0].models[0].alias, "smart");
        assert_eq!(written.default_backend_name(), Some("claude"));
    }
}
