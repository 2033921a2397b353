// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Backend-agnostic types: conversations, LLM errors, model aliases,
//! categorization and configuration.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer

pub mod categorization;
pub mod llm;
pub mod memory_config;
pub mod model_alias;
