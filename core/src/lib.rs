// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0
//! memlink core
//!
//! LLM backend access and memory categorization for the memlink memory
//! layer.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Domain:** conversations, backend contract, model aliases, config
//! - **Application:** categorization service
//! - **Infrastructure:** claude CLI adapter and backend registry

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
