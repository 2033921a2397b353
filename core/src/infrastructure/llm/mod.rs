// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// LLM Backend Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain LLMBackend interface and an
// external tool. The claude CLI adapter is split into its three steps:
// transcript formatting, process invocation and response resolution.

pub mod claude_cli;
pub mod process;
pub mod registry;
pub mod transcript;

pub use claude_cli::ClaudeCliAdapter;
pub use registry::BackendRegistry;
