// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod categorization_service;

pub use categorization_service::{CategorizationService, LlmCategorizer, RetryPolicy};
