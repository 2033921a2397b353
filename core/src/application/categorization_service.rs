// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0
//! Categorization Service
//!
//! Chooses how memories get their topical tags and guarantees that a
//! caller always receives a usable tag set.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Keyword or LLM-backed categorization with retry and fallback
//!
//! The LLM-backed path asks a configured backend for
//! `{"categories": [...]}` and retries transient failures with exponential
//! backoff. When every attempt fails the keyword table answers instead, so
//! categorization never surfaces an error.

use crate::domain::categorization::{
    normalize_categories, preview, KeywordCategorizer, MemoryCategorizer,
};
use crate::domain::llm::{LLMBackend, LLMError, Message, ResponseFormat, ResponseOptions};
use crate::domain::memory_config::{CategorizationConfig, CategorizationStrategy};
use crate::infrastructure::llm::BackendRegistry;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const MEMORY_CATEGORIZATION_PROMPT: &str = "\
You are a memory categorization assistant. Read the memory the user gives you \
and assign it one or more short, lower-case topical categories such as \
work, personal, preferences, health, travel, education, finance, shopping, \
entertainment or technology. Invent a new category only when none of these fit.

Respond with JSON only, in exactly this shape:
{\"categories\": [\"category1\", \"category2\"]}";

#[derive(Debug, Deserialize)]
struct MemoryCategories {
    categories: Vec<String>,
}

/// Exponential backoff between categorization attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after the given 1-based attempt fails: `2^(attempt-1)` seconds,
    /// clamped to `[min_backoff, max_backoff]`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_secs(exp)
            .max(self.min_backoff)
            .min(self.max_backoff)
    }
}

impl From<&CategorizationConfig> for RetryPolicy {
    fn from(config: &CategorizationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_backoff: config.min_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

/// Categorizer that asks an LLM backend, falling back to keywords
pub struct LlmCategorizer {
    backend: Arc<dyn LLMBackend>,
    retry: RetryPolicy,
    fallback: KeywordCategorizer,
}

impl LlmCategorizer {
    pub fn new(backend: Arc<dyn LLMBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            fallback: KeywordCategorizer::new(),
        }
    }

    /// One request to the backend, without retry or fallback
    pub async fn request_categories(&self, memory: &str) -> Result<BTreeSet<String>, LLMError> {
        let messages = [
            Message::system(MEMORY_CATEGORIZATION_PROMPT),
            Message::user(memory),
        ];
        let options = ResponseOptions::default().with_response_format(ResponseFormat::JsonObject);

        let text = self.backend.generate_response(&messages, &options).await?;
        parse_categories(&text)
    }
}

#[async_trait]
impl MemoryCategorizer for LlmCategorizer {
    async fn categorize(&self, memory: &str) -> BTreeSet<String> {
        if memory.trim().is_empty() {
            return self.fallback.categorize(memory);
        }

        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            match self.request_categories(memory).await {
                Ok(categories) => {
                    info!(
                        "LLM categorization for '{}' via {}: {:?}",
                        preview(memory),
                        self.backend.name(),
                        categories
                    );
                    return categories;
                }
                Err(e) => {
                    warn!(
                        "Categorization attempt {}/{} failed: {}",
                        attempt, self.retry.max_attempts, e
                    );
                    let retryable = e.is_retryable();
                    last_error = Some(e);

                    if !retryable {
                        break;
                    }
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            error!("Error in categorization, using keyword table: {}", e);
        }
        self.fallback.categorize(memory)
    }
}

/// Parse `{"categories": [...]}`, optionally wrapped in a markdown code
/// block or surrounded by prose.
pub fn parse_categories(text: &str) -> Result<BTreeSet<String>, LLMError> {
    let json = extract_json(text).unwrap_or_else(|| text.trim().to_string());

    let parsed: MemoryCategories = serde_json::from_str(&json)
        .map_err(|e| LLMError::InvalidResponse(format!("expected categories JSON ({}): {}", e, json)))?;

    Ok(normalize_categories(parsed.categories))
}

fn extract_json(text: &str) -> Option<String> {
    for marker in ["```json", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end_offset) = text[content_start..].find("```") {
                let content_end = content_start + end_offset;
                return Some(text[content_start..content_end].trim().to_string());
            }
        }
    }

    // Bare object embedded in prose
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text[start..=end].to_string())
}

/// Configured categorization strategy behind a single entry point
pub struct CategorizationService {
    strategy: CategorizationStrategy,
    categorizer: Arc<dyn MemoryCategorizer>,
}

impl CategorizationService {
    pub fn new(strategy: CategorizationStrategy, categorizer: Arc<dyn MemoryCategorizer>) -> Self {
        Self {
            strategy,
            categorizer,
        }
    }

    pub fn keyword() -> Self {
        Self::new(CategorizationStrategy::Keyword, Arc::new(KeywordCategorizer::new()))
    }

    /// Build the configured strategy. An `llm` strategy whose backend is not
    /// registered degrades to keyword matching.
    pub fn from_config(config: &CategorizationConfig, registry: &BackendRegistry) -> Self {
        match config.strategy {
            CategorizationStrategy::Keyword => Self::keyword(),
            CategorizationStrategy::Llm => match registry.resolve(config.backend.as_deref()) {
                Ok(backend) => {
                    debug!("Categorizing memories with backend '{}'", backend.name());
                    Self::new(
                        CategorizationStrategy::Llm,
                        Arc::new(LlmCategorizer::new(backend, RetryPolicy::from(config))),
                    )
                }
                Err(e) => {
                    warn!("LLM categorization unavailable ({}); using keyword table", e);
                    Self::keyword()
                }
            },
        }
    }

    pub fn strategy(&self) -> CategorizationStrategy {
        self.strategy
    }

    pub async fn categorize(&self, memory: &str) -> BTreeSet<String> {
        self.categorizer.categorize(memory).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::categorization::default_categories;
    use crate::domain::memory_config::MemoryConfigSpec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend that replays scripted results and counts calls
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, LLMError>>>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(mut replies: Vec<Result<String, LLMError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_response(
            &self,
            messages: &[Message],
            options: &ResponseOptions,
        ) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(messages.len(), 2);
            assert_eq!(options.response_format, Some(ResponseFormat::JsonObject));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LLMError::Process("script exhausted".to_string())))
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            Ok(())
        }
    }

    fn retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn execution_error() -> LLMError {
        LLMError::BackendExecution {
            code: Some(1),
            stderr: "rate limited".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_clamped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            min_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(15),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(5), Duration::from_secs(15));
        assert_eq!(policy.delay_after(200), Duration::from_secs(15));
        assert_eq!(RetryPolicy::none().delay_after(3), Duration::ZERO);
    }

    #[test]
    fn test_parse_categories_variants() {
        assert_eq!(
            parse_categories(r#"{"categories": ["Work", " travel "]}"#).unwrap(),
            tags(&["travel", "work"])
        );
        assert_eq!(
            parse_categories("```json\n{\"categories\": [\"health\"]}\n```").unwrap(),
            tags(&["health"])
        );
        assert_eq!(
            parse_categories("Sure! {\"categories\": [\"finance\"]} Hope that helps.").unwrap(),
            tags(&["finance"])
        );
        assert_eq!(
            parse_categories(r#"{"categories": []}"#).unwrap(),
            default_categories()
        );
        assert!(matches!(
            parse_categories("no json here"),
            Err(LLMError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_answer_is_used() {
        let backend = ScriptedBackend::new(vec![Ok(r#"{"categories": ["hobbies"]}"#.to_string())]);
        let categorizer = LlmCategorizer::new(backend.clone(), retry(3));

        assert_eq!(categorizer.categorize("I paint on weekends").await, tags(&["hobbies"]));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let backend = ScriptedBackend::new(vec![
            Err(execution_error()),
            Ok("not json".to_string()),
            Ok(r#"{"categories": ["travel"]}"#.to_string()),
        ]);
        let categorizer = LlmCategorizer::new(backend.clone(), retry(3));

        assert_eq!(categorizer.categorize("Flying to Lisbon").await, tags(&["travel"]));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_keywords_after_exhausting_attempts() {
        let backend = ScriptedBackend::new(vec![Err(execution_error()), Err(execution_error())]);
        let categorizer = LlmCategorizer::new(backend.clone(), retry(2));

        let categories = categorizer.categorize("Team meeting about the budget").await;
        assert_eq!(categories, tags(&["finance", "work"]));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_not_retried() {
        let backend = ScriptedBackend::new(vec![Err(LLMError::BackendUnavailable {
            backend: "claude".to_string(),
            hint: "install it".to_string(),
        })]);
        let categorizer = LlmCategorizer::new(backend.clone(), retry(3));

        assert_eq!(categorizer.categorize("zzz").await, default_categories());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_memory_skips_backend() {
        let backend = ScriptedBackend::new(vec![]);
        let categorizer = LlmCategorizer::new(backend.clone(), retry(3));

        assert_eq!(categorizer.categorize("   ").await, default_categories());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_service_from_config() {
        let mut spec = MemoryConfigSpec::default();
        let registry = BackendRegistry::from_config(&spec).unwrap();

        let service = CategorizationService::from_config(&spec.categorization, &registry);
        assert_eq!(service.strategy(), CategorizationStrategy::Keyword);
        assert!(service.categorize("new job at the company").await.contains("work"));

        spec.categorization.strategy = CategorizationStrategy::Llm;
        let service = CategorizationService::from_config(&spec.categorization, &registry);
        assert_eq!(service.strategy(), CategorizationStrategy::Llm);

        spec.categorization.backend = Some("missing".to_string());
        let service = CategorizationService::from_config(&spec.categorization, &registry);
        assert_eq!(service.strategy(), CategorizationStrategy::Keyword);
    }
}
