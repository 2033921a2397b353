// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0
//! Categorization
//!
//! Topical tags for stored memories.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Categorizer contract and the static keyword categorizer

use async_trait::async_trait;
use std::collections::BTreeSet;

/// Tag assigned when nothing more specific applies
pub const DEFAULT_CATEGORY: &str = "general";

/// Assigns topical tags to a memory.
///
/// Categorization never fails from the caller's point of view: every
/// implementation degrades to [`default_categories`] instead of returning
/// an error.
#[async_trait]
pub trait MemoryCategorizer: Send + Sync {
    async fn categorize(&self, memory: &str) -> BTreeSet<String>;
}

/// `{"general"}`
pub fn default_categories() -> BTreeSet<String> {
    BTreeSet::from([DEFAULT_CATEGORY.to_string()])
}

/// Lower-cases and trims tags, dropping empty ones. Falls back to
/// [`default_categories`] when nothing is left.
pub fn normalize_categories<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tags: BTreeSet<String> = tags
        .into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();

    if tags.is_empty() {
        default_categories()
    } else {
        tags
    }
}

/// Category -> keywords. A memory gets a category when its lower-cased text
/// contains any of the keywords as a substring.
pub const KEYWORD_TABLE: &[(&str, &[&str])] = &[
    ("work", &["work", "job", "office", "meeting", "project", "company"]),
    ("personal", &["family", "friend", "personal", "home"]),
    ("preferences", &["like", "prefer", "favorite", "love", "hate", "dislike"]),
    ("health", &["health", "exercise", "diet", "sleep", "medical"]),
    ("travel", &["travel", "trip", "vacation", "visit"]),
    ("education", &["learn", "study", "course", "education", "school"]),
    ("finance", &["money", "finance", "budget", "expense", "income"]),
    ("shopping", &["buy", "shop", "purchase", "order"]),
    ("entertainment", &["movie", "music", "book", "game", "entertainment"]),
    ("technology", &["ai", "technology", "code", "programming", "tech"]),
];

/// Static keyword-table categorizer. Pure and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordCategorizer;

impl KeywordCategorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn categorize(&self, memory: &str) -> BTreeSet<String> {
        let lowered = memory.to_lowercase();

        let matched = KEYWORD_TABLE
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(category, _)| *category);

        let categories = normalize_categories(matched);
        tracing::info!(
            "Keyword categorization for '{}': {:?}",
            preview(memory),
            categories
        );
        categories
    }
}

#[async_trait]
impl MemoryCategorizer for KeywordCategorizer {
    async fn categorize(&self, memory: &str) -> BTreeSet<String> {
        KeywordCategorizer::categorize(self, memory)
    }
}

/// First 50 characters of a memory, for log lines
pub(crate) fn preview(memory: &str) -> String {
    let mut chars = memory.chars();
    let head: String = chars.by_ref().take(50).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_movie_preference_is_tagged() {
        let categories = KeywordCategorizer::new().categorize("I love this movie, great entertainment");
        assert!(categories.contains("preferences"));
        assert!(categories.contains("entertainment"));
        assert!(!categories.contains(DEFAULT_CATEGORY));
    }

    #[test]
    fn test_empty_text_is_general() {
        assert_eq!(KeywordCategorizer::new().categorize(""), default_categories());
    }

    #[test]
    fn test_unmatched_text_is_general() {
        assert_eq!(
            KeywordCategorizer::new().categorize("xyz qrs"),
            tags(&["general"])
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let categories = KeywordCategorizer::new().categorize("Planning a TRIP with my FAMILY");
        assert_eq!(categories, tags(&["personal", "travel"]));
    }

    #[test]
    fn test_keywords_match_inside_words() {
        // "homework" contains both "home" and "work"
        let categories = KeywordCategorizer::new().categorize("homework");
        assert_eq!(categories, tags(&["personal", "work"]));
    }

    #[test]
    fn test_odd_input_never_panics() {
        let categorizer = KeywordCategorizer::new();
        for input in ["\0\0", "   ", "💾🧠", "İstanbul", "\u{FFFD}\n\t"] {
            assert!(!categorizer.categorize(input).is_empty());
        }
    }

    #[test]
    fn test_normalize_categories() {
        assert_eq!(
            normalize_categories(["  Work ", "work", "", "Travel"]),
            tags(&["travel", "work"])
        );
        assert_eq!(normalize_categories(Vec::<String>::new()), default_categories());
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(80);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(50)));
        assert_eq!(preview("short"), "short");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_assigned_tags_are_logged_at_info() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            KeywordCategorizer::new().categorize("Booked a trip to Rome");
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"), "{output}");
        assert!(output.contains("Keyword categorization for 'Booked a trip to Rome'"), "{output}");
        assert!(output.contains("travel"), "{output}");
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let categorizer: Box<dyn MemoryCategorizer> = Box::new(KeywordCategorizer::new());
        let categories = categorizer.categorize("budget for the new laptop order").await;
        assert_eq!(categories, tags(&["finance", "shopping"]));
    }
}
