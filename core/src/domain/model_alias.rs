// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// Model Alias Resolution
//
// Maps user-facing model names onto the small set of identifiers the
// claude CLI accepts. Unknown names resolve to DEFAULT_MODEL.

use std::collections::HashMap;

/// Identifiers accepted by `claude chat --model`
pub const CANONICAL_MODELS: &[&str] = &["opus", "sonnet"];

/// Mid-tier model, used when nothing else is configured or recognised
pub const DEFAULT_MODEL: &str = "sonnet";

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("opus", "opus"),
    ("claude-opus", "opus"),
    ("claude-4-opus", "opus"),
    ("sonnet", "sonnet"),
    ("claude-sonnet", "sonnet"),
    ("claude-4-sonnet", "sonnet"),
];

pub fn is_canonical_model(model: &str) -> bool {
    CANONICAL_MODELS.contains(&model)
}

/// Alias -> canonical identifier. Every value is a member of
/// [`CANONICAL_MODELS`].
#[derive(Debug, Clone)]
pub struct ModelAliasTable {
    aliases: HashMap<String, &'static str>,
}

impl Default for ModelAliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelAliasTable {
    pub fn builtin() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(alias, model)| (alias.to_string(), *model))
            .collect();
        Self { aliases }
    }

    /// Add an alias. Returns `false` (and leaves the table untouched) when
    /// `model` is not a canonical identifier.
    pub fn insert(&mut self, alias: impl Into<String>, model: &str) -> bool {
        match CANONICAL_MODELS.iter().find(|canonical| **canonical == model) {
            Some(canonical) => {
                self.aliases.insert(alias.into(), canonical);
                true
            }
            None => false,
        }
    }

    /// Canonical identifier for `alias`, or [`DEFAULT_MODEL`] when unknown
    pub fn resolve(&self, alias: &str) -> &'static str {
        self.aliases.get(alias).copied().unwrap_or(DEFAULT_MODEL)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Known aliases, sorted
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_aliases() {
        let table = ModelAliasTable::builtin();
        assert_eq!(table.resolve("claude-opus"), "opus");
        assert_eq!(table.resolve("claude-4-opus"), "opus");
        assert_eq!(table.resolve("claude-sonnet"), "sonnet");
        assert_eq!(table.resolve("opus"), "opus");
    }

    #[test]
    fn test_unknown_alias_uses_default() {
        let table = ModelAliasTable::builtin();
        assert_eq!(table.resolve("gpt-4"), DEFAULT_MODEL);
        assert_eq!(table.resolve(""), DEFAULT_MODEL);
        // Lookup is exact
        assert_eq!(table.resolve("OPUS"), DEFAULT_MODEL);
    }

    #[test]
    fn test_every_value_is_canonical() {
        let table = ModelAliasTable::builtin();
        for alias in table.aliases() {
            assert!(is_canonical_model(table.resolve(alias)), "{alias}");
        }
    }

    #[test]
    fn test_insert_rejects_non_canonical_target() {
        let mut table = ModelAliasTable::builtin();
        assert!(table.insert("smart", "opus"));
        assert_eq!(table.resolve("smart"), "opus");

        assert!(!table.insert("fast", "gpt-4o-mini"));
        assert!(!table.contains("fast"));
    }
}
