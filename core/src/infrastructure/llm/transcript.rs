// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

// Transcript Formatting
//
// Flattens a role-tagged conversation into the single prompt text the
// claude CLI reads from stdin.

use crate::domain::llm::{Message, Role};

const SEPARATOR: &str = "\n\n";

fn label(role: Role) -> Option<&'static str> {
    match role {
        Role::System => Some("System"),
        Role::User => Some("Human"),
        Role::Assistant => Some("Assistant"),
        Role::Other => None,
    }
}

/// Render `messages` as `"<Label>: <content>"` entries joined by a blank line.
///
/// Messages with a role the CLI has no label for are dropped. Content is
/// not escaped.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(|msg| label(msg.role).map(|label| format!("{}: {}", label, msg.content)))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_and_user() {
        let messages = vec![Message::system("Be terse"), Message::user("Hi")];
        assert_eq!(format_transcript(&messages), "System: Be terse\n\nHuman: Hi");
    }

    #[test]
    fn test_preserves_order_and_drops_unknown_roles() {
        let messages = vec![
            Message::user("one"),
            Message::new(Role::Other, "tool output"),
            Message::assistant("two"),
            Message::user("three"),
        ];
        assert_eq!(
            format_transcript(&messages),
            "Human: one\n\nAssistant: two\n\nHuman: three"
        );
    }

    #[test]
    fn test_content_is_verbatim() {
        let messages = vec![Message::user("line 1\n\nHuman: not a turn\t!")];
        assert_eq!(
            format_transcript(&messages),
            "Human: line 1\n\nHuman: not a turn\t!"
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(format_transcript(&[]), "");
        assert_eq!(format_transcript(&[Message::new(Role::Other, "x")]), "");
        assert_eq!(format_transcript(&[Message::user("")]), "Human: ");
    }
}
