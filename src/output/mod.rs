// Output formatting — the hot-topics line and terminal display.

pub mod terminal;

use crate::auth::UserInfo;
use crate::topics::aggregator::AggregationResult;

/// Join ranked topic names into a display line ("b, a, c").
///
/// Empty when no entry in the window carried entities.
pub fn render_topic_line(result: &AggregationResult) -> String {
    if !result.has_entities {
        return String::new();
    }
    result.topic_names().join(", ")
}

/// Holds the topic line currently on screen.
///
/// Each result replaces the line outright; a window without entities blanks
/// it instead of leaving the previous topics up.
#[derive(Debug, Default)]
pub struct TopicBoard {
    line: String,
}

impl TopicBoard {
    /// Apply a new result. Returns whether the displayed line changed.
    pub fn apply(&mut self, result: &AggregationResult) -> bool {
        let line = render_topic_line(result);
        if line == self.line {
            return false;
        }
        self.line = line;
        true
    }

    /// Like `apply`, but a signed-out viewer always sees a blank line.
    pub fn apply_for(&mut self, user: Option<&UserInfo>, result: &AggregationResult) -> bool {
        match user {
            Some(_) => self.apply(result),
            None => self.apply(&AggregationResult::default()),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Respects UTF-8 character boundaries, so it never panics on emoji or
/// accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
