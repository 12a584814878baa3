// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Input Sanitizer Domain Service
//!
//! Normalizes caller-supplied text before it reaches the feature extractor or
//! is used as a storage key. Identifiers end up in file names and history
//! records, so they are restricted to a conservative character set.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements identifier and free-text sanitization

use super::errors::ValidationError;

/// Maximum identifier length (task ids, approach ids).
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Maximum task description length after sanitization.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Input sanitizer domain service
pub struct InputSanitizer {
    max_identifier_len: usize,
    max_text_len: usize,
}

impl InputSanitizer {
    pub fn new() -> Self {
        Self {
            max_identifier_len: MAX_IDENTIFIER_LEN,
            max_text_len: MAX_DESCRIPTION_LEN,
        }
    }

    pub fn with_max_text_length(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    /// Validate an identifier: ASCII alphanumerics, `_` and `-` only.
    pub fn identifier(&self, field: &'static str, raw: &str) -> Result<String, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidIdentifier {
                field,
                reason: "empty".to_string(),
            });
        }
        if trimmed.len() > self.max_identifier_len {
            return Err(ValidationError::TooLong {
                field,
                len: trimmed.len(),
                max: self.max_identifier_len,
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(ValidationError::InvalidIdentifier {
                field,
                reason: format!("character {:?} not allowed", bad),
            });
        }
        Ok(trimmed.to_string())
    }

    /// Strip control characters, collapse whitespace and enforce the length cap.
    pub fn text(&self, field: &'static str, raw: &str) -> Result<String, ValidationError> {
        let without_controls: String = raw
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let normalized = without_controls.split_whitespace().collect::<Vec<_>>().join(" ");

        if normalized.is_empty() {
            return Err(ValidationError::MissingField(field));
        }

        let len = normalized.chars().count();
        if len > self.max_text_len {
            return Err(ValidationError::TooLong {
                field,
                len,
                max: self.max_text_len,
            });
        }
        Ok(normalized)
    }

    /// Reduce free text to a lowercase slug usable inside generated ids.
    pub fn slug(raw: &str) -> String {
        let mut slug = String::with_capacity(raw.len());
        let mut last_underscore = false;
        for c in raw.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
                last_underscore = false;
            } else if !last_underscore && !slug.is_empty() {
                slug.push('_');
                last_underscore = true;
            }
        }
        while slug.ends_with('_') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str("general");
        }
        slug
    }
}

impl Default for InputSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_accepts_safe_characters() {
        let sanitizer = InputSanitizer::new();
        assert_eq!(sanitizer.identifier("id", " task-42_a ").unwrap(), "task-42_a");
    }

    #[test]
    fn test_identifier_rejects_path_characters() {
        let sanitizer = InputSanitizer::new();
        let err = sanitizer.identifier("id", "../etc/passwd").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidIdentifier { field: "id", .. }));
    }

    #[test]
    fn test_identifier_rejects_overlong() {
        let sanitizer = InputSanitizer::new();
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(
            sanitizer.identifier("id", &long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_text_strips_controls_and_collapses_whitespace() {
        let sanitizer = InputSanitizer::new();
        let cleaned = sanitizer
            .text("description", "  Write\u{0007} a\n\n\tguide  ")
            .unwrap();
        assert_eq!(cleaned, "Write a guide");
    }

    #[test]
    fn test_text_collapses_unicode_whitespace() {
        let sanitizer = InputSanitizer::new();
        let cleaned = sanitizer
            .text("description", "\u{2003}Summarize\u{00A0}\u{00A0}the\u{2028}report\u{3000}")
            .unwrap();
        assert_eq!(cleaned, "Summarize the report");
    }

    #[test]
    fn test_text_empty_is_missing() {
        let sanitizer = InputSanitizer::new();
        assert_eq!(
            sanitizer.text("description", " \n\t "),
            Err(ValidationError::MissingField("description"))
        );
    }

    #[test]
    fn test_text_length_cap() {
        let sanitizer = InputSanitizer::new().with_max_text_length(5);
        assert!(matches!(
            sanitizer.text("description", "abcdef"),
            Err(ValidationError::TooLong { len: 6, max: 5, .. })
        ));
    }

    #[test]
    fn test_slug() {
        assert_eq!(InputSanitizer::slug("How To!"), "how_to");
        assert_eq!(InputSanitizer::slug("***"), "general");
    }
}
