//! Key Search Module
//!
//! Glob and regex patterns used to select keys in a store.

use glob::Pattern;
use regex::Regex;

use crate::error::{CacheError, Result};

// == Key Pattern ==
/// A compiled key filter.
///
/// Globs must match the whole key. Regexes are anchored at the start of the
/// key only, so `user_\d` also matches `user_1_backup`.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Matches every key
    Any,
    Glob(Pattern),
    Regex(Regex),
}

impl KeyPattern {
    /// Compiles `pattern` as a regex when `regex` is set, else as a glob.
    ///
    /// An empty pattern matches every key.
    pub fn parse(pattern: &str, regex: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(KeyPattern::Any);
        }

        if regex {
            Regex::new(&format!("^(?:{})", pattern))
                .map(KeyPattern::Regex)
                .map_err(|err| CacheError::InvalidPattern(format!("'{}': {}", pattern, err)))
        } else {
            Pattern::new(pattern)
                .map(KeyPattern::Glob)
                .map_err(|err| CacheError::InvalidPattern(format!("'{}': {}", pattern, err)))
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Any => true,
            KeyPattern::Glob(pattern) => pattern.matches(key),
            KeyPattern::Regex(regex) => regex.is_match(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_matches_whole_key() {
        let pattern = KeyPattern::parse("user_*", false).unwrap();

        assert!(pattern.matches("user_1"));
        assert!(pattern.matches("user_"));
        assert!(!pattern.matches("admin_user_1"));
    }

    #[test]
    fn test_glob_character_classes() {
        let pattern = KeyPattern::parse("item_?[0-9]", false).unwrap();

        assert!(pattern.matches("item_a7"));
        assert!(!pattern.matches("item_a"));
    }

    #[test]
    fn test_regex_is_anchored_at_start() {
        let pattern = KeyPattern::parse(r"user_\d+", true).unwrap();

        assert!(pattern.matches("user_42"));
        assert!(pattern.matches("user_42_old"));
        assert!(!pattern.matches("old_user_42"));
    }

    #[test]
    fn test_regex_alternation_stays_anchored() {
        let pattern = KeyPattern::parse("a|b", true).unwrap();

        assert!(pattern.matches("bx"));
        assert!(!pattern.matches("xb"));
    }

    #[test]
    fn test_empty_pattern_matches_all() {
        let pattern = KeyPattern::parse("", true).unwrap();
        assert!(pattern.matches("anything"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            KeyPattern::parse("[", false),
            Err(CacheError::InvalidPattern(_))
        ));
        assert!(matches!(
            KeyPattern::parse("(", true),
            Err(CacheError::InvalidPattern(_))
        ));
    }
}
