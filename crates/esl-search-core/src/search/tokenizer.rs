//! Query tokenization.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Any run of characters outside `[a-z0-9]` separates tokens.
static TOKEN_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Split a free-text query into normalized search terms.
///
/// The text is lowercased and split on every run of non-alphanumeric ASCII
/// characters, so `&`, `!`, hyphens, whitespace and non-ASCII letters all act
/// as separators. Duplicates are removed, keeping first-seen order.
///
/// - "English for Adults!! grammar & writing" → `[english, for, adults, grammar, writing]`
/// - "A1/A2 - a1" → `[a1, a2]`
/// - "   " → `[]`
pub fn tokenize_query(raw: &str) -> Vec<String> {
    let lowered = raw.to_lowercase();
    let mut seen = HashSet::new();

    TOKEN_SEPARATORS
        .split(&lowered)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| seen.insert(*segment))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_clean_token(token: &str) -> bool {
        !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    #[test]
    fn test_mixed_punctuation() {
        let tokens = tokenize_query("English for Adults!! grammar & writing");
        assert_eq!(
            tokens,
            vec!["english", "for", "adults", "grammar", "writing"]
        );
        assert!(tokens.iter().all(|t| is_clean_token(t)));
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(tokenize_query("").is_empty());
        assert!(tokenize_query("   \t\n ").is_empty());
        assert!(tokenize_query("!!! &&& ...").is_empty());
    }

    #[test]
    fn test_deduplicates_in_first_seen_order() {
        let tokens = tokenize_query("Story story STORY time Story");
        assert_eq!(tokens, vec!["story", "time"]);
    }

    #[test]
    fn test_digits_are_kept() {
        let tokens = tokenize_query("IELTS band-7 B2");
        assert_eq!(tokens, vec!["ielts", "band", "7", "b2"]);
    }

    #[test]
    fn test_non_ascii_letters_separate() {
        let tokens = tokenize_query("café naïve");
        assert_eq!(tokens, vec!["caf", "na", "ve"]);
        assert!(tokens.iter().all(|t| is_clean_token(t)));
    }

    #[test]
    fn test_deterministic() {
        let query = "listening, speaking & reading: B1 listening";
        assert_eq!(tokenize_query(query), tokenize_query(query));
    }
}
