//! Word tokenizer for BM25.
//!
//! Lowercases, splits on anything that is not alphanumeric and drops English stopwords and
//! single character tokens.
use std::{collections::HashSet, sync::LazyLock};

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
        "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
        "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
        "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
        "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
        "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
        "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same",
        "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "will", "with", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect()
});

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 1 && !STOPWORDS.contains(token))
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_stopwords_and_punctuation() {
        assert_eq!(tokenize("The cat, sat!"), vec!["cat", "sat"]);
    }

    #[test]
    fn test_drops_single_characters() {
        assert_eq!(tokenize("a b c rust"), vec!["rust"]);
    }

    #[test]
    fn test_keeps_numbers_and_unicode() {
        assert_eq!(tokenize("Über 2024 café"), vec!["über", "2024", "café"]);
    }

    #[test]
    fn test_empty() {
        assert!(tokenize("  ,. ").is_empty());
    }
}
