// Query Classifier & Expander (§4.7): derives per-backend preprocessing from
// a raw query string.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Exact,
    ErrorCode,
    Identifier,
    NaturalLanguage,
    Mixed,
    Default,
}

impl QueryClass {
    /// Per-class `(w_bm25, w_vector)` weights (§4.7 table).
    pub fn weights(&self) -> (f32, f32) {
        match self {
            QueryClass::Exact => (0.90, 0.10),
            QueryClass::ErrorCode => (0.80, 0.20),
            QueryClass::Identifier => (0.70, 0.30),
            QueryClass::NaturalLanguage => (0.25, 0.75),
            QueryClass::Mixed => (0.50, 0.50),
            QueryClass::Default => (0.50, 0.50),
        }
    }
}

static ERROR_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,}_[A-Z0-9_]+$").unwrap());
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*(_[A-Za-z0-9]+)*$|^[a-z]+([A-Z][a-z0-9]*)+$").unwrap());
static INTERROGATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(how|what|why|where|when)\b").unwrap());

const SYNONYMS: &[(&str, &[&str])] = &[
    ("function", &["func", "fn", "method"]),
    ("search", &["Search", "find", "query", "lookup"]),
    ("error", &["Error", "exception", "fail", "failure"]),
    ("config", &["configuration", "settings"]),
    ("delete", &["remove", "drop"]),
];

/// Classifies `query` in priority order; first match wins (§4.7).
pub fn classify(query: &str) -> QueryClass {
    let trimmed = query.trim();

    if (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() > 1)
        || (trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() > 1)
    {
        return QueryClass::Exact;
    }

    if ERROR_CODE_RE.is_match(trimmed) {
        return QueryClass::ErrorCode;
    }

    let word_count = trimmed.split_whitespace().count();
    if word_count == 1 && IDENTIFIER_RE.is_match(trimmed) && (trimmed.contains('_') || has_internal_uppercase(trimmed))
    {
        return QueryClass::Identifier;
    }

    if INTERROGATIVE_RE.is_match(trimmed) || word_count >= 6 {
        return QueryClass::NaturalLanguage;
    }

    if has_code_like_token(trimmed) && has_prose_token(trimmed) {
        return QueryClass::Mixed;
    }

    QueryClass::Default
}

fn has_internal_uppercase(word: &str) -> bool {
    word.chars().skip(1).any(|c| c.is_uppercase())
}

fn has_code_like_token(query: &str) -> bool {
    query.split_whitespace().any(|w| w.contains('_') || has_internal_uppercase(w) || w.contains("::") || w.contains('('))
}

fn has_prose_token(query: &str) -> bool {
    query.split_whitespace().any(|w| w.chars().all(|c| c.is_alphabetic()) && !w.contains('_') && !has_internal_uppercase(w))
}

/// Expands `query` with case variants and configured synonyms, for the BM25
/// path only (§4.7). Additive: never replaces the original tokens.
pub fn expand(query: &str) -> String {
    let mut expanded_terms = vec![query.to_string()];

    for word in query.split_whitespace() {
        let lower = word.to_lowercase();
        if let Some((_, synonyms)) = SYNONYMS.iter().find(|(term, _)| *term == lower) {
            for synonym in *synonyms {
                expanded_terms.push(synonym.to_string());
            }
        }
    }

    expanded_terms.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_string_is_exact() {
        assert_eq!(classify("\"handle auth\""), QueryClass::Exact);
    }

    #[test]
    fn screaming_snake_matches_error_code() {
        assert_eq!(classify("ENOENT_FILE_MISSING"), QueryClass::ErrorCode);
    }

    #[test]
    fn snake_case_identifier_classified() {
        assert_eq!(classify("handle_auth_login"), QueryClass::Identifier);
    }

    #[test]
    fn camel_case_identifier_classified() {
        assert_eq!(classify("handleAuthLogin"), QueryClass::Identifier);
    }

    #[test]
    fn interrogative_is_natural_language() {
        assert_eq!(classify("how does the search engine orchestrate retrieval"), QueryClass::NaturalLanguage);
    }

    #[test]
    fn long_query_is_natural_language() {
        assert_eq!(classify("one two three four five six seven"), QueryClass::NaturalLanguage);
    }

    #[test]
    fn mixed_code_and_prose() {
        assert_eq!(classify("fix the handle_auth bug please"), QueryClass::Mixed);
    }

    #[test]
    fn plain_word_is_default() {
        assert_eq!(classify("search"), QueryClass::Default);
    }

    #[test]
    fn expand_keeps_original_and_adds_synonyms() {
        let expanded = expand("search function");
        assert!(expanded.starts_with("search function"));
        assert!(expanded.contains("find"));
        assert!(expanded.contains("func"));
    }

    #[test]
    fn weights_sum_to_one_for_every_class() {
        for class in [
            QueryClass::Exact,
            QueryClass::ErrorCode,
            QueryClass::Identifier,
            QueryClass::NaturalLanguage,
            QueryClass::Mixed,
            QueryClass::Default,
        ] {
            let (bm25, vector) = class.weights();
            assert!((bm25 + vector - 1.0).abs() < 1e-6);
        }
    }
}
