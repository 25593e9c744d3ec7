// Tokenizer/Analyzer (§4.1): splits text into BM25 terms, handling code
// identifiers (camelCase/snake_case), case folding, and numeric/punctuation
// boundaries. Deterministic, stable across platforms, no stemming, no
// stop-word removal.

/// Tokenizes `text` into an ordered sequence of terms for BM25 indexing and
/// querying. Pure function; no failure modes.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw_word in split_on_non_identifier_chars(text) {
        tokenize_word(raw_word, &mut tokens);
    }
    tokens
}

/// Splits on anything that is not alphanumeric or underscore; numeric runs
/// and punctuation become term boundaries.
fn split_on_non_identifier_chars(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            words.push(&text[s..i]);
        }
    }
    if let Some(s) = start {
        words.push(&text[s..]);
    }
    words
}

fn tokenize_word(word: &str, out: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }

    let folded = word.to_lowercase();
    let has_uppercase = word.chars().any(|c| c.is_uppercase());

    // Single-character tokens are dropped except if they are the whole word
    // (i.e. the word itself, folded, is already length 1 — nothing else to emit).
    if word.chars().count() > 1 || !has_uppercase {
        push_unique(out, folded.clone());
    } else {
        push_unique(out, folded.clone());
    }

    if has_uppercase {
        push_unique(out, word.to_string());
    }

    for part in split_identifier_parts(word) {
        if part.chars().count() <= 1 {
            continue;
        }
        push_unique(out, part.to_lowercase());
    }
}

fn push_unique(out: &mut Vec<String>, token: String) {
    if !out.contains(&token) {
        out.push(token);
    }
}

/// Splits `snake_case_ident` on `_`, and `HandleAuthLogin` / `handleAuthLogin`
/// on camelCase boundaries. Returns sub-parts only (never the whole word).
fn split_identifier_parts(word: &str) -> Vec<String> {
    if word.contains('_') {
        return word.split('_').filter(|p| !p.is_empty()).map(|p| p.to_string()).collect();
    }

    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 1 {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && c.is_uppercase()
            && (chars[i - 1].is_lowercase() || chars[i - 1].is_numeric())
            || i > 0 && i + 1 < chars.len() && c.is_uppercase() && chars[i + 1].is_lowercase() && chars[i - 1].is_uppercase();
        if boundary && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    if parts.len() <= 1 {
        Vec::new()
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_splits_into_parts_plus_whole() {
        let tokens = tokenize("HandleAuthLogin");
        assert!(tokens.contains(&"handleauthlogin".to_string()));
        assert!(tokens.contains(&"handle".to_string()));
        assert!(tokens.contains(&"auth".to_string()));
        assert!(tokens.contains(&"login".to_string()));
    }

    #[test]
    fn snake_case_splits_into_parts_plus_whole() {
        let tokens = tokenize("snake_case_ident");
        assert!(tokens.contains(&"snake_case_ident".to_string()));
        assert!(tokens.contains(&"snake".to_string()));
        assert!(tokens.contains(&"case".to_string()));
        assert!(tokens.contains(&"ident".to_string()));
    }

    #[test]
    fn uppercase_variant_preserved_alongside_folded_form() {
        let tokens = tokenize("Search");
        assert!(tokens.contains(&"search".to_string()));
        assert!(tokens.contains(&"Search".to_string()));
    }

    #[test]
    fn lowercase_word_emits_single_token() {
        let tokens = tokenize("search");
        assert_eq!(tokens, vec!["search".to_string()]);
    }

    #[test]
    fn single_character_tokens_dropped_except_as_whole_word() {
        let tokens = tokenize("a + b");
        assert_eq!(tokens, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn punctuation_and_numerics_become_boundaries() {
        let tokens = tokenize("foo.bar(42)");
        assert!(tokens.contains(&"foo".to_string()));
        assert!(tokens.contains(&"bar".to_string()));
        assert!(tokens.contains(&"42".to_string()));
    }

    #[test]
    fn deterministic_across_calls() {
        let a = tokenize("HandleAuthLogin snake_case_ident Search");
        let b = tokenize("HandleAuthLogin snake_case_ident Search");
        assert_eq!(a, b);
    }
}
