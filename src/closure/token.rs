//! Token normalization and the plausibility filter applied to lookup replies.

use std::collections::BTreeSet;

/// Normalize a raw token: strip surrounding punctuation, uppercase, fold Polish diacritics.
pub fn normalize_token(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '"' | '\''))
        .chars()
        .flat_map(char::to_uppercase)
        .map(fold_polish)
        .collect()
}

fn fold_polish(c: char) -> char {
    match c {
        'Ą' => 'A',
        'Ć' => 'C',
        'Ę' => 'E',
        'Ł' => 'L',
        'Ń' => 'N',
        'Ó' => 'O',
        'Ś' => 'S',
        'Ź' | 'Ż' => 'Z',
        other => other,
    }
}

/// Whether a raw reply token can name a person or a place.
///
/// Rejects empty tokens, tokens starting with `[`, and `http://` / `https://`
/// URLs. Tokens ending with `]` are rejected too: a bracketed marker such as
/// `[**RESTRICTED DATA**]` splits on whitespace into `[**RESTRICTED` and
/// `DATA**]`, and the second half would otherwise pass as a name.
pub fn is_plausible_token(raw: &str) -> bool {
    let token = raw.trim();
    if token.is_empty() || token.starts_with('[') || token.ends_with(']') {
        return false;
    }
    let lower = token.to_ascii_lowercase();
    !(lower.starts_with("http://") || lower.starts_with("https://"))
}

/// Split a reply message on whitespace, keep plausible tokens, normalized.
pub fn extract_tokens(message: &str) -> BTreeSet<String> {
    message
        .split_whitespace()
        .filter(|raw| is_plausible_token(raw))
        .map(normalize_token)
        .filter(|token| !token.is_empty())
        .collect()
}
