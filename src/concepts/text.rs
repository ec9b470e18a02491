//! Text helpers shared by extraction, domain tagging and relatedness

use std::sync::OnceLock;

use regex::Regex;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['+#-][\p{L}\p{N}]+)*").expect("token pattern is valid")
    })
}

/// A token with its original spelling and byte offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub lower: String,
    pub start: usize,
}

/// Split text into word tokens, keeping surface form and offsets
pub fn tokens(text: &str) -> Vec<Token<'_>> {
    token_regex()
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            lower: m.as_str().to_lowercase(),
            start: m.start(),
        })
        .collect()
}

/// Lowercase word tokens only
pub fn tokenize(text: &str) -> Vec<String> {
    token_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Every index in `haystack` at which `needle` occurs as a contiguous run
pub fn find_sequence<S: AsRef<str>, T: AsRef<str>>(haystack: &[S], needle: &[T]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    (0..=haystack.len() - needle.len())
        .filter(|&i| {
            needle
                .iter()
                .zip(&haystack[i..i + needle.len()])
                .all(|(n, h)| n.as_ref() == h.as_ref())
        })
        .collect()
}

/// Normalized concept id: lowercase, whitespace runs become hyphens, and
/// anything other than word characters and hyphens is stripped.
pub fn normalize_id(concept: &str) -> String {
    let lowered = concept.trim().to_lowercase();
    let mut id = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            pending_hyphen = !id.is_empty();
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            if pending_hyphen {
                id.push('-');
                pending_hyphen = false;
            }
            id.push(c);
        }
    }
    id
}
