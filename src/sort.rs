//! Natural ordering for file names.
//!
//! Runs of ASCII digits compare by numeric value, everything else compares
//! case-insensitively, so `chapter2.mp3` sorts before `chapter10.mp3`.

use std::cmp::Ordering;

/// One run of a tokenized name.
///
/// Keys always alternate starting with `Text`, so tokens at the same position
/// are of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Lowercased non-digit run (possibly empty at the start of a key).
    Text(String),
    /// Digit run with leading zeros stripped.
    Number(String),
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            // Same magnitude check without parsing, so arbitrarily long runs work
            (Token::Number(a), Token::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Text(_), Token::Number(_)) => Ordering::Less,
            (Token::Number(_), Token::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Comparable natural-order key for a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    tokens: Vec<Token>,
    raw: String,
}

impl SortKey {
    /// The tokens of this key, in order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Raw name breaks ties such as "file7" vs "file007" or "A" vs "a"
        self.tokens
            .cmp(&other.tokens)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build the natural sort key for a name.
pub fn sort_key(name: &str) -> SortKey {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for c in name.chars() {
        let is_digit = c.is_ascii_digit();
        if is_digit != in_digits {
            tokens.push(finish_token(std::mem::take(&mut current), in_digits));
            in_digits = is_digit;
        }
        current.push(c);
    }

    // A name that ends in text, or is empty, still has its trailing text run
    if !current.is_empty() || tokens.is_empty() {
        tokens.push(finish_token(current, in_digits));
    }

    SortKey {
        tokens,
        raw: name.to_string(),
    }
}

fn finish_token(run: String, digits: bool) -> Token {
    if digits {
        let trimmed = run.trim_start_matches('0');
        Token::Number(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
    } else {
        Token::Text(run.to_lowercase())
    }
}

/// Compare two names in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}
