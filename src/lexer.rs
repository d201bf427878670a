//! Splitting raw input into command fragments and fragments into tokens.
//!
//! Neither step knows about quoting or escaping: a token is simply a run of
//! characters between whitespace, and a fragment is whatever lies between two
//! `&` separators.

use crate::error::{ShellError, ShellResult};
use regex::Regex;
use std::sync::LazyLock;

/// Separator between commands that run concurrently on one line.
pub const CONCURRENCY_SEPARATOR: char = '&';

/// A token is a maximal run of anything but space, tab and newline.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^ \t\n]+").expect("token pattern is valid"));

/// Split a raw input line into command fragments on `&`.
///
/// Fragments that are empty or contain only whitespace are dropped; the rest
/// keep their original order. A line without any separator yields itself,
/// unless it is blank.
pub fn split_line(line: &str) -> Vec<&str> {
    line.split(CONCURRENCY_SEPARATOR)
        .filter(|fragment| !fragment.chars().all(is_blank))
        .collect()
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Split one command fragment into whitespace-delimited tokens.
///
/// A single trailing newline is stripped first. More than `max_tokens`
/// tokens is an error.
pub fn split_into_tokens(fragment: &str, max_tokens: usize) -> ShellResult<Vec<String>> {
    let fragment = fragment.strip_suffix('\n').unwrap_or(fragment);

    let mut tokens = Vec::new();
    for token in TOKEN.find_iter(fragment) {
        if tokens.len() == max_tokens {
            return Err(ShellError::TooManyTokens { limit: max_tokens });
        }
        tokens.push(token.as_str().to_string());
    }
    Ok(tokens)
}
