//! Regular expressions for `Pattern` and `Like` constraints
//!
//! Expressions are kept within the subset shared by XPath and the `regex`
//! crate, so the same text can be evaluated in process or shipped to a store.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

/// Lowercase keyword stems, in input order
pub fn stems(keywords: &str) -> Vec<String> {
    SEPARATOR
        .split(keywords)
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_lowercase())
        .collect()
}

/// Expression matching text containing every stem at a word start, in order
///
/// Arbitrary text may separate the stems; match case-insensitively.
pub fn like_expression(keywords: &str) -> String {
    stems(keywords)
        .iter()
        .map(|stem| format!("(^|\\W){}", regex::escape(stem)))
        .collect::<Vec<_>>()
        .join(".*")
}

/// Flags used when evaluating a like expression
pub const LIKE_FLAGS: &str = "i";

/// Anchor an expression to the whole text
pub fn anchored(text: &str) -> String {
    format!("^({})$", text)
}

/// Expression and flags matching the whole text, with `q` flags resolved
pub fn whole(text: &str, flags: &str) -> (String, String) {
    if flags.contains('q') {
        (anchored(&regex::escape(text)), flags.replace('q', ""))
    } else {
        (anchored(text), flags.to_string())
    }
}

/// Compile a whole-text matcher for a `Pattern` constraint
pub fn full_match(text: &str, flags: &str) -> Result<Regex> {
    let (source, flags) = whole(text, flags);
    compile(&source, &flags)
}

/// Compile an expression with XPath-style flags (`i`, `m`, `s`, `x`, `q`)
pub fn compile(text: &str, flags: &str) -> Result<Regex> {
    let source = if flags.contains('q') {
        regex::escape(text)
    } else {
        text.to_string()
    };

    RegexBuilder::new(&source)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| Error::InvalidPattern(format!("{}: {}", text, e)))
}
