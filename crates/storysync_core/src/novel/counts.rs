//! Word and letter counts of scene prose.
//!
//! Comments (`/* … */`) and inline format tags (`[i]`, `[/b]`, …) do not
//! count; dashes and ellipses separate words.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"));
static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[/?[A-Za-z][^\[\]\s]*\]").expect("valid markup regex"));
static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--|—|–|…").expect("valid separator regex"));
static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n]+").expect("valid line break regex"));

fn strip(text: &str) -> String {
    let text = COMMENT_RE.replace_all(text, "");
    MARKUP_RE.replace_all(&text, "").into_owned()
}

pub fn word_count(text: &str) -> usize {
    let stripped = strip(text);
    SEPARATOR_RE
        .replace_all(&stripped, " ")
        .split_whitespace()
        .count()
}

pub fn letter_count(text: &str) -> usize {
    let stripped = strip(text);
    LINE_BREAK_RE.replace_all(&stripped, "").chars().count()
}
