use once_cell::sync::Lazy;
use regex::Regex;

/// Licensing footer, from the phrase up to and including the end of its line.
static BOILERPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)creative commons.*?(?:\n|$)").unwrap());

static NON_ASCII_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]+").unwrap());

/// Unicode whitespace plus the ASCII separators U+001C..U+001F.
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\x1c-\x1f]+").unwrap());

/// Normalize extracted document text.
///
/// 1. Strip "Creative Commons" licensing text to the end of its line
/// 2. Replace runs of non-ASCII characters with a single space
/// 3. Collapse whitespace runs into a single space
/// 4. Trim
///
/// Collapsing can join words split across lines into a new licensing
/// phrase, so the passes repeat until none is left. The result is a fixed
/// point: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let mut cleaned = clean_once(text);
    while BOILERPLATE_RE.is_match(&cleaned) {
        cleaned = clean_once(&cleaned);
    }
    cleaned
}

fn clean_once(text: &str) -> String {
    let stripped = BOILERPLATE_RE.replace_all(text, "");
    let ascii = NON_ASCII_RE.replace_all(&stripped, " ");
    let collapsed = WHITESPACE_RE.replace_all(&ascii, " ");
    collapsed.trim().to_string()
}
