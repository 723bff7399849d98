//! Plain-text normalization for rich-text work item fields.

use regex::Regex;
use std::sync::OnceLock;

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

/// Strip markup from a rich-text blob and collapse it to single-spaced text.
///
/// Tags become spaces so `<div>a</div><div>b</div>` yields two words, the
/// `&nbsp;` entity becomes a space and `&amp;` becomes `&`. Empty input gives
/// an empty string.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let stripped = tag_re().replace_all(raw, " ");
    let decoded = stripped.replace("&nbsp;", " ").replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of maximal non-whitespace runs.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
