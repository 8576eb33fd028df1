//! Asset reference extraction and rewriting.

use regex::{Captures, Regex};
use std::sync::LazyLock;

// Group 1: href/src attribute of link, script and img tags. Group 2: CSS url().
static ASSET_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<(?:link|script|img)\b[^>]*?\b(?:href|src)\s*=\s*["']([^"']+)["']|url\(\s*['"]?([^'")]+)['"]?\s*\)"#,
    )
    .expect("asset reference pattern is valid")
});

fn reference<'t>(caps: &Captures<'t>) -> Option<regex::Match<'t>> {
    caps.get(1).or_else(|| caps.get(2))
}

/// Returns the asset references in `text`, in document order.
#[must_use]
pub fn extract(text: &str) -> Vec<String> {
    ASSET_REF
        .captures_iter(text)
        .filter_map(|caps| reference(&caps).map(|m| m.as_str().trim().to_string()))
        .filter(|r| !r.is_empty())
        .collect()
}

/// Rewrites every asset reference for which `f` returns a replacement.
///
/// Only the reference itself is replaced; the surrounding markup is kept.
pub fn rewrite(text: &str, f: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ASSET_REF.captures_iter(text) {
        let Some(m) = reference(&caps) else {
            continue;
        };
        if let Some(replacement) = f(m.as_str().trim()) {
            out.push_str(&text[last..m.start()]);
            out.push_str(&replacement);
            last = m.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Returns true for references that must never be rewritten.
#[must_use]
pub fn is_external(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    reference.starts_with('/')
        || reference.starts_with('#')
        || reference.contains("{{")
        || reference.contains("<%")
        || reference.contains("<?")
        || lower.starts_with("data:")
        || lower.starts_with("javascript:")
        || lower.starts_with("about:")
        || lower.contains("://")
}

/// Strips `./` and `../` prefixes and a leading `static/` from a relative reference.
#[must_use]
pub fn normalize(reference: &str) -> String {
    let mut rest = reference;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else {
            break;
        }
    }
    rest.strip_prefix("static/").unwrap_or(rest).to_string()
}
