// Plain-text cleanup for feed fields.
// Court feeds put escaped HTML inside titles and case names; we decode
// entities once, strip whatever markup that reveals, and collapse whitespace.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Decode HTML character references (the full HTML5 named set plus numeric
/// forms) in a single pass. Unknown named references are left as-is.
pub fn unescape(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

pub fn strip_tags(s: &str) -> String {
    TAG.replace_all(s, "").into_owned()
}

/// Entity-decode, strip markup, and normalise whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = unescape(s);
    let stripped = if decoded.contains('<') {
        strip_tags(&decoded)
    } else {
        decoded
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
