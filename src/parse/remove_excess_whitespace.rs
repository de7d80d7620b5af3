use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

/// Collapses every run of whitespace (including newlines and `&nbsp;`) into a single space.
pub fn remove_excess_whitespace(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[\s\u{00A0}]{2,}|[\n\r\t\u{00A0}]").expect("regex should be valid"));
    re.replace_all(s, " ")
}
