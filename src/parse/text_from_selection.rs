use std::borrow::Cow;

use scraper::{ElementRef, Selector};

use super::remove_excess_whitespace;

/// Text of the first element matching `selector` below `element`, cleaned up.
///
/// Returns `None` when nothing matches or the match has no visible text.
pub fn text_from_selection(selector: &Selector, element: ElementRef<'_>) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(full_text)
        .filter(|text| !text.is_empty())
}

/// The first non-blank text node that is a direct child of `element`, trimmed.
///
/// For `<li>Veggie Burger <img alt="vegan"></li>` this is `Veggie Burger`. Text inside child
/// elements is ignored.
pub fn first_text(element: ElementRef<'_>) -> Cow<'_, str> {
    let text = element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default();
    match remove_excess_whitespace(text.trim()) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}

/// All descendant text of `element` joined together with whitespace collapsed.
pub fn full_text(element: ElementRef<'_>) -> String {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    remove_excess_whitespace(joined.trim()).trim().to_string()
}
