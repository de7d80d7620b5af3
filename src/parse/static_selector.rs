use std::sync::OnceLock;

use scraper::Selector;

/// A css selector that is compiled the first time it is used.
///
/// Every selector in this crate is a literal, so a parse failure is a bug and panics.
#[derive(Debug)]
pub(super) struct StaticSelector<'a> {
    cell: OnceLock<Selector>,
    source: &'a str,
}

impl<'a> StaticSelector<'a> {
    pub(super) const fn new(source: &'a str) -> Self {
        Self {
            cell: OnceLock::new(),
            source,
        }
    }

    pub(super) const fn source(&self) -> &'a str {
        self.source
    }
}

impl core::ops::Deref for StaticSelector<'_> {
    type Target = Selector;

    fn deref(&self) -> &Self::Target {
        self.cell
            .get_or_init(|| match Selector::parse(self.source) {
                Ok(sel) => sel,
                Err(e) => panic!("Error parsing static selector {}: {:?}", self.source, e),
            })
    }
}

#[macro_export]
macro_rules! static_selector {
    ($x: ident <- $sel: literal) => {
        static $x: $crate::parse::static_selector::StaticSelector =
            $crate::parse::static_selector::StaticSelector::new($sel);
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_selector_compiles_lazily() {
        static_selector!(ITEM <- "li.menu-item");
        assert_eq!(ITEM.source(), "li.menu-item");
        let doc = scraper::Html::parse_fragment(r#"<ul><li class="menu-item">Toast</li></ul>"#);
        assert_eq!(doc.select(&ITEM).count(), 1);
    }
}
