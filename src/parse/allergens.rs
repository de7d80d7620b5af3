use scraper::ElementRef;

use crate::parse::Error;
use crate::static_selector;

/// Outcome of decoding a structured `data-allergens` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllergenParse {
    Parsed(Vec<String>),
    /// Missing, blank, or malformed. Never an error for the caller.
    Empty,
}

impl AllergenParse {
    pub fn from_attr(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::Empty;
        };
        match decode_list(raw) {
            Ok(labels) => {
                let labels: Vec<String> = labels
                    .iter()
                    .map(|label| label.trim())
                    .filter(|label| !label.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if labels.is_empty() {
                    Self::Empty
                } else {
                    Self::Parsed(labels)
                }
            }
            Err(e) => {
                log::debug!("ignoring allergen attribute {raw:?}: {e}");
                Self::Empty
            }
        }
    }
}

// accepts json (`["Dairy"]`) and the single quoted form the widget sometimes emits (`['Dairy']`)
fn decode_list(raw: &str) -> Result<Vec<String>, Error> {
    if !(raw.starts_with('[') && raw.ends_with(']')) {
        return Err(Error::allergen_parse_error("attribute is not a list"));
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(labels) => Ok(labels),
        Err(_) if raw.contains('\'') => {
            Ok(serde_json::from_str::<Vec<String>>(&raw.replace('\'', "\""))?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Insertion ordered, case sensitive set of labels. The first source to add a label wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllergenLabels(Vec<String>);

impl AllergenLabels {
    pub fn insert(&mut self, label: String) -> bool {
        if self.0.contains(&label) {
            false
        } else {
            self.0.push(label);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Structured attribute first, then icon annotations below `item`.
    pub fn from_item(item: ElementRef<'_>) -> Self {
        static_selector!(ICON_SELECTOR <- r#"img[alt], [class*="allergen-"], i[title]"#);
        let mut labels = Self::default();
        if let AllergenParse::Parsed(structured) =
            AllergenParse::from_attr(item.value().attr("data-allergens"))
        {
            for label in structured {
                labels.insert(label);
            }
        }
        for label in item.select(&ICON_SELECTOR).filter_map(icon_label) {
            labels.insert(label);
        }
        labels
    }
}

impl FromIterator<String> for AllergenLabels {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut labels = Self::default();
        for label in iter {
            labels.insert(label);
        }
        labels
    }
}

fn icon_label(icon: ElementRef<'_>) -> Option<String> {
    let el = icon.value();
    if let Some(alt) = el.attr("alt").map(str::trim).filter(|alt| !alt.is_empty()) {
        return Some(title_case(alt));
    }
    // legacy markup: <i class="fa-allergen allergen-tree-nuts">
    if let Some(name) = el.classes().find_map(|class| {
        class
            .strip_prefix("allergen-")
            .filter(|name| !name.is_empty() && *name != "tooltip")
    }) {
        return Some(title_case(&name.replace('-', " ")));
    }
    el.attr("title")
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(title_case)
}

pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
