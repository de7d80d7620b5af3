//! Extraction of raw menu entries from one rendered menu page.
//!
//! The page is scoped to a single (hall, date, meal selector) request. Menu markup looks like
//!
//! ```html
//! <div class="menu-results">
//!   <div class="menu-meal" data-meal="lunch">
//!     <h3>Lunch</h3>
//!     <div class="menu-station">
//!       <h4 class="station-title">Grill</h4>
//!       <ul>
//!         <li class="menu-item" data-allergens='["Dairy"]'>Cheeseburger <img alt="gluten"></li>
//!       </ul>
//!     </div>
//!   </div>
//! </div>
//! ```
//!
//! The hospitality site itself renders the same tree flattened into siblings, without
//! containers and often without the results wrapper:
//!
//! ```html
//! <h3>Lunch</h3>
//! <h4>Grill</h4>
//! <ul><li>Cheeseburger <i class="fa-allergen allergen-dairy"></i></li></ul>
//! ```
//!
//! Pages with neither shape are scanned for a flat list of items.
use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::allergens::AllergenLabels;
use super::raw_entry::{RawMenuEntry, DEFAULT_SECTION, FALLBACK_MEAL};
use super::text_from_selection::{first_text, full_text, text_from_selection};
use crate::parse::Error;
use crate::static_selector;

static_selector!(RESULTS_SELECTOR <- ".menu-results, #menu-results");
static_selector!(BODY_SELECTOR <- "body");
static_selector!(MEAL_SELECTOR <- ".menu-meal, [data-meal]");
static_selector!(MEAL_HEADING_SELECTOR <- "h2, h3, .meal-title");
static_selector!(SIBLING_MEAL_SELECTOR <- "h3");
static_selector!(STATION_SELECTOR <- ".menu-station, .station");
static_selector!(STATION_TITLE_SELECTOR <- ".station-title, h4");
static_selector!(ITEM_SELECTOR <- ".menu-item, li");

pub type Entries<'a> = Box<dyn Iterator<Item = RawMenuEntry> + 'a>;

/// Section name and the element holding its items.
type Section<'a> = (String, ElementRef<'a>);

#[derive(Debug, Clone, Copy)]
pub struct MenuPage<'a> {
    region: ElementRef<'a>,
}

impl<'a> MenuPage<'a> {
    /// Scopes the page to its results region, or to the whole body when there is none.
    pub fn from_document(document: &'a Html) -> Result<Self, Error> {
        let region = document
            .select(&RESULTS_SELECTOR)
            .next()
            .or_else(|| document.select(&BODY_SELECTOR).next())
            .ok_or_else(|| {
                Error::html_parse_error(&format!(
                    "neither a results region `{}` nor a body found",
                    RESULTS_SELECTOR.source()
                ))
            })?;
        Ok(Self { region })
    }

    pub fn has_meals(&self) -> bool {
        self.region.select(&MEAL_SELECTOR).next().is_some()
    }

    /// Lazily yields every valid entry in the results region.
    ///
    /// `meal_label` is the selector the page was fetched with, empty for an unfiltered page.
    pub fn entries(self, hall_id: &'a str, meal_label: &'a str) -> Entries<'a> {
        if self.has_meals() {
            return Box::new(self.meal_entries(hall_id, meal_label));
        }
        let headed = self.sibling_meals(meal_label);
        if headed.is_empty() {
            Box::new(self.flat_entries(hall_id, meal_label))
        } else {
            Box::new(
                headed
                    .into_iter()
                    .flat_map(move |(meal_type, sections)| {
                        section_entries(hall_id, meal_type, sections)
                    }),
            )
        }
    }

    fn meal_entries(
        self,
        hall_id: &'a str,
        meal_label: &'a str,
    ) -> impl Iterator<Item = RawMenuEntry> + 'a {
        top_level(self.region, &MEAL_SELECTOR).flat_map(move |meal| {
            section_entries(hall_id, resolve_meal_type(meal, meal_label), sections(meal))
        })
    }

    // only meal headings that are followed by at least one list count
    fn sibling_meals(self, meal_label: &str) -> Vec<(String, Vec<Section<'a>>)> {
        self.region
            .select(&SIBLING_MEAL_SELECTOR)
            .map(|heading| {
                let text = full_text(heading);
                let meal_type = if text.is_empty() {
                    non_empty(meal_label).unwrap_or(FALLBACK_MEAL).to_string()
                } else {
                    text
                };
                (meal_type, sibling_sections(heading))
            })
            .filter(|(_, sections)| !sections.is_empty())
            .collect()
    }

    fn flat_entries(
        self,
        hall_id: &'a str,
        meal_label: &'a str,
    ) -> impl Iterator<Item = RawMenuEntry> + 'a {
        let meal_type = non_empty(meal_label).unwrap_or(FALLBACK_MEAL);
        top_level(self.region, &ITEM_SELECTOR).filter_map(move |item| {
            let item_name = item_name(item)?;
            Some(RawMenuEntry {
                hall_id: hall_id.to_string(),
                meal_label: meal_type.to_string(),
                section_name: DEFAULT_SECTION.to_string(),
                item_name,
                allergen_labels: AllergenLabels::default(),
            })
        })
    }
}

/// Entries for one fetched page. A page without a results region or body yields nothing.
pub fn extract<'a>(document: &'a Html, hall_id: &'a str, meal_label: &'a str) -> Entries<'a> {
    match MenuPage::from_document(document) {
        Ok(page) => page.entries(hall_id, meal_label),
        Err(e) => {
            log::warn!("{hall_id} ({meal_label:?}): {e}, skipping meal selection");
            Box::new(std::iter::empty())
        }
    }
}

fn section_entries<'a>(
    hall_id: &'a str,
    meal_type: String,
    sections: Vec<Section<'a>>,
) -> impl Iterator<Item = RawMenuEntry> + 'a {
    sections.into_iter().flat_map(move |(section_name, section)| {
        let meal_type = meal_type.clone();
        top_level(section, &ITEM_SELECTOR).filter_map(move |item| {
            Some(RawMenuEntry {
                hall_id: hall_id.to_string(),
                meal_label: meal_type.clone(),
                section_name: section_name.clone(),
                item_name: item_name(item)?,
                allergen_labels: AllergenLabels::from_item(item),
            })
        })
    })
}

/// Matches of `selector` below `scope` that are not nested inside another match.
fn top_level<'a>(
    scope: ElementRef<'a>,
    selector: &'a Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    scope.select(selector).filter(move |el| {
        !el.ancestors()
            .take_while(|node| node.id() != scope.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| selector.matches(&ancestor))
    })
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s.trim()).filter(|s| !s.is_empty())
}

fn resolve_meal_type(meal: ElementRef<'_>, meal_label: &str) -> String {
    meal.value()
        .attr("data-meal")
        .and_then(non_empty)
        .map(ToString::to_string)
        .or_else(|| text_from_selection(&MEAL_HEADING_SELECTOR, meal))
        .or_else(|| non_empty(meal_label).map(ToString::to_string))
        .unwrap_or_else(|| FALLBACK_MEAL.to_string())
}

// a meal without stations is one big default section
fn sections(meal: ElementRef<'_>) -> Vec<Section<'_>> {
    let stations: Vec<_> = top_level(meal, &STATION_SELECTOR)
        .map(|station| {
            let name = text_from_selection(&STATION_TITLE_SELECTOR, station)
                .unwrap_or_else(|| DEFAULT_SECTION.to_string());
            (name, station)
        })
        .collect();
    if stations.is_empty() {
        vec![(DEFAULT_SECTION.to_string(), meal)]
    } else {
        stations
    }
}

// siblings up to the next meal heading; a list before any station heading is the default section
fn sibling_sections(heading: ElementRef<'_>) -> Vec<Section<'_>> {
    let mut station = DEFAULT_SECTION.to_string();
    let mut sections = Vec::new();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        match sibling.value().name() {
            "h3" => break,
            "h4" => {
                let title = full_text(sibling);
                station = if title.is_empty() {
                    DEFAULT_SECTION.to_string()
                } else {
                    title
                };
            }
            "ul" | "ol" => sections.push((station.clone(), sibling)),
            _ => {}
        }
    }
    sections
}

fn item_name(item: ElementRef<'_>) -> Option<String> {
    let text = match first_text(item) {
        first if !first.is_empty() => first,
        _ => Cow::Owned(full_text(item)),
    };
    let name = strip_price(&text).trim();
    // single characters are stray punctuation or icon glyphs
    (name.chars().count() > 1).then(|| name.to_string())
}

/// Removes a trailing price such as ` == $8.50` or ` - $3`.
pub fn strip_price(name: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\s*(?:={1,2}|[-–—|:•])\s*[$€£]\s?\d+(?:[.,]\d{1,2})?\s*$")
            .expect("regex should be valid")
    });
    re.find(name).map_or(name, |m| &name[..m.start()])
}
