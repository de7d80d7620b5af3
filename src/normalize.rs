use std::{collections::HashSet, str::FromStr};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::parse::{remove_excess_whitespace, RawMenuEntry};

/// How menu item ids are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// A fresh v4 uuid per item; ids mean nothing across runs.
    #[default]
    Random,
    /// A v5 uuid over hall, date, meal, name and category, so reruns reproduce the same ids.
    ContentDerived,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" | "v4" => Ok(Self::Random),
            "content" | "content-derived" | "v5" => Ok(Self::ContentDerived),
            other => Err(format!("unknown id strategy {other:?}, expected `random` or `content`")),
        }
    }
}

impl IdStrategy {
    fn assign(self, item: &NormalizedItem) -> Uuid {
        match self {
            Self::Random => Uuid::new_v4(),
            Self::ContentDerived => {
                let content = format!(
                    "{}|{}|{}|{}|{}",
                    item.hall_id, item.date, item.meal_type, item.name, item.category
                );
                Uuid::new_v5(&Uuid::NAMESPACE_URL, content.as_bytes())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub id: Uuid,
    pub date: NaiveDate,
    pub hall_id: String,
    pub meal_type: String,
    pub name: String,
    pub category: String,
    pub labels: Vec<String>,
}

type DedupKey = (NaiveDate, String, String, String);

impl NormalizedItem {
    fn dedup_key(&self) -> DedupKey {
        (
            self.date,
            self.hall_id.clone(),
            self.meal_type.clone(),
            self.name.clone(),
        )
    }
}

/// Cleans and deduplicates the entries of one hall/date scrape session.
///
/// The widget is queried once per meal selector and the views overlap, so the same item can
/// show up several times. Only the first occurrence of a (hall, meal, name) survives.
#[derive(Debug)]
pub struct Normalizer {
    date: NaiveDate,
    id_strategy: IdStrategy,
    seen: HashSet<DedupKey>,
}

impl Normalizer {
    pub fn new(date: NaiveDate, id_strategy: IdStrategy) -> Self {
        Self {
            date,
            id_strategy,
            seen: HashSet::new(),
        }
    }

    /// Returns `None` for duplicates and for names that are empty once cleaned.
    pub fn push(&mut self, raw: RawMenuEntry) -> Option<NormalizedItem> {
        let name = clean_name(&raw.item_name);
        if name.chars().count() <= 1 {
            return None;
        }
        let category = clean_text(&raw.section_name);
        let mut item = NormalizedItem {
            id: Uuid::nil(),
            date: self.date,
            hall_id: raw.hall_id.trim().to_string(),
            meal_type: normalize_meal_type(&raw.meal_label),
            name,
            category: if category.is_empty() {
                crate::parse::DEFAULT_SECTION.to_string()
            } else {
                category
            },
            labels: raw.allergen_labels.into_vec(),
        };
        if !self.seen.insert(item.dedup_key()) {
            log::trace!(
                "dropping duplicate {} / {} / {}",
                item.hall_id,
                item.meal_type,
                item.name
            );
            return None;
        }
        item.id = self.id_strategy.assign(&item);
        Some(item)
    }

    pub fn normalize_all(
        &mut self,
        entries: impl IntoIterator<Item = RawMenuEntry>,
    ) -> Vec<NormalizedItem> {
        entries.into_iter().filter_map(|raw| self.push(raw)).collect()
    }
}

/// Keeps the first item per dedup key, preserving order.
pub fn dedup(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedup_key()))
        .collect()
}

fn clean_text(s: &str) -> String {
    remove_excess_whitespace(s.trim()).trim().to_string()
}

pub fn clean_name(name: &str) -> String {
    let unquoted: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '\u{201C}' | '\u{201D}'))
        .collect();
    clean_text(&unquoted)
}

/// `lunch`, `LUNCH` and ` Lunch ` all become `Lunch`.
pub fn normalize_meal_type(meal: &str) -> String {
    let meal = clean_text(meal).to_lowercase();
    let mut chars = meal.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::AllergenLabels;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn raw(meal: &str, section: &str, name: &str, labels: &[&str]) -> RawMenuEntry {
        RawMenuEntry {
            hall_id: "village".into(),
            meal_label: meal.into(),
            section_name: section.into(),
            item_name: name.into(),
            allergen_labels: labels.iter().map(ToString::to_string).collect::<AllergenLabels>(),
        }
    }

    #[test]
    fn test_normalize_meal_type() {
        assert_eq!(normalize_meal_type("lunch"), "Lunch");
        assert_eq!(normalize_meal_type(" LUNCH "), "Lunch");
        assert_eq!(normalize_meal_type("late  night"), "Late night");
        assert_eq!(normalize_meal_type(""), "");
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  \"Chef's\"  Special "), "Chef's Special");
        assert_eq!(clean_name("\u{201C}Impossible\u{201D} Burger"), "Impossible Burger");
    }

    #[test]
    fn test_overlapping_sweeps_are_deduplicated() {
        let mut normalizer = Normalizer::new(date(), IdStrategy::Random);
        let all_meals = vec![
            raw("breakfast", "Expo", "All Day Coffee", &[]),
            raw("breakfast", "Expo", "Omelet", &["Eggs"]),
        ];
        let breakfast_only = vec![
            raw("Breakfast", "Expo", "All Day Coffee", &["Caffeine"]),
            raw("BREAKFAST", "Expo", "\"Omelet\"", &[]),
            raw("lunch", "Expo", "All Day Coffee", &[]),
        ];
        let mut items = normalizer.normalize_all(all_meals);
        items.extend(normalizer.normalize_all(breakfast_only));

        let summary: Vec<_> = items
            .iter()
            .map(|i| (i.meal_type.as_str(), i.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Breakfast", "All Day Coffee"),
                ("Breakfast", "Omelet"),
                ("Lunch", "All Day Coffee")
            ]
        );
        // first occurrence wins
        assert!(items[0].labels.is_empty());
        assert_eq!(items[1].labels, vec!["Eggs"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let mut normalizer = Normalizer::new(date(), IdStrategy::Random);
        let items = normalizer.normalize_all(vec![
            raw("lunch", "Grill", "Fries", &[]),
            raw("lunch", "Grill", "Fries", &[]),
            raw("dinner", "Grill", "Fries", &[]),
            raw("dinner", "Deli", "Turkey Club", &["Gluten"]),
        ]);
        assert_eq!(items.len(), 3);
        assert_eq!(dedup(items.clone()), items);
        assert_eq!(dedup(dedup(items.clone())), items);

        // feeding the survivors through a fresh session keeps every one of them
        let mut again = Normalizer::new(date(), IdStrategy::Random);
        let renormalized = again.normalize_all(items.iter().map(|i| RawMenuEntry {
            hall_id: i.hall_id.clone(),
            meal_label: i.meal_type.clone(),
            section_name: i.category.clone(),
            item_name: i.name.clone(),
            allergen_labels: i.labels.iter().cloned().collect(),
        }));
        let strip = |items: &[NormalizedItem]| -> Vec<_> {
            items
                .iter()
                .map(|i| (i.meal_type.clone(), i.category.clone(), i.name.clone(), i.labels.clone()))
                .collect()
        };
        assert_eq!(strip(&renormalized), strip(&items));
    }

    #[test]
    fn test_rejects_names_empty_after_cleanup() {
        let mut normalizer = Normalizer::new(date(), IdStrategy::Random);
        assert!(normalizer.push(raw("lunch", "Grill", "\"\"", &[])).is_none());
        assert!(normalizer.push(raw("lunch", "Grill", "\"a\"", &[])).is_none());
    }

    #[test]
    fn test_blank_section_becomes_main() {
        let mut normalizer = Normalizer::new(date(), IdStrategy::Random);
        let item = normalizer.push(raw("lunch", "  ", "Soup", &[])).unwrap();
        assert_eq!(item.category, "Main");
    }

    #[test]
    fn test_random_ids_are_unique() {
        let mut normalizer = Normalizer::new(date(), IdStrategy::Random);
        let items = normalizer.normalize_all(
            (0..50).map(|i| raw("lunch", "Grill", &format!("Item {i}"), &[])),
        );
        let ids: HashSet<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_content_ids_are_stable() {
        let run = || {
            Normalizer::new(date(), IdStrategy::ContentDerived)
                .push(raw("lunch", "Grill", "Fries", &[]))
                .unwrap()
                .id
        };
        assert_eq!(run(), run());
        let other_day = Normalizer::new(date().succ_opt().unwrap(), IdStrategy::ContentDerived)
            .push(raw("lunch", "Grill", "Fries", &[]))
            .unwrap()
            .id;
        assert_ne!(run(), other_day);
    }

    #[test]
    fn test_id_strategy_from_str() {
        assert_eq!("random".parse::<IdStrategy>(), Ok(IdStrategy::Random));
        assert_eq!("Content".parse::<IdStrategy>(), Ok(IdStrategy::ContentDerived));
        assert!("sha".parse::<IdStrategy>().is_err());
    }
}
