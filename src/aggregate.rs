use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display, Formatter},
};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::{dedup, NormalizedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Indexed by `num_days_from_monday`.
const WEEKDAYS: [DayOfWeek; 7] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
    DayOfWeek::Sunday,
];

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        WEEKDAYS[date.weekday().num_days_from_monday() as usize]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

impl Display for DayOfWeek {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One item as it appears in the nested JSON backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub menu_item_uuid: Uuid,
    pub name: String,
    pub labels: Vec<String>,
    pub image_url: String,
    pub category: String,
    pub featured: bool,
}

impl From<NormalizedItem> for MenuEntry {
    fn from(item: NormalizedItem) -> Self {
        Self {
            menu_item_uuid: item.id,
            name: item.name,
            labels: item.labels,
            image_url: String::new(),
            category: item.category,
            featured: false,
        }
    }
}

/// meal type -> items
pub type HallMenus = BTreeMap<String, Vec<MenuEntry>>;

/// day -> hall id -> meal type -> items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyMenus(BTreeMap<DayOfWeek, BTreeMap<String, HallMenus>>);

impl WeeklyMenus {
    #[cfg(test)]
    pub fn hall(&self, day: DayOfWeek, hall_id: &str) -> Option<&HallMenus> {
        self.0.get(&day).and_then(|halls| halls.get(hall_id))
    }

    pub fn item_count(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}

/// Row of the `menu_items` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "menu_item_uuid")]
    pub id: Uuid,
    pub name: String,
    pub image_url: String,
    pub category: String,
    pub featured: bool,
    pub labels: Vec<String>,
}

/// Row of the `dining_option_menu_items` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuAssignment {
    pub day_of_week: DayOfWeek,
    #[serde(rename = "dining_option_string_id")]
    pub hall_id: String,
    #[serde(rename = "menu_item_uuid")]
    pub menu_item_id: Uuid,
    pub meal_type: String,
}

/// Everything one run produced. Replaces the previous generation wholesale when published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    menus: WeeklyMenus,
    items: Vec<MenuItem>,
    assignments: Vec<MenuAssignment>,
}

impl Generation {
    /// Flattens the nested menus into the two relations, one row of each per item.
    pub fn from_menus(menus: WeeklyMenus) -> Self {
        let mut items = Vec::with_capacity(menus.item_count());
        let mut assignments = Vec::with_capacity(menus.item_count());
        for (day, halls) in &menus.0 {
            for (hall_id, meals) in halls {
                for (meal_type, entries) in meals {
                    for entry in entries {
                        items.push(MenuItem {
                            id: entry.menu_item_uuid,
                            name: entry.name.clone(),
                            image_url: entry.image_url.clone(),
                            category: entry.category.clone(),
                            featured: entry.featured,
                            labels: entry.labels.clone(),
                        });
                        assignments.push(MenuAssignment {
                            day_of_week: *day,
                            hall_id: hall_id.clone(),
                            menu_item_id: entry.menu_item_uuid,
                            meal_type: meal_type.clone(),
                        });
                    }
                }
            }
        }
        Self {
            menus,
            items,
            assignments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn menus(&self) -> &WeeklyMenus {
        &self.menus
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn assignments(&self) -> &[MenuAssignment] {
        &self.assignments
    }
}

/// Buckets normalized items by weekday and hall.
///
/// Buckets are keyed by weekday name, not calendar date: with a horizon longer than a week the
/// later date replaces the earlier one for the same hall.
#[derive(Debug, Default)]
pub struct Aggregator {
    menus: WeeklyMenus,
    filled: HashMap<(DayOfWeek, String), NaiveDate>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the menus of `hall_id` on `date`. An empty `items` still claims the bucket.
    pub fn insert(&mut self, date: NaiveDate, hall_id: &str, items: Vec<NormalizedItem>) {
        let day = DayOfWeek::of(date);
        let mut meals = HallMenus::new();
        for item in dedup(items) {
            meals
                .entry(item.meal_type.clone())
                .or_default()
                .push(item.into());
        }
        if let Some(previous) = self.filled.insert((day, hall_id.to_string()), date) {
            log::warn!("{hall_id}: menus for {date} replace {previous} in the {day} bucket");
        }
        self.menus
            .0
            .entry(day)
            .or_default()
            .insert(hall_id.to_string(), meals);
    }

    pub fn finish(self) -> Generation {
        Generation::from_menus(self.menus)
    }
}
