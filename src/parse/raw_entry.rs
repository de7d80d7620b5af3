use super::allergens::AllergenLabels;

pub const DEFAULT_SECTION: &str = "Main";
pub const FALLBACK_MEAL: &str = "menu";

/// One item node as it was found on the page, before any cleanup or dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMenuEntry {
    pub hall_id: String,
    /// Resolved from the page or the selector used to fetch it; `menu` as a last resort.
    pub meal_label: String,
    pub section_name: String,
    pub item_name: String,
    pub allergen_labels: AllergenLabels,
}
