mod allergens;
mod error;
mod menu_page;
mod raw_entry;
mod remove_excess_whitespace;
mod static_selector;
mod text_from_selection;

pub use allergens::AllergenLabels;
pub use error::Error;
pub use menu_page::extract;
pub use raw_entry::{RawMenuEntry, DEFAULT_SECTION};
pub use remove_excess_whitespace::remove_excess_whitespace;
