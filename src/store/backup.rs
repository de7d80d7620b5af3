use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tokio::fs;

use super::csv::to_csv_bytes;
use crate::aggregate::Generation;

const MENU_ITEM_COLUMNS: [&str; 6] = [
    "menu_item_uuid",
    "name",
    "image_url",
    "category",
    "featured",
    "labels",
];
const ASSIGNMENT_COLUMNS: [&str; 4] = [
    "day_of_week",
    "dining_option_string_id",
    "menu_item_uuid",
    "meal_type",
];

/// Timestamped JSON and CSV snapshots of a generation, written next to each other.
#[derive(Debug)]
pub struct Backup(PathBuf);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFiles {
    pub json: PathBuf,
    pub menu_items: PathBuf,
    pub assignments: PathBuf,
}

impl Backup {
    pub async fn open(dir: impl AsRef<Path>) -> crate::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        Ok(Self(dir.to_owned()))
    }

    pub async fn save<Tz>(
        &self,
        generation: &Generation,
        at: &DateTime<Tz>,
    ) -> crate::Result<BackupFiles>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let stamp = at.format("%Y%m%d_%H%M%S");
        let files = BackupFiles {
            json: self.0.join(format!("usc_dining_menus_{stamp}.json")),
            menu_items: self.0.join(format!("menu_items_{stamp}.csv")),
            assignments: self.0.join(format!("dining_option_menu_items_{stamp}.csv")),
        };

        fs::write(&files.json, serde_json::to_vec_pretty(generation.menus())?).await?;
        log::info!("Saved backup JSON: {}", files.json.display());

        let items = generation
            .items()
            .iter()
            .map(|item| -> crate::Result<Vec<String>> {
                Ok(vec![
                    item.id.to_string(),
                    item.name.clone(),
                    item.image_url.clone(),
                    item.category.clone(),
                    item.featured.to_string(),
                    serde_json::to_string(&item.labels)?,
                ])
            })
            .collect::<crate::Result<Vec<_>>>()?;
        fs::write(&files.menu_items, to_csv_bytes(&MENU_ITEM_COLUMNS, &items)?).await?;
        log::info!("Saved backup CSV: {}", files.menu_items.display());

        let assignments: Vec<_> = generation
            .assignments()
            .iter()
            .map(|a| {
                vec![
                    a.day_of_week.to_string(),
                    a.hall_id.clone(),
                    a.menu_item_id.to_string(),
                    a.meal_type.clone(),
                ]
            })
            .collect();
        fs::write(
            &files.assignments,
            to_csv_bytes(&ASSIGNMENT_COLUMNS, &assignments)?,
        )
        .await?;
        log::info!("Saved backup CSV: {}", files.assignments.display());

        Ok(files)
    }

    #[cfg(test)]
    pub async fn load_json(path: impl AsRef<Path>) -> crate::Result<crate::aggregate::WeeklyMenus> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::{
        aggregate::{Aggregator, DayOfWeek},
        normalize::{IdStrategy, Normalizer},
        parse::{AllergenLabels, RawMenuEntry},
    };

    fn generation() -> Generation {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let mut normalizer = Normalizer::new(date, IdStrategy::Random);
        let items = normalizer.normalize_all([
            RawMenuEntry {
                hall_id: "evk".into(),
                meal_label: "lunch".into(),
                section_name: "Hot Line".into(),
                item_name: "Mac, Cheese".into(),
                allergen_labels: ["Dairy".to_string(), "Gluten".to_string()]
                    .into_iter()
                    .collect::<AllergenLabels>(),
            },
            RawMenuEntry {
                hall_id: "evk".into(),
                meal_label: "dinner".into(),
                section_name: "Fresh From The Farm".into(),
                item_name: "Kale Salad".into(),
                allergen_labels: AllergenLabels::default(),
            },
        ]);
        let mut aggregator = Aggregator::new();
        aggregator.insert(date, "evk", items);
        aggregator.finish()
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backup = Backup::open(dir.path().join("backups")).await.unwrap();
        let generation = generation();
        let files = backup.save(&generation, &Utc::now()).await.unwrap();

        let menus = Backup::load_json(&files.json).await.unwrap();
        assert_eq!(&menus, generation.menus());
        assert_eq!(Generation::from_menus(menus), generation);
        let hall = generation.menus().hall(DayOfWeek::Tuesday, "evk").unwrap();
        assert_eq!(hall["Lunch"][0].labels, vec!["Dairy", "Gluten"]);
    }

    #[tokio::test]
    async fn test_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let backup = Backup::open(dir.path()).await.unwrap();
        let generation = generation();
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 6, 0, 0).unwrap();
        let files = backup.save(&generation, &at).await.unwrap();
        assert!(files.menu_items.ends_with("menu_items_20250304_060000.csv"));

        let items = std::fs::read_to_string(&files.menu_items).unwrap();
        let mut lines = items.lines();
        assert_eq!(
            lines.next(),
            Some("menu_item_uuid,name,image_url,category,featured,labels")
        );
        let lunch = generation.items().iter().find(|i| i.name == "Mac, Cheese").unwrap();
        assert!(items.contains(&format!(
            "{},\"Mac, Cheese\",,Hot Line,false,\"[\"\"Dairy\"\",\"\"Gluten\"\"]\"",
            lunch.id
        )));

        let assignments = std::fs::read_to_string(&files.assignments).unwrap();
        assert_eq!(assignments.lines().count(), 3);
        assert!(assignments.contains(&format!("Tuesday,evk,{},Lunch", lunch.id)));
    }
}
