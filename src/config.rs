use std::{env, path::PathBuf, str::FromStr, time::Duration};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::Error, normalize::IdStrategy};

const DEFAULT_BASE_URL: &str = "https://hospitality.usc.edu/residential-dining-menus/";
const DEFAULT_MEALS: [&str; 4] = ["breakfast", "brunch", "lunch", "dinner"];
const DEFAULT_SCHEDULE: [&str; 3] = ["06:00", "12:00", "18:00"];

/// A dining venue and the value the menu widget uses to select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hall {
    pub hall_id: String,
    pub display_name: String,
    pub site_selector_value: String,
}

impl Hall {
    pub fn new(hall_id: &str, display_name: &str, site_selector_value: &str) -> Self {
        Self {
            hall_id: hall_id.to_string(),
            display_name: display_name.to_string(),
            site_selector_value: site_selector_value.to_string(),
        }
    }
}

pub fn default_halls() -> Vec<Hall> {
    vec![
        Hall::new("parkside", "Parkside Restaurant & Grill", "venue-518"),
        Hall::new("village", "Village Dining Hall", "venue-27229"),
        Hall::new("evk", "Everybody's Kitchen", "venue-514"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: Url,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub halls: Vec<Hall>,
    /// Meal selector values, one fetch per value. An empty value fetches the unfiltered page.
    pub meals: Vec<String>,
    pub horizon_days: u32,
    pub backup_dir: PathBuf,
    pub schedule: Vec<NaiveTime>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub batch_size: usize,
    pub id_strategy: IdStrategy,
    pub supabase: Option<SupabaseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url should be valid"),
            halls: default_halls(),
            meals: DEFAULT_MEALS.iter().map(ToString::to_string).collect(),
            horizon_days: 7,
            backup_dir: PathBuf::from("."),
            schedule: DEFAULT_SCHEDULE
                .iter()
                .map(|t| NaiveTime::parse_from_str(t, "%H:%M").expect("default times should be valid"))
                .collect(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
            batch_size: 100,
            id_strategy: IdStrategy::Random,
            supabase: None,
        }
    }
}

impl Config {
    /// Reads an optional `.env` file, then the process environment.
    pub fn from_env() -> crate::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("no .env file loaded: {e}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("MENU_BASE_URL") {
            config.base_url = Url::parse(url.trim())?;
        }
        if let Some(halls) = var("MENU_HALLS") {
            config.halls = serde_json::from_str(&halls)
                .map_err(|e| Error::config_error(format!("MENU_HALLS: {e}")))?;
        }
        if let Some(meals) = var("MENU_MEALS") {
            config.meals = meals.split(',').map(|m| m.trim().to_string()).collect();
        }
        if let Some(times) = var("MENU_SCHEDULE") {
            config.schedule = times
                .split(',')
                .map(|t| {
                    NaiveTime::parse_from_str(t.trim(), "%H:%M")
                        .map_err(|e| Error::config_error(format!("MENU_SCHEDULE {t:?}: {e}")))
                })
                .collect::<crate::Result<_>>()?;
        }
        if let Some(dir) = var("MENU_BACKUP_DIR") {
            config.backup_dir = PathBuf::from(dir);
        }
        config.horizon_days = parse_var(&var, "MENU_HORIZON_DAYS", config.horizon_days)?;
        config.retry_attempts = parse_var(&var, "MENU_RETRY_ATTEMPTS", config.retry_attempts)?;
        config.retry_delay = Duration::from_secs(parse_var(
            &var,
            "MENU_RETRY_DELAY_SECS",
            config.retry_delay.as_secs(),
        )?);
        config.batch_size = parse_var(&var, "MENU_BATCH_SIZE", config.batch_size)?;
        config.id_strategy = parse_var(&var, "MENU_ID_STRATEGY", config.id_strategy)?;

        config.supabase = match (var("SUPABASE_URL"), var("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseConfig {
                url: Url::parse(url.trim())?,
                key,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::config_error(
                    "SUPABASE_URL and SUPABASE_KEY must be set together",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.halls.is_empty() {
            return Err(Error::config_error("at least one hall is required"));
        }
        if self.meals.is_empty() {
            return Err(Error::config_error("at least one meal selector is required"));
        }
        if self.horizon_days == 0 {
            return Err(Error::config_error("MENU_HORIZON_DAYS must be positive"));
        }
        if self.batch_size == 0 {
            return Err(Error::config_error("MENU_BATCH_SIZE must be positive"));
        }
        if self.retry_attempts == 0 {
            return Err(Error::config_error("MENU_RETRY_ATTEMPTS must be positive"));
        }
        Ok(())
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> crate::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key).map_or(Ok(default), |v| {
        v.trim()
            .parse()
            .map_err(|e| Error::config_error(format!("{key}={v:?}: {e}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> crate::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.halls.len(), 3);
        assert_eq!(config.halls[0].site_selector_value, "venue-518");
        assert_eq!(config.horizon_days, 7);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.schedule.len(), 3);
        assert_eq!(config.id_strategy, IdStrategy::Random);
        assert!(config.supabase.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MENU_HORIZON_DAYS", "10"),
            ("MENU_MEALS", "lunch, dinner"),
            ("MENU_SCHEDULE", "07:30"),
            ("MENU_ID_STRATEGY", "content"),
            (
                "MENU_HALLS",
                r#"[{"hall_id":"evk","display_name":"Everybody's Kitchen","site_selector_value":"venue-514"}]"#,
            ),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.horizon_days, 10);
        assert_eq!(config.meals, vec!["lunch", "dinner"]);
        assert_eq!(config.schedule, vec![NaiveTime::from_hms_opt(7, 30, 0).unwrap()]);
        assert_eq!(config.id_strategy, IdStrategy::ContentDerived);
        assert_eq!(config.halls, vec![Hall::new("evk", "Everybody's Kitchen", "venue-514")]);
        assert_eq!(config.supabase.unwrap().key, "secret");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config_from(&[("MENU_HORIZON_DAYS", "soon")]), Err(Error::Config(_))));
        assert!(matches!(config_from(&[("MENU_HORIZON_DAYS", "0")]), Err(Error::Config(_))));
        assert!(matches!(config_from(&[("MENU_SCHEDULE", "6am")]), Err(Error::Config(_))));
        assert!(matches!(config_from(&[("MENU_HALLS", "[]")]), Err(Error::Config(_))));
        assert!(matches!(
            config_from(&[("SUPABASE_URL", "https://example.supabase.co")]),
            Err(Error::Config(_))
        ));
    }
}
