use std::time::Instant;

use chrono::{DateTime, Local, NaiveDate};
use scraper::Html;

use crate::{
    aggregate::{Aggregator, Generation},
    config::{Config, Hall},
    fetch::{date_iter, fetch_with_retry, PageSource},
    normalize::{NormalizedItem, Normalizer},
    parse,
    store::{Backup, Store},
};

const DAYS_IN_WEEK: u32 = 7;

/// Runs generations: scrape every hall for every day of the horizon, back the result up and
/// publish it.
#[derive(Debug)]
pub struct Updater<S> {
    source: S,
    config: Config,
    store: Store,
    backup: Backup,
}

impl<S: PageSource> Updater<S> {
    pub const fn new(source: S, config: Config, store: Store, backup: Backup) -> Self {
        Self {
            source,
            config,
            store,
            backup,
        }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// One generation starting today. Returns whether a non-empty generation was published.
    pub async fn run(&self) -> bool {
        self.run_at(Local::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Local>) -> bool {
        let start = Instant::now();
        let generation = self.generate(now.date_naive()).await;
        if generation.is_empty() {
            log::warn!("No menu items were collected, keeping the previous generation");
            return false;
        }
        log::info!(
            "Collected {} menu items in {:?}",
            generation.items().len(),
            start.elapsed()
        );

        if let Err(e) = self.backup.save(&generation, &now).await {
            log::error!("Failed to write backups: {e}");
        }

        match self.store.publish(&generation).await {
            Ok(()) => {
                log::info!("Menu update completed successfully");
                true
            }
            Err(e) => {
                log::error!("Failed to publish menus: {e}");
                false
            }
        }
    }

    /// Scrapes `horizon_days` days starting at `today`. Halls that cannot be fetched contribute
    /// an empty menu for that day.
    pub async fn generate(&self, today: NaiveDate) -> Generation {
        if self.config.horizon_days > DAYS_IN_WEEK {
            log::warn!(
                "A horizon of {} days wraps around the week, later days replace earlier ones",
                self.config.horizon_days
            );
        }
        let mut aggregator = Aggregator::new();
        for date in date_iter(today, self.config.horizon_days) {
            for hall in &self.config.halls {
                let items = match self.scrape(hall, date).await {
                    Ok(items) => items,
                    Err(e) => {
                        log::error!("{}: failed to fetch menus for {date}: {e}", hall.hall_id);
                        Vec::new()
                    }
                };
                log::info!("{}: {} items on {date}", hall.hall_id, items.len());
                aggregator.insert(date, &hall.hall_id, items);
            }
        }
        aggregator.finish()
    }

    // one normalizer per hall/date so overlapping meal selections dedup against each other
    async fn scrape(&self, hall: &Hall, date: NaiveDate) -> crate::Result<Vec<NormalizedItem>> {
        let mut normalizer = Normalizer::new(date, self.config.id_strategy);
        let mut items = Vec::new();
        for meal in &self.config.meals {
            let page = fetch_with_retry(
                &self.source,
                hall,
                date,
                meal,
                self.config.retry_attempts,
                self.config.retry_delay,
            )
            .await?;
            let start = Instant::now();
            let document = Html::parse_document(&page);
            items.extend(normalizer.normalize_all(parse::extract(&document, &hall.hall_id, meal)));
            log::trace!("Parsed {} {meal:?} in \t {:?}", hall.hall_id, start.elapsed());
        }
        Ok(items)
    }
}
