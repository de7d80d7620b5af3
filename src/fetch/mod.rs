use std::{num::NonZeroU32, sync::OnceLock, time::Duration};

use chrono::NaiveDate;
use governor::{
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use reqwest::Client;
use tracing::{instrument, Level};
use url::Url;

use crate::config::Hall;

static RATE_LIMIT: u32 = 2;
static DELAY_JITTER: u64 = 1;
static REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
static RATE_LIMITER: OnceLock<
    governor::RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>,
> = OnceLock::new();

/// Anything that can hand back the menu page for a (hall, date, meal selector).
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch(&self, hall: &Hall, date: NaiveDate, meal: &str) -> crate::Result<String>;
}

pub fn make_client() -> crate::Result<Client> {
    Ok(Client::builder()
        .gzip(true)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// `?menu_venue=venue-518&menu_date=March+4%2C+2025&menu_meal=lunch`
pub fn menu_url(base_url: &Url, hall: &Hall, date: NaiveDate, meal: &str) -> Url {
    let mut url = base_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("menu_venue", &hall.site_selector_value)
            .append_pair("menu_date", &date.format("%B %-d, %Y").to_string());
        if !meal.trim().is_empty() {
            query.append_pair("menu_meal", meal.trim());
        }
    }
    url
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    pub const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

impl PageSource for HttpSource {
    #[instrument(skip(self, hall, date), fields(
        hall = %hall.hall_id,
        date = %date.format("%Y-%m-%d"),
    ), level = Level::TRACE)]
    async fn fetch(&self, hall: &Hall, date: NaiveDate, meal: &str) -> crate::Result<String> {
        let rate_limiter = RATE_LIMITER.get_or_init(|| {
            governor::RateLimiter::direct(governor::Quota::per_second(
                NonZeroU32::new(RATE_LIMIT).expect("rate limit should be non-zero"),
            ))
        });
        let jitter = governor::Jitter::new(Duration::ZERO, Duration::from_secs(DELAY_JITTER));
        rate_limiter.until_ready_with_jitter(jitter).await;

        let url = menu_url(&self.base_url, hall, date, meal);
        log::debug!("GET {url}");
        let start = std::time::Instant::now();
        let res = self.client.get(url).send().await?.error_for_status()?;
        let text = res.text().await?;
        log::trace!("Got menu page for {} in \t {:?}", hall.hall_id, start.elapsed());
        Ok(text)
    }
}

/// Fetches a page, retrying the request up to `attempts` times with a fixed `delay` between
/// tries. Returns the last error once attempts run out.
pub async fn fetch_with_retry<S: PageSource>(
    source: &S,
    hall: &Hall,
    date: NaiveDate,
    meal: &str,
    attempts: u32,
    delay: Duration,
) -> crate::Result<String> {
    let mut attempt = 1;
    loop {
        match source.fetch(hall, date, meal).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt < attempts => {
                log::warn!(
                    "fetching {} {date} {meal:?} failed (attempt {attempt}/{attempts}): {e}",
                    hall.hall_id
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn date_iter(start: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(count)).map(move |x| start + chrono::Duration::days(x))
}
