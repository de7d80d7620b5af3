use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use url::Url;

use crate::{aggregate::Generation, config::SupabaseConfig, error::Error};

const MENU_ITEMS: &str = "menu_items";
const ASSIGNMENTS: &str = "dining_option_menu_items";
// every row of both tables has one, so this filter matches the whole table
const MATCH_ALL: (&str, &str) = ("menu_item_uuid", "not.is.null");

/// Supabase over its PostgREST endpoint.
#[derive(Debug)]
pub struct Supabase {
    client: Client,
    rest_url: Url,
    key: String,
    batch_size: usize,
}

impl Supabase {
    pub fn open(config: &SupabaseConfig, client: Client, batch_size: usize) -> crate::Result<Self> {
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            client,
            rest_url: base.join("rest/v1/")?,
            key: config.key.clone(),
            batch_size: batch_size.max(1),
        })
    }

    fn table_url(&self, table: &str) -> crate::Result<Url> {
        Ok(self.rest_url.join(table)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "return=minimal")
    }

    /// Deletes the previous generation. Assignments go first because they reference items.
    pub async fn clear(&self) -> crate::Result<()> {
        for table in [ASSIGNMENTS, MENU_ITEMS] {
            log::info!("Clearing existing {table}...");
            let request = self
                .client
                .delete(self.table_url(table)?)
                .query(&[MATCH_ALL]);
            check(self.authorized(request).send().await?).await?;
        }
        log::info!("Successfully cleared existing data");
        Ok(())
    }

    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> crate::Result<()> {
        log::info!("Uploading {} rows to {table}...", rows.len());
        let batches = rows.len().div_ceil(self.batch_size);
        for (i, batch) in rows.chunks(self.batch_size).enumerate() {
            let request = self.client.post(self.table_url(table)?).json(batch);
            check(self.authorized(request).send().await?).await?;
            log::info!("Uploaded {table} batch {}/{batches}", i + 1);
        }
        Ok(())
    }

    /// Replaces whatever is stored with `generation`.
    ///
    /// There is no swap: a failure after `clear` leaves the tables partially filled.
    pub async fn save(&self, generation: &Generation) -> crate::Result<()> {
        self.clear().await?;
        self.insert(MENU_ITEMS, generation.items()).await?;
        self.insert(ASSIGNMENTS, generation.assignments()).await?;
        log::info!("Successfully uploaded all data to Supabase");
        Ok(())
    }
}

async fn check(res: Response) -> crate::Result<Response> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        let url = res.url().clone();
        let body = res.text().await.unwrap_or_default();
        Err(Error::Database(format!("{status} from {url}: {body}")))
    }
}
