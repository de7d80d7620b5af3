mod backup;
mod csv;
#[cfg(test)]
pub mod rest_stub;
mod supabase;

use reqwest::Client;

use crate::{aggregate::Generation, config::Config};

pub use backup::Backup;
use supabase::Supabase;

/// Where a finished generation gets published.
#[derive(Debug)]
#[non_exhaustive]
pub enum Store {
    Supabase(Supabase),
    /// Nothing is published; only the backups are kept.
    AdHoc,
}

impl Store {
    pub fn from_config(config: &Config, client: Client) -> crate::Result<Self> {
        match &config.supabase {
            Some(supabase) => Supabase::open(supabase, client, config.batch_size).map(Self::Supabase),
            None => {
                log::warn!("SUPABASE_URL not set, menus will only be written to backups.");
                Ok(Self::AdHoc)
            }
        }
    }

    pub async fn publish(&self, generation: &Generation) -> crate::Result<()> {
        match self {
            Self::Supabase(db) => db.save(generation).await,
            Self::AdHoc => Ok(()),
        }
    }
}
