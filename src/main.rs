#![deny(unused_crate_dependencies)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod aggregate;
mod config;
mod error;
mod fetch;
mod normalize;
mod parse;
mod schedule;
mod store;
mod update;

use std::{env, process::ExitCode};

use chrono::Local;
use clap::Parser;

use crate::{
    config::Config,
    fetch::{make_client, HttpSource, PageSource},
    store::{Backup, Store},
    update::Updater,
};

pub use error::Result;

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Scrapes the USC residential dining menus and publishes them as weekly menus.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Run one update and exit instead of following MENU_SCHEDULE.
    #[arg(long, env = "MENU_RUN_ONCE")]
    run_once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<bool> {
    let config = Config::from_env()?;
    let client = make_client()?;
    let store = Store::from_config(&config, client.clone())?;
    let backup = Backup::open(&config.backup_dir).await?;
    let source = HttpSource::new(client, config.base_url.clone());
    let updater = Updater::new(source, config, store, backup);

    if cli.run_once {
        log::info!("Running a single menu update");
        return Ok(updater.run().await);
    }

    tokio::select! {
        () = follow_schedule(&updater) => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            log::info!("Received Ctrl-C, shutting down");
        }
    }
    Ok(true)
}

async fn follow_schedule<S: PageSource>(updater: &Updater<S>) {
    let times = &updater.config().schedule;
    log::info!(
        "Scheduled mode, updating daily at {}",
        times
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    loop {
        let now = Local::now().naive_local();
        let next = schedule::next_run_after(now, times);
        log::info!("Next update at {next}");
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
        if !updater.run().await {
            log::warn!("Menu update failed, trying again at the next scheduled time");
        }
    }
}
