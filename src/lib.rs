pub mod acquisition;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

pub enum AppCommand {
    Fetch {
        start: NaiveDate,
        end: NaiveDate,
        base_currency: Option<String>,
    },
    History {
        asset: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Global Asset Tracker starting...");

    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Fetch {
            start,
            end,
            base_currency,
        } => {
            let base = base_currency.unwrap_or_else(|| config.currency.clone());
            cli::fetch::run(&config, start, end, &base).await
        }
        AppCommand::History { asset, start, end } => cli::history::run(&config, &asset, start, end),
    }
}
