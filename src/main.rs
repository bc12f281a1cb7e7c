use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use gat::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for gat::AppCommand {
    fn from(cmd: Commands) -> gat::AppCommand {
        let today = Utc::now().date_naive();
        let year_ago = today - Duration::days(365);
        match cmd {
            Commands::Fetch { start, end, base } => gat::AppCommand::Fetch {
                start: start.unwrap_or(year_ago),
                end: end.unwrap_or(today),
                base_currency: base,
            },
            Commands::History { asset, start, end } => gat::AppCommand::History {
                asset,
                start: start.unwrap_or(year_ago),
                end: end.unwrap_or(today),
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch market data and display the summary tables
    Fetch {
        /// First day of the range (YYYY-MM-DD); defaults to one year ago
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of the range (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Base currency for prices and rates
        #[arg(long)]
        base: Option<String>,
    },
    /// Display a cached daily series for a coin id or fiat code
    History {
        /// Coin id (e.g. "bitcoin") or fiat code (e.g. "EUR")
        asset: String,
        /// First day of the range (YYYY-MM-DD); defaults to one year ago
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of the range (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => gat::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = gat::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  coingecko:
    base_url: "https://api.coingecko.com"
  yahoo:
    base_url: "https://query1.finance.yahoo.com"

currency: "USD"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
