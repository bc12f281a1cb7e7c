use super::ui;
use crate::acquisition::{self, AcquisitionParams, AssetSummary, RunEvent};
use crate::core::config::AppConfig;
use crate::core::{FIAT_CURRENCIES, TOP_MARKET_COUNT};
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::yahoo_finance::YahooFxProvider;
use crate::store::PriceCache;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use comfy_table::{Cell, CellAlignment};
use std::sync::Arc;

pub async fn run(
    config: &AppConfig,
    start: NaiveDate,
    end: NaiveDate,
    base_currency: &str,
) -> Result<()> {
    if start > end {
        bail!("Start date must be on or before end date");
    }

    let coingecko_base = config
        .providers
        .coingecko
        .as_ref()
        .map_or("https://api.coingecko.com", |p| &p.base_url);
    let yahoo_base = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let crypto = Arc::new(CoinGeckoProvider::new(coingecko_base));
    let fiat = Arc::new(YahooFxProvider::new(yahoo_base));

    let cache = Arc::new(PriceCache::new(config.default_data_path()?.join("cache")));
    cache
        .init()
        .context("Failed to initialize the price cache")?;

    let base = base_currency.to_uppercase();
    let params = AcquisitionParams {
        start,
        end,
        base_currency: base.clone(),
    };

    let pb = ui::new_progress_bar((TOP_MARKET_COUNT + FIAT_CURRENCIES.len()) as u64, true);
    pb.set_message("Loading market data...");

    let mut handle = acquisition::spawn(params, crypto, fiat, cache);
    let result = loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(RunEvent::Progress { current, total }) => {
                    pb.set_length(total as u64);
                    pb.set_position(current as u64);
                }
                Some(RunEvent::Log(line)) => {
                    pb.println(ui::style_text(&line, ui::StyleType::Subtle));
                }
                Some(RunEvent::Finished(result)) => break result,
                Some(RunEvent::Failed(message)) => {
                    pb.finish_and_clear();
                    bail!(message);
                }
                None => {
                    pb.finish_and_clear();
                    bail!("Acquisition run ended without a result");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                pb.println(ui::style_text(
                    "Stop requested; finishing the entity in flight...",
                    ui::StyleType::Subtle,
                ));
            }
        }
    };
    pb.finish_and_clear();

    println!("{}", display_crypto_table(&result.cryptos, &base));
    ui::print_separator();
    println!("{}", display_fiat_table(&result.fiats));
    println!(
        "\n{}",
        ui::style_text(
            "Run `gat history <asset>` to inspect a cached daily series.",
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

fn display_crypto_table(cryptos: &[AssetSummary], base: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Crypto"),
        ui::header_cell("Id"),
        ui::header_cell(&format!("Average Price ({base})")),
        ui::header_cell("Days"),
    ]);

    for summary in cryptos {
        let average = ui::format_optional_cell(summary.average, |v| format!("{v:.4}"));
        table.add_row(vec![
            Cell::new(&summary.name),
            Cell::new(&summary.id),
            average,
            Cell::new(summary.history.len()).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Cryptocurrencies (Top 20)", ui::StyleType::Title),
        table
    )
}

fn display_fiat_table(fiats: &[AssetSummary]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Average Rate"),
        ui::header_cell("Days"),
    ]);

    for summary in fiats {
        let average = ui::format_optional_cell(summary.average, |v| format!("{v:.6}"));
        table.add_row(vec![
            Cell::new(format!("{} ({})", summary.name, summary.id)),
            average,
            Cell::new(summary.history.len()).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Fiat Currencies", ui::StyleType::Title),
        table
    )
}
