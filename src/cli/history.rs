use super::ui;
use crate::core::config::AppConfig;
use crate::core::mean;
use crate::store::PriceCache;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;

/// Displays the cached daily series for a coin id or fiat currency code.
/// Coin ids are looked up first; when nothing matches, the asset is treated
/// as a fiat code.
pub fn run(config: &AppConfig, asset: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        bail!("Start date must be on or before end date");
    }

    let cache = PriceCache::new(config.default_data_path()?.join("cache"));
    cache
        .init()
        .context("Failed to initialize the price cache")?;

    let points = cache.load_prices(asset, start, end)?;
    let (label, points) = if points.is_empty() {
        let code = asset.to_uppercase();
        let rates = cache.load_rates(&code, start, end)?;
        (code, rates)
    } else {
        (asset.to_string(), points)
    };

    if points.is_empty() {
        println!("No cached data for {asset} in the selected period.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Value")]);
    for point in &points {
        table.add_row(vec![
            Cell::new(point.date),
            ui::format_optional_cell(point.value, |v| format!("{v:.6}")),
        ]);
    }

    println!("{}\n\n{}", ui::style_text(&label, ui::StyleType::Title), table);

    let average = mean(&points).map_or("N/A".to_string(), |v| format!("{v:.6}"));
    println!(
        "\n{} {}",
        ui::style_text("Average:", ui::StyleType::TotalLabel),
        ui::style_text(&average, ui::StyleType::TotalValue)
    );
    Ok(())
}
