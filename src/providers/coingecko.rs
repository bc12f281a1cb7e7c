use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::core::crypto::{CoinListing, CryptoMarketProvider};
use crate::core::series::DailyPoint;
use crate::providers::http_client;

// CoinGecko market data adapter. Ranked markets come from /coins/markets;
// historical prices from /coins/{id}/market_chart/range as raw
// (epoch-millisecond, price) samples that get resampled to one point per
// calendar day.
pub struct CoinGeckoProvider {
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct MarketListing {
    id: String,
    name: String,
}

#[derive(Deserialize, Debug)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Vec<(i64, Option<f64>)>,
}

/// Averages same-day samples into one value per calendar day. Days without
/// samples are dropped, not emitted as missing.
fn resample_daily(samples: &[(i64, Option<f64>)]) -> Vec<DailyPoint> {
    let mut by_day: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for (ts_ms, price) in samples {
        let Some(price) = price else { continue };
        let Some(ts) = DateTime::from_timestamp_millis(*ts_ms) else {
            continue;
        };
        let entry = by_day.entry(ts.date_naive()).or_insert((0.0, 0));
        entry.0 += price;
        entry.1 += 1;
    }
    by_day
        .into_iter()
        .map(|(date, (sum, count))| DailyPoint::new(date, Some(sum / f64::from(count))))
        .collect()
}

#[async_trait]
impl CryptoMarketProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoTopMarkets", skip(self))]
    async fn top_markets(&self, vs_currency: &str, count: usize) -> Result<Vec<CoinListing>> {
        let url = format!(
            "{}/api/v3/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1",
            self.base_url, vs_currency, count
        );
        debug!("Requesting ranked markets from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ranked markets URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for ranked markets query",
                response.status()
            ));
        }

        let listings = response.json::<Vec<MarketListing>>().await?;
        Ok(listings
            .into_iter()
            .map(|m| CoinListing {
                id: m.id,
                name: m.name,
            })
            .collect())
    }

    #[instrument(
        name = "CoinGeckoDailyPrices",
        skip(self),
        fields(id = %id)
    )]
    async fn daily_prices(
        &self,
        id: &str,
        vs_currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>> {
        // Inclusive UTC day range: start of the first day to end of the last.
        let from_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let to_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();

        let url = format!(
            "{}/api/v3/coins/{}/market_chart/range?vs_currency={}&from={}&to={}",
            self.base_url, id, vs_currency, from_ts, to_ts
        );
        debug!("Requesting market chart from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for coin: {} URL: {}", e, id, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for coin: {}",
                response.status(),
                id
            ));
        }

        let data = response.json::<MarketChartResponse>().await?;
        Ok(resample_daily(&data.prices))
    }
}
