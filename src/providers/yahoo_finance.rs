use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::core::fiat::FiatRateProvider;
use crate::core::series::DailyPoint;
use crate::providers::http_client;

// Yahoo Finance FX adapter. Currency pairs are chart symbols of the form
// "{FROM}{TO}=X"; a pair Yahoo does not know yields an empty series rather
// than an error, which drives the inverted-pair fallback.
pub struct YahooFxProvider {
    base_url: String,
}

impl YahooFxProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFxProvider {
            base_url: base_url.to_string(),
        }
    }

    async fn fetch_pair(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>> {
        let symbol = format!("{from}{to}=X");
        let period1 = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let period2 = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, symbol, period1, period2
        );
        debug!("Requesting daily rates from {}", url);

        let client = http_client()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        // Yahoo answers unknown pairs with 404; that is "no data", not a
        // failure.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No data for currency pair: {}", symbol);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: ChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let Some(item) = data.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let (Some(timestamps), Some(closes)) = (
            item.timestamp,
            item.indicators
                .and_then(|inds| inds.quote.into_iter().next())
                .and_then(|q| q.close),
        ) else {
            return Ok(Vec::new());
        };

        let mut points: Vec<DailyPoint> = timestamps
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                DateTime::from_timestamp(*ts, 0).map(|dt| DailyPoint::new(dt.date_naive(), close))
            })
            .collect();

        // Yahoo occasionally repeats a day (e.g. a trailing partial bar).
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

fn constant_series(start: NaiveDate, end: NaiveDate, value: f64) -> Vec<DailyPoint> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| DailyPoint::new(date, Some(value)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Debug, Deserialize)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[async_trait]
impl FiatRateProvider for YahooFxProvider {
    async fn daily_rates(
        &self,
        code: &str,
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>> {
        let code = code.to_uppercase();
        let base = base.to_uppercase();

        // A currency against itself is a constant series; no call needed.
        if code == base {
            return Ok(constant_series(start, end, 1.0));
        }

        let direct = self.fetch_pair(&code, &base, start, end).await?;
        if !direct.is_empty() {
            return Ok(direct);
        }

        debug!("Falling back to inverted pair for {}/{}", code, base);
        let inverted = self.fetch_pair(&base, &code, start, end).await?;
        Ok(inverted
            .into_iter()
            .map(|p| DailyPoint::new(p.date, p.value.map(|v| 1.0 / v)))
            .collect())
    }
}
