//! Crypto market data abstractions.

use crate::core::series::DailyPoint;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Number of top markets fetched per run. The ranked set is queried fresh
/// every run and never cached.
pub const TOP_MARKET_COUNT: usize = 20;

/// One entry of a ranked-markets query.
#[derive(Debug, Clone)]
pub struct CoinListing {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait CryptoMarketProvider: Send + Sync {
    /// Top `count` market entities ordered by market capitalization
    /// descending, priced in `vs_currency`.
    async fn top_markets(&self, vs_currency: &str, count: usize) -> Result<Vec<CoinListing>>;

    /// Daily price series for one entity over the inclusive date range,
    /// one point per calendar day. Days without samples are dropped.
    async fn daily_prices(
        &self,
        id: &str,
        vs_currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>>;
}
