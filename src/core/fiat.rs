//! Fiat exchange rate abstractions and the tracked currency universe.

use crate::core::series::DailyPoint;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy)]
pub struct FiatCurrency {
    pub code: &'static str,
    pub name: &'static str,
}

/// The tracked fiat universe. Order here is the display and fetch order.
pub const FIAT_CURRENCIES: [FiatCurrency; 10] = [
    FiatCurrency { code: "EUR", name: "Euro" },
    FiatCurrency { code: "JPY", name: "Japanese Yen" },
    FiatCurrency { code: "GBP", name: "British Pound" },
    FiatCurrency { code: "AUD", name: "Australian Dollar" },
    FiatCurrency { code: "CAD", name: "Canadian Dollar" },
    FiatCurrency { code: "CHF", name: "Swiss Franc" },
    FiatCurrency { code: "CNY", name: "Chinese Yuan" },
    FiatCurrency { code: "HKD", name: "Hong Kong Dollar" },
    FiatCurrency { code: "NZD", name: "New Zealand Dollar" },
    FiatCurrency { code: "BRL", name: "Brazilian Real" },
];

#[async_trait]
pub trait FiatRateProvider: Send + Sync {
    /// Daily closing rates for `code` expressed in `base` over the inclusive
    /// date range.
    ///
    /// Contract: when `code` equals `base` the series is a constant 1.0 for
    /// every day in range, with no network call. Otherwise the direct pair is
    /// tried first, then the inverted pair with reciprocal values. An empty
    /// series means neither pair had data; it is a valid terminal state, not
    /// an error.
    async fn daily_rates(
        &self,
        code: &str,
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPoint>>;
}
