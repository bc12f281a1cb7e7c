//! Background acquisition pipeline: ranks the crypto universe, fetches and
//! caches daily series for every tracked entity, and streams progress, log
//! lines and a single terminal outcome back to the caller.

use crate::core::{
    CryptoMarketProvider, DailyPoint, FIAT_CURRENCIES, FiatRateProvider, TOP_MARKET_COUNT, mean,
};
use crate::store::PriceCache;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone)]
pub struct AcquisitionParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub base_currency: String,
}

/// Per-asset outcome of a run. `history` is scoped to the requested range,
/// ascending by date; `average` is the mean of its numeric values.
#[derive(Debug, Clone)]
pub struct AssetSummary {
    pub id: String,
    pub name: String,
    pub average: Option<f64>,
    pub history: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct AcquisitionResult {
    pub cryptos: Vec<AssetSummary>,
    pub fiats: Vec<AssetSummary>,
}

/// Events emitted by a run. `Finished` and `Failed` are terminal; exactly
/// one of them is sent, after which the stream closes.
#[derive(Debug)]
pub enum RunEvent {
    Progress { current: usize, total: usize },
    Log(String),
    Finished(AcquisitionResult),
    Failed(String),
}

pub struct RunHandle {
    pub events: UnboundedReceiver<RunEvent>,
    stop: Arc<AtomicBool>,
}

impl RunHandle {
    /// Requests cooperative cancellation. The flag is checked before each
    /// entity; an in-flight network call is not interrupted, and results
    /// collected so far are still assembled and delivered via `Finished`.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Starts one acquisition run on a background task. Only one run should be
/// active at a time; enforcing that is the caller's responsibility.
pub fn spawn(
    params: AcquisitionParams,
    crypto: Arc<dyn CryptoMarketProvider>,
    fiat: Arc<dyn FiatRateProvider>,
    cache: Arc<PriceCache>,
) -> RunHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    tokio::spawn(async move {
        let outcome = run(&params, crypto.as_ref(), fiat.as_ref(), &cache, &stop_flag, &tx).await;
        let terminal = match outcome {
            Ok(result) => RunEvent::Finished(result),
            Err(e) => RunEvent::Failed(format!("Error fetching data: {e:#}")),
        };
        let _ = tx.send(terminal);
    });

    RunHandle { events: rx, stop }
}

/// The ordered acquisition procedure. Failures inside an entity's scope are
/// degraded to empty data and a log line; only the ranking call and errors
/// outside entity scopes abort the run.
pub async fn run(
    params: &AcquisitionParams,
    crypto: &dyn CryptoMarketProvider,
    fiat: &dyn FiatRateProvider,
    cache: &PriceCache,
    stop: &AtomicBool,
    events: &UnboundedSender<RunEvent>,
) -> Result<AcquisitionResult> {
    let base = params.base_currency.to_uppercase();
    let vs_currency = base.to_lowercase();

    let listings = crypto
        .top_markets(&vs_currency, TOP_MARKET_COUNT)
        .await
        .context("Ranked markets query failed")?;

    let total_steps = listings.len() + FIAT_CURRENCIES.len();
    let log = |message: String| {
        let _ = events.send(RunEvent::Log(message));
    };
    let progress = |current: usize| {
        let _ = events.send(RunEvent::Progress {
            current,
            total: total_steps,
        });
    };

    let mut result = AcquisitionResult::default();

    for (idx, coin) in listings.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        log(format!(
            "Loading data for {} ({}) [{}/{}]",
            coin.name,
            coin.id,
            idx + 1,
            listings.len()
        ));

        let history = match crypto
            .daily_prices(&coin.id, &vs_currency, params.start, params.end)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                log(format!("Failed loading {}: {e:#}", coin.name));
                Vec::new()
            }
        };

        match cache.upsert_prices(&coin.id, &history) {
            Ok(()) => log(format!("Saved cache for {}", coin.name)),
            Err(e) => log(format!("Failed saving cache for {}: {e:#}", coin.name)),
        }

        result.cryptos.push(AssetSummary {
            id: coin.id.clone(),
            name: coin.name.clone(),
            average: mean(&history),
            history,
        });
        progress(idx + 1);
    }

    for (idx, currency) in FIAT_CURRENCIES.iter().enumerate() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        log(format!(
            "Loading fiat data for {} ({}) [{}/{}]",
            currency.name,
            currency.code,
            idx + 1,
            FIAT_CURRENCIES.len()
        ));

        let history = match fiat
            .daily_rates(currency.code, &base, params.start, params.end)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                log(format!("Failed loading fiat {}: {e:#}", currency.name));
                Vec::new()
            }
        };

        match cache.upsert_rates(currency.code, &history) {
            Ok(()) => log(format!("Saved cache for fiat {}", currency.name)),
            Err(e) => log(format!(
                "Failed saving cache for fiat {}: {e:#}",
                currency.name
            )),
        }

        result.fiats.push(AssetSummary {
            id: currency.code.to_string(),
            name: currency.name.to_string(),
            average: mean(&history),
            history,
        });
        progress(listings.len() + idx + 1);
    }

    Ok(result)
}
