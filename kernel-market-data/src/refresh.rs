//! Periodic REST refresh of the market-state cache (spec §4.1 L1 loop,
//! §4.3). Pulls quotes/chain/VIX per underlying, rebuilds aggregates and
//! indicators, and swaps the result into the cache as one atomic unit.

use crate::broker::BrokerAdapter;
use crate::cache::MarketStateCache;
use crate::indicators::RollingWindow;
use chrono::Utc;
use kernel_common::instrument::{InstrumentKey, Underlying};
use kernel_common::snapshot::{MarketSnapshot, UnderlyingSnapshot};
use kernel_common::KernelResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-underlying state the refresher carries between cycles: the rolling
/// indicator window (must persist across refreshes) and the instrument
/// universe last subscribed, so a changed universe can be re-subscribed.
#[derive(Default)]
pub struct RefreshState {
    windows: HashMap<Underlying, RollingWindow>,
}

impl RefreshState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Vix instrument quote lookup key, broker-defined; callers supply it since
/// the kernel treats it as just another instrument key.
pub async fn refresh_cycle(
    adapter: &dyn BrokerAdapter,
    cache: &MarketStateCache,
    state: &mut RefreshState,
    underlyings: &[Underlying],
    vix_instrument_key: &InstrumentKey,
) -> KernelResult<()> {
    let now = Utc::now();
    let previous = cache.load();

    let vix = adapter
        .quote_by_instrument_keys(std::slice::from_ref(vix_instrument_key))
        .await?
        .into_iter()
        .next()
        .map(|tick| tick.ltp)
        .unwrap_or(previous.vix);

    let mut next = MarketSnapshot {
        underlyings: previous.underlyings.clone(),
        vix,
        generated_at: now,
    };

    for &underlying in underlyings {
        match refresh_underlying(adapter, underlying, now).await {
            Ok(snapshot) => {
                let window = state.windows.entry(underlying).or_default();
                window.push(snapshot.spot, 0);

                let mut snapshot = snapshot;
                snapshot.indicators = window.compute();

                let keys: Vec<InstrumentKey> = snapshot
                    .option_chain
                    .strikes()
                    .flat_map(|(_, row)| {
                        [row.call.as_ref(), row.put.as_ref()]
                            .into_iter()
                            .flatten()
                            .map(|leg| leg.instrument_key.clone())
                    })
                    .collect();
                cache.reindex(underlying.symbol(), keys);

                next.underlyings.insert(underlying.symbol().to_string(), snapshot);
            }
            Err(err) => {
                warn!(underlying = underlying.symbol(), error = %err, "refresh failed, keeping stale snapshot");
            }
        }
    }

    cache.swap(Arc::new(next));
    info!(vix, underlyings = underlyings.len(), "market snapshot refreshed");
    Ok(())
}

async fn refresh_underlying(
    adapter: &dyn BrokerAdapter,
    underlying: Underlying,
    now: chrono::DateTime<Utc>,
) -> KernelResult<UnderlyingSnapshot> {
    let keys = adapter.option_contract_discovery(underlying).await?;
    let Some(first_key) = keys.first() else {
        return Err(kernel_common::KernelError::DataQuality(format!(
            "no contracts discovered for {}",
            underlying.symbol()
        )));
    };
    let quotes = adapter.quote_by_instrument_keys(&keys).await?;
    let spot = quotes
        .iter()
        .find(|t| &t.instrument_key == first_key)
        .map(|t| t.ltp)
        .unwrap_or(0.0);

    let expiry = kernel_clock::current_weekly_expiry(underlying, now.with_timezone(&kernel_clock::IST).date_naive())
        .with_timezone(&Utc);

    let chain = adapter.option_chain_by_expiry(underlying, expiry, now).await?;
    let atm_strike = chain.atm_strike(spot);

    Ok(UnderlyingSnapshot {
        spot,
        atm_strike,
        current_weekly_expiry: expiry,
        option_chain: chain,
        indicators: kernel_common::TechnicalIndicators::default(),
        last_refresh: now,
    })
}
