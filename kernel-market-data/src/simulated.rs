//! A deterministic, seeded broker standing in for a real Zerodha-shaped
//! integration (spec §6 names the broker boundary but leaves the concrete
//! venue out of scope). Spot prices follow geometric Brownian motion seeded
//! from [`SimulatedBrokerConfig::seed`], the same `StdRng`/`StandardNormal`
//! construction `options-engine`'s Monte Carlo path simulator uses; option
//! legs are derived from that spot through the shared Black-Scholes pricer
//! rather than walked independently, so the chain a strategy sees is always
//! internally consistent.

use crate::broker::{
    BrokerAdapter, BrokerOrderAck, BrokerOrderRequest, BrokerOrderStatus, BrokerPosition, Tick, TokenStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use kernel_common::blackscholes;
use kernel_common::errors::{KernelError, KernelResult};
use kernel_common::instrument::{InstrumentKey, OptionSide, Underlying};
use kernel_common::option_chain::{OptionChain, OptionLeg};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashMap;
use tokio::sync::broadcast;

const RISK_FREE_RATE: f64 = 0.065;
const DEFAULT_VOL: f64 = 0.15;
const STRIKES_EACH_SIDE: i64 = 10;
const MIN_TIME_TO_EXPIRY_YEARS: f64 = 1.0 / 365.0;

const fn strike_step(underlying: Underlying) -> f64 {
    match underlying {
        Underlying::Nifty => 50.0,
        Underlying::BankNifty => 100.0,
        Underlying::Sensex => 100.0,
    }
}

const fn base_spot(underlying: Underlying) -> f64 {
    match underlying {
        Underlying::Nifty => 25_000.0,
        Underlying::BankNifty => 52_000.0,
        Underlying::Sensex => 82_000.0,
    }
}

const ALL_UNDERLYINGS: [Underlying; 3] = [Underlying::Nifty, Underlying::BankNifty, Underlying::Sensex];

/// Tunables for [`SimulatedBrokerAdapter::new`].
#[derive(Debug, Clone, Copy)]
pub struct SimulatedBrokerConfig {
    pub seed: u64,
    /// Annualised volatility driving the spot random walk.
    pub volatility: f64,
}

impl Default for SimulatedBrokerConfig {
    fn default() -> Self {
        Self { seed: 42, volatility: DEFAULT_VOL }
    }
}

struct SimState {
    rng: StdRng,
    spot: HashMap<Underlying, f64>,
    vix: f64,
}

/// In-process paper broker. Orders fill instantly at the last simulated
/// quote; positions are not tracked here since [`crate::cache`] and
/// `kernel-portfolio`'s tracker own that state downstream.
pub struct SimulatedBrokerAdapter {
    config: SimulatedBrokerConfig,
    state: Mutex<SimState>,
    orders: DashMap<String, BrokerOrderStatus>,
    subscribed: DashMap<InstrumentKey, ()>,
    tick_tx: broadcast::Sender<Tick>,
}

impl SimulatedBrokerAdapter {
    #[must_use]
    pub fn new(config: SimulatedBrokerConfig) -> Self {
        let spot = ALL_UNDERLYINGS.iter().map(|&u| (u, base_spot(u))).collect();
        let (tick_tx, _) = broadcast::channel(4096);
        Self {
            config,
            state: Mutex::new(SimState { rng: StdRng::seed_from_u64(config.seed), spot, vix: 14.0 }),
            orders: DashMap::new(),
            subscribed: DashMap::new(),
            tick_tx,
        }
    }

    #[must_use]
    pub fn vix(&self) -> f64 {
        self.state.lock().vix
    }

    fn index_key(underlying: Underlying) -> InstrumentKey {
        InstrumentKey::new(format!("SIM-{}-INDEX", underlying.symbol()))
    }

    /// The instrument key this adapter's simulated India VIX reading is
    /// quoted under; callers (the market-data refresher) supply it back
    /// unchanged, same as they would a broker-issued key.
    #[must_use]
    pub fn vix_key() -> InstrumentKey {
        InstrumentKey::new("SIM-VIX")
    }

    fn option_key(underlying: Underlying, strike: f64, side: OptionSide) -> InstrumentKey {
        InstrumentKey::new(format!("SIM-{}-{strike}-{side}", underlying.symbol()))
    }

    fn parse_option_key(key: &InstrumentKey) -> Option<(Underlying, f64, OptionSide)> {
        let rest = key.0.strip_prefix("SIM-")?;
        let mut parts = rest.rsplitn(3, '-');
        let side = match parts.next()? {
            "CALL" => OptionSide::Call,
            "PUT" => OptionSide::Put,
            _ => return None,
        };
        let strike: f64 = parts.next()?.parse().ok()?;
        let underlying = Underlying::from_symbol(parts.next()?)?;
        Some((underlying, strike, side))
    }

    fn atm(underlying: Underlying, spot: f64) -> f64 {
        let step = strike_step(underlying);
        (spot / step).round() * step
    }

    fn synthesize_option_tick(state: &SimState, key: &InstrumentKey, now: DateTime<Utc>) -> Option<Tick> {
        let (underlying, strike, side) = Self::parse_option_key(key)?;
        let spot = *state.spot.get(&underlying)?;
        let price = blackscholes::price(side, spot, strike, RISK_FREE_RATE, DEFAULT_VOL, MIN_TIME_TO_EXPIRY_YEARS, 0.0).max(0.05);
        Some(Tick {
            instrument_key: key.clone(),
            ltp: price,
            last_trade_time: now,
            bid: Some((price - 0.05).max(0.05)),
            ask: Some(price + 0.05),
            open_interest: Some(1_000),
            volume: Some(50),
        })
    }

    /// Advances every tracked underlying's spot one step along a
    /// log-normal random walk and broadcasts a tick for the index plus any
    /// subscribed option legs. Driven by the caller's own interval (the
    /// market-data refresh loop), not an internal timer, so the adapter
    /// never races the cadence it feeds.
    pub fn step(&self, dt_years: f64, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        for underlying in ALL_UNDERLYINGS {
            let current = *state.spot.get(&underlying).unwrap_or(&base_spot(underlying));
            let z: f64 = StandardNormal.sample(&mut state.rng);
            let drift = -0.5 * self.config.volatility * self.config.volatility * dt_years;
            let diffusion = self.config.volatility * dt_years.sqrt() * z;
            let next = current * (drift + diffusion).exp();
            state.spot.insert(underlying, next);

            let _ = self.tick_tx.send(Tick {
                instrument_key: Self::index_key(underlying),
                ltp: next,
                last_trade_time: now,
                bid: Some(next - 0.25),
                ask: Some(next + 0.25),
                open_interest: None,
                volume: None,
            });
        }

        let vix_shock: f64 = StandardNormal.sample(&mut state.rng);
        state.vix = (state.vix + vix_shock * 0.2).clamp(9.0, 60.0);

        let option_keys: Vec<InstrumentKey> =
            self.subscribed.iter().map(|entry| entry.key().clone()).filter(|k| Self::parse_option_key(k).is_some()).collect();
        for key in option_keys {
            if let Some(tick) = Self::synthesize_option_tick(&state, &key, now) {
                let _ = self.tick_tx.send(tick);
            }
        }
    }
}

#[async_trait]
impl BrokerAdapter for SimulatedBrokerAdapter {
    async fn quote_by_instrument_keys(&self, keys: &[InstrumentKey]) -> KernelResult<Vec<Tick>> {
        let state = self.state.lock();
        let now = Utc::now();
        let mut ticks = Vec::with_capacity(keys.len());
        for key in keys {
            if key.0 == "SIM-VIX" {
                ticks.push(Tick {
                    instrument_key: key.clone(),
                    ltp: state.vix,
                    last_trade_time: now,
                    bid: None,
                    ask: None,
                    open_interest: None,
                    volume: None,
                });
                continue;
            }
            if let Some(rest) = key.0.strip_prefix("SIM-").and_then(|r| r.strip_suffix("-INDEX")) {
                if let Some(underlying) = Underlying::from_symbol(rest) {
                    let spot = *state.spot.get(&underlying).unwrap_or(&base_spot(underlying));
                    ticks.push(Tick {
                        instrument_key: key.clone(),
                        ltp: spot,
                        last_trade_time: now,
                        bid: Some(spot - 0.25),
                        ask: Some(spot + 0.25),
                        open_interest: None,
                        volume: None,
                    });
                    continue;
                }
            }
            if let Some(tick) = Self::synthesize_option_tick(&state, key, now) {
                ticks.push(tick);
            }
        }
        Ok(ticks)
    }

    async fn option_contract_discovery(&self, underlying: Underlying) -> KernelResult<Vec<InstrumentKey>> {
        let spot = {
            let state = self.state.lock();
            *state.spot.get(&underlying).unwrap_or(&base_spot(underlying))
        };
        let atm = Self::atm(underlying, spot);
        let step = strike_step(underlying);
        let mut keys = vec![Self::index_key(underlying)];
        for offset in -STRIKES_EACH_SIDE..=STRIKES_EACH_SIDE {
            let strike = atm + offset as f64 * step;
            keys.push(Self::option_key(underlying, strike, OptionSide::Call));
            keys.push(Self::option_key(underlying, strike, OptionSide::Put));
        }
        Ok(keys)
    }

    async fn option_chain_by_expiry(
        &self,
        underlying: Underlying,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> KernelResult<OptionChain> {
        let spot = {
            let state = self.state.lock();
            *state.spot.get(&underlying).unwrap_or(&base_spot(underlying))
        };
        let atm = Self::atm(underlying, spot);
        let step = strike_step(underlying);
        let time_to_expiry = ((expiry - now).num_seconds().max(3_600) as f64 / (365.0 * 24.0 * 3_600.0)).max(MIN_TIME_TO_EXPIRY_YEARS);

        let mut chain = OptionChain::new(underlying.symbol(), expiry, now);
        for offset in -STRIKES_EACH_SIDE..=STRIKES_EACH_SIDE {
            let strike = atm + offset as f64 * step;
            for side in [OptionSide::Call, OptionSide::Put] {
                let ltp = blackscholes::price(side, spot, strike, RISK_FREE_RATE, DEFAULT_VOL, time_to_expiry, 0.0).max(0.05);
                let greeks = blackscholes::greeks(side, spot, strike, RISK_FREE_RATE, DEFAULT_VOL, time_to_expiry, 0.0);
                let open_interest = 500 + (STRIKES_EACH_SIDE - offset.abs()) as u64 * 200;
                chain.insert_leg(OptionLeg {
                    strike,
                    side,
                    ltp,
                    bid: (ltp - 0.05).max(0.05),
                    ask: ltp + 0.05,
                    open_interest,
                    volume: open_interest / 10,
                    implied_volatility: DEFAULT_VOL,
                    greeks,
                    instrument_key: Self::option_key(underlying, strike, side),
                    last_updated: now,
                });
            }
        }
        Ok(chain)
    }

    async fn place_order(&self, request: BrokerOrderRequest) -> KernelResult<BrokerOrderAck> {
        let fill_price = self
            .quote_by_instrument_keys(std::slice::from_ref(&request.instrument_key))
            .await?
            .first()
            .map(|tick| tick.ltp)
            .or(request.limit_price)
            .ok_or_else(|| KernelError::DataQuality(format!("no quote available for {}", request.instrument_key)))?;

        let broker_order_id = uuid::Uuid::new_v4().to_string();
        self.orders
            .insert(broker_order_id.clone(), BrokerOrderStatus::Filled { filled_quantity: request.quantity, avg_price: fill_price });
        Ok(BrokerOrderAck { broker_order_id })
    }

    async fn cancel_order(&self, broker_order_id: &str) -> KernelResult<()> {
        match self.orders.get(broker_order_id).map(|entry| entry.clone()) {
            Some(BrokerOrderStatus::Filled { .. }) => {
                Err(KernelError::Validation(format!("order {broker_order_id} already filled, cannot cancel")))
            }
            _ => {
                self.orders.insert(broker_order_id.to_string(), BrokerOrderStatus::Cancelled);
                Ok(())
            }
        }
    }

    async fn order_status(&self, broker_order_id: &str) -> KernelResult<BrokerOrderStatus> {
        self.orders
            .get(broker_order_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| KernelError::Validation(format!("unknown broker order id {broker_order_id}")))
    }

    async fn positions(&self) -> KernelResult<Vec<BrokerPosition>> {
        Ok(Vec::new())
    }

    async fn subscribe(&self, keys: &[InstrumentKey]) -> KernelResult<()> {
        for key in keys {
            self.subscribed.insert(key.clone(), ());
        }
        Ok(())
    }

    async fn unsubscribe(&self, keys: &[InstrumentKey]) -> KernelResult<()> {
        for key in keys {
            self.subscribed.remove(key);
        }
        Ok(())
    }

    fn tick_receiver(&self) -> broadcast::Receiver<Tick> {
        self.tick_tx.subscribe()
    }

    fn token_status(&self) -> TokenStatus {
        TokenStatus { expires_at: Utc::now() + ChronoDuration::hours(8) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn quote_returns_positive_ltp_for_index_and_option_keys() {
        let adapter = SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default());
        let keys = adapter.option_contract_discovery(Underlying::Nifty).await.expect("discovery");
        adapter.subscribe(&keys).await.expect("subscribe");

        let ticks = adapter.quote_by_instrument_keys(&keys).await.expect("quote");
        assert_eq!(ticks.len(), keys.len());
        assert!(ticks.iter().all(|t| t.ltp > 0.0));
    }

    #[tokio::test]
    async fn option_chain_is_centred_near_spot() {
        let adapter = SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default());
        let now = Utc::now();
        let expiry = now + ChronoDuration::days(3);
        let chain = adapter.option_chain_by_expiry(Underlying::Nifty, expiry, now).await.expect("chain");

        assert!(!chain.is_empty());
        let atm = chain.atm_strike(base_spot(Underlying::Nifty));
        assert!((atm - base_spot(Underlying::Nifty)).abs() <= strike_step(Underlying::Nifty));
    }

    #[tokio::test]
    async fn place_order_fills_instantly_at_last_quote() {
        let adapter = SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default());
        let key = SimulatedBrokerAdapter::index_key(Underlying::Nifty);
        let ack = adapter
            .place_order(BrokerOrderRequest { instrument_key: key, side: crate::broker::OrderSide::Buy, quantity: 75, limit_price: None })
            .await
            .expect("order");

        let status = adapter.order_status(&ack.broker_order_id).await.expect("status");
        assert!(matches!(status, BrokerOrderStatus::Filled { filled_quantity: 75, .. }));
    }

    #[tokio::test]
    async fn step_advances_spot_deterministically_for_a_fixed_seed() {
        let a = SimulatedBrokerAdapter::new(SimulatedBrokerConfig { seed: 7, ..SimulatedBrokerConfig::default() });
        let b = SimulatedBrokerAdapter::new(SimulatedBrokerConfig { seed: 7, ..SimulatedBrokerConfig::default() });
        let now = Utc::now();
        a.step(1.0 / 365.0, now);
        b.step(1.0 / 365.0, now);

        let spot_a = a.state.lock().spot[&Underlying::Nifty];
        let spot_b = b.state.lock().spot[&Underlying::Nifty];
        assert!((spot_a - spot_b).abs() < 1e-9);
    }

    #[tokio::test]
    async fn vix_key_quotes_the_tracked_vix_reading() {
        let adapter = SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default());
        let ticks = adapter.quote_by_instrument_keys(&[SimulatedBrokerAdapter::vix_key()]).await.expect("quote");
        assert_eq!(ticks.len(), 1);
        assert!((ticks[0].ltp - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cancel_after_fill_is_rejected() {
        let adapter = SimulatedBrokerAdapter::new(SimulatedBrokerConfig::default());
        let key = SimulatedBrokerAdapter::index_key(Underlying::Nifty);
        let ack = adapter
            .place_order(BrokerOrderRequest { instrument_key: key, side: crate::broker::OrderSide::Buy, quantity: 75, limit_price: None })
            .await
            .expect("order");

        assert!(adapter.cancel_order(&ack.broker_order_id).await.is_err());
    }
}
