//! The broker boundary (spec §6 "Broker adapter (inbound)"). A real
//! integration with a specific broker's REST/WebSocket surface is out of
//! scope; everything downstream of the market-state cache and order
//! manager talks only to this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kernel_common::errors::KernelResult;
use kernel_common::instrument::{InstrumentKey, Underlying};
use kernel_common::option_chain::OptionChain;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct BrokerOrderRequest {
    pub instrument_key: InstrumentKey,
    pub side: OrderSide,
    pub quantity: u32,
    /// `None` submits a market order.
    pub limit_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct BrokerOrderAck {
    pub broker_order_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerOrderStatus {
    Submitted,
    PartiallyFilled { filled_quantity: u32, avg_price: f64 },
    Filled { filled_quantity: u32, avg_price: f64 },
    Rejected(String),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct BrokerPosition {
    pub instrument_key: InstrumentKey,
    pub quantity: i64,
    pub average_price: f64,
}

/// A single push-channel update (spec §6: `{instrument-key, ltp, ltt}` at
/// minimum; richer frames populate bid/ask/Greeks when present).
#[derive(Debug, Clone)]
pub struct Tick {
    pub instrument_key: InstrumentKey,
    pub ltp: f64,
    pub last_trade_time: DateTime<Utc>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub open_interest: Option<u64>,
    pub volume: Option<u64>,
}

/// Token lifecycle status (spec §5 "Resource ownership": the adapter owns
/// the access token and refreshes proactively before expiry).
#[derive(Debug, Clone, Copy)]
pub struct TokenStatus {
    pub expires_at: DateTime<Utc>,
}

impl TokenStatus {
    #[must_use]
    pub fn hours_until_expiry(&self, now: DateTime<Utc>) -> f64 {
        (self.expires_at - now).num_seconds() as f64 / 3600.0
    }
}

#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn quote_by_instrument_keys(&self, keys: &[InstrumentKey]) -> KernelResult<Vec<Tick>>;

    async fn option_contract_discovery(&self, underlying: Underlying) -> KernelResult<Vec<InstrumentKey>>;

    async fn option_chain_by_expiry(
        &self,
        underlying: Underlying,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> KernelResult<OptionChain>;

    async fn place_order(&self, request: BrokerOrderRequest) -> KernelResult<BrokerOrderAck>;

    async fn cancel_order(&self, broker_order_id: &str) -> KernelResult<()>;

    async fn order_status(&self, broker_order_id: &str) -> KernelResult<BrokerOrderStatus>;

    async fn positions(&self) -> KernelResult<Vec<BrokerPosition>>;

    async fn subscribe(&self, keys: &[InstrumentKey]) -> KernelResult<()>;

    async fn unsubscribe(&self, keys: &[InstrumentKey]) -> KernelResult<()>;

    /// Receiver end of the adapter's internal tick broadcast; one receiver
    /// per consumer, each with its own lag/drop accounting.
    fn tick_receiver(&self) -> broadcast::Receiver<Tick>;

    fn token_status(&self) -> TokenStatus;
}
