//! Market-state cache, broker boundary, and the pieces that keep the cache
//! fresh: REST refresh, push-tick application, and reconnect-with-backoff.

pub mod broker;
pub mod cache;
pub mod indicators;
pub mod ratelimit;
pub mod reconnect;
pub mod refresh;
pub mod simulated;
pub mod ticks;

pub use broker::{
    BrokerAdapter, BrokerOrderAck, BrokerOrderRequest, BrokerOrderStatus, BrokerPosition, OrderSide, Tick,
    TokenStatus,
};
pub use cache::MarketStateCache;
pub use indicators::RollingWindow;
pub use ratelimit::TokenBucket;
pub use reconnect::run_with_reconnect;
pub use refresh::{refresh_cycle, RefreshState};
pub use simulated::{SimulatedBrokerAdapter, SimulatedBrokerConfig};
pub use ticks::apply_tick;
