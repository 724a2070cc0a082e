//! Shared types, errors, and constants for the trading kernel.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! tokio runtime or I/O of its own.

pub mod backoff;
pub mod blackscholes;
pub mod circuit_state;
pub mod config;
pub mod constants;
pub mod errors;
pub mod greeks;
pub mod instrument;
pub mod option_chain;
pub mod position;
pub mod price;
pub mod risk_state;
pub mod signal;
pub mod snapshot;
pub mod strategy_descriptor;
pub mod trade;

pub use backoff::Backoff;
pub use circuit_state::{CircuitBreakerState, Latched, Trigger};
pub use config::{Settings, SettingsError, TradingMode};
pub use errors::{KernelError, KernelResult};
pub use greeks::Greeks;
pub use instrument::{InstrumentKey, OptionSide, Underlying};
pub use option_chain::{ChainAggregates, OptionChain, OptionLeg, StrikeRow};
pub use position::{Position, PositionState};
pub use price::Px;
pub use risk_state::RiskState;
pub use signal::{Direction, Ladder, MarketContext, ScoredSignal, Signal};
pub use snapshot::{MarketSnapshot, TechnicalIndicators, UnderlyingSnapshot};
pub use strategy_descriptor::{
    AllocationSource, CanonicalId, StrategyDescriptor, UNKNOWN_ALLOCATION_FRACTION, UNKNOWN_STRATEGY_ID,
};
pub use trade::{ExitReason, FeeBreakdown, Trade};
