//! Fan-out event bus for position, trade, P&L, and alert events (spec §4.11).

pub mod bus;
pub mod errors;
pub mod message;
pub mod metrics;

pub use bus::{EventBus, EventBusConfig, Subscription};
pub use errors::{EventBusError, EventBusResult};
pub use message::{AlertLevel, KernelEvent, MessageEnvelope};
pub use metrics::BusMetrics;
