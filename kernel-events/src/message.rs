//! Event kinds published on the bus (spec §4.11) and their envelope.

use crate::errors::EventBusResult;
use chrono::{DateTime, Utc};
use kernel_common::{CircuitBreakerState, Trade};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

/// One of the ten message kinds spec §4.11 names. Each variant owns a
/// `topic()` used for subscription routing; per-subscriber ordering is
/// preserved within one topic, never across topics (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KernelEvent {
    Connection { connected: bool, detail: String },
    PositionUpdate { position_id: String, symbol: String, state: String, unrealised_pnl: f64 },
    TradeClosed { trade: Box<Trade> },
    PnlUpdate { current_capital: f64, daily_pnl: f64, open_unrealised_pnl: f64 },
    CircuitBreakerEvent { state: CircuitBreakerState },
    Alert { level: AlertLevel, message: String, detail: Option<String> },
    MarketCondition { symbol: String, regime: String, vix: f64 },
    DataQuality { symbol: Option<String>, issue: String },
    SystemStatus { status: String, detail: Option<String> },
    Heartbeat { sequence: u64 },
}

impl KernelEvent {
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::PositionUpdate { .. } => "position_update",
            Self::TradeClosed { .. } => "trade_closed",
            Self::PnlUpdate { .. } => "pnl_update",
            Self::CircuitBreakerEvent { .. } => "circuit_breaker_event",
            Self::Alert { .. } => "alert",
            Self::MarketCondition { .. } => "market_condition",
            Self::DataQuality { .. } => "data_quality",
            Self::SystemStatus { .. } => "system_status",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    #[must_use]
    pub fn data_quality(symbol: Option<String>, issue: impl Into<String>) -> Self {
        Self::DataQuality { symbol, issue: issue.into() }
    }

    #[must_use]
    pub fn alert(level: AlertLevel, message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Alert { level, message: message.into(), detail }
    }
}

/// Envelope carrying routing metadata alongside the message, mirroring the
/// donor event bus's `MessageEnvelope` (`services/common/src/event_bus/message.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message_id: String,
    pub published_at: DateTime<Utc>,
    pub event: KernelEvent,
}

impl MessageEnvelope {
    #[must_use]
    pub fn new(event: KernelEvent) -> Self {
        Self { message_id: uuid::Uuid::new_v4().to_string(), published_at: Utc::now(), event }
    }

    #[must_use]
    pub fn topic(&self) -> &'static str {
        self.event.topic()
    }

    /// Serialises as the "JSON-like structured record" the observer channel
    /// carries (spec §6).
    pub fn to_json(&self) -> EventBusResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_match_spec_message_kinds() {
        assert_eq!(KernelEvent::Connection { connected: true, detail: String::new() }.topic(), "connection");
        assert_eq!(KernelEvent::Heartbeat { sequence: 1 }.topic(), "heartbeat");
        assert_eq!(KernelEvent::data_quality(None, "stale").topic(), "data_quality");
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = MessageEnvelope::new(KernelEvent::alert(AlertLevel::Warning, "token expiring", None));
        let json = envelope.to_json().expect("serialisable");
        let decoded: MessageEnvelope = serde_json::from_str(&json).expect("deserialisable");
        assert_eq!(decoded.topic(), "alert");
    }
}
