//! Risk manager and circuit breaker (spec §4.6, §4.7).

pub mod circuit_breaker;
pub mod decision;
pub mod manager;

pub use decision::{Decision, RejectReason};
pub use manager::{validate_settings_update, RiskManager};
