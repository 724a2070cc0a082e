//! Instrument identity.
//!
//! The instrument key is broker-defined and opaque to the core (spec §3): we
//! never parse it for logic, only carry it as an identity used to route
//! ticks, subscriptions, and order submissions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque broker-defined contract identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentKey(pub String);

impl InstrumentKey {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstrumentKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Tradable index underlyings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Underlying {
    Nifty,
    BankNifty,
    Sensex,
}

impl Underlying {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Nifty => "NIFTY",
            Self::BankNifty => "BANKNIFTY",
            Self::Sensex => "SENSEX",
        }
    }

    /// Weekday on which this underlying's weekly contracts expire
    /// (`chrono::Weekday`), per spec §4.1.
    #[must_use]
    pub const fn expiry_weekday(self) -> chrono::Weekday {
        match self {
            Self::Nifty => chrono::Weekday::Tue,
            Self::BankNifty => chrono::Weekday::Wed,
            Self::Sensex => chrono::Weekday::Thu,
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "NIFTY" => Some(Self::Nifty),
            "BANKNIFTY" => Some(Self::BankNifty),
            "SENSEX" => Some(Self::Sensex),
            _ => None,
        }
    }
}

impl fmt::Display for Underlying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Call => Self::Put,
            Self::Put => Self::Call,
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}
