//! Admission decision vocabulary (spec §4.6).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject(RejectReason),
}

impl Decision {
    #[must_use]
    pub const fn is_admit(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CapitalCap,
    PerStrategyCap,
    DailyLossGate,
    DailyTradeCountCap,
    CircuitBreakerOpen,
    OutsideMarketHoursOrEod,
    OverrideActive,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::CapitalCap => "aggregate capital cap reached",
            Self::PerStrategyCap => "per-strategy allocation cap reached",
            Self::DailyLossGate => "daily loss gate triggered",
            Self::DailyTradeCountCap => "daily trade count cap reached",
            Self::CircuitBreakerOpen => "circuit breaker open",
            Self::OutsideMarketHoursOrEod => "outside market hours or in EOD window",
            Self::OverrideActive => "manual override active",
        };
        f.write_str(text)
    }
}
