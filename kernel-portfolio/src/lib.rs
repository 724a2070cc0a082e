//! Position tracking and P&L settlement (spec §4.9, §4.10).

pub mod fees;
pub mod pnl;
pub mod tracker;

pub use fees::{FeeInputs, FeeSchedule, IndianMarketsFeeSchedule};
pub use tracker::{ExitContext, PositionTracker, UpdateOutcome};
