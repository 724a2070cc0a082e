//! Fee schedule as a pluggable trait (spec §4.10, SPEC_FULL §G): the P&L
//! calculator depends only on [`FeeSchedule`], so a venue-specific schedule
//! can be swapped in without touching `pnl::settle`.

pub mod default_schedule;

use kernel_common::trade::FeeBreakdown;

#[derive(Debug, Clone, Copy)]
pub struct FeeInputs<'a> {
    pub entry: f64,
    pub exit: f64,
    pub quantity: u32,
    pub exchange: &'a str,
}

pub trait FeeSchedule: Send + Sync {
    fn compute(&self, inputs: FeeInputs<'_>) -> FeeBreakdown;
}

pub use default_schedule::IndianMarketsFeeSchedule;
