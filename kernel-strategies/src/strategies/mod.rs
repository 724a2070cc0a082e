//! The illustrative strategy set (spec §4.2): configurable, not exhaustive.

pub mod gamma_scalping;
pub mod gap_and_go;
pub mod institutional_footprint;
pub mod iv_skew;
pub mod max_pain;
pub mod oi_change_patterns;
pub mod order_flow_imbalance;
pub mod pcr_analysis;
pub mod support;
pub mod support_resistance_oi;
pub mod test_support;
pub mod time_of_day;

use crate::contract::Strategy;

/// One boxed instance of each built-in strategy, in no particular order.
#[must_use]
pub fn all_builtin() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(pcr_analysis::PcrAnalysis),
        Box::new(oi_change_patterns::OiChangePatterns),
        Box::new(max_pain::MaxPain),
        Box::new(iv_skew::IvSkew),
        Box::new(gamma_scalping::GammaScalping),
        Box::new(order_flow_imbalance::OrderFlowImbalance),
        Box::new(institutional_footprint::InstitutionalFootprint),
        Box::new(support_resistance_oi::SupportResistanceOi),
        Box::new(gap_and_go::GapAndGo),
        Box::new(time_of_day::TimeOfDay),
    ]
}
