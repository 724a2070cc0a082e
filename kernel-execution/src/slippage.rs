//! Paper-mode execution-price model (spec §4.8: "spread ≈ 0.05%;
//! size-and-liquidity-dependent 0.1-0.5%; volatility multiplier").

use kernel_common::instrument::OptionSide;

const SPREAD_FRACTION: f64 = 0.0005;
const SIZE_IMPACT_FLOOR: f64 = 0.001;
const SIZE_IMPACT_CEILING: f64 = 0.005;
/// Quantity (in lots, not units) at which size impact saturates at the
/// ceiling; chosen so a single-lot order sits near the floor.
const SIZE_IMPACT_SATURATION_LOTS: f64 = 20.0;

/// Inputs the slippage model needs beyond the raw LTP: how large the clip
/// is relative to the order manager's own notion of "one lot", and how
/// volatile the chain currently is (VIX, as a multiplier anchor).
#[derive(Debug, Clone, Copy)]
pub struct SlippageInputs {
    pub ltp: f64,
    pub quantity: u32,
    pub lot_size: u32,
    pub vix: f64,
    pub side: OptionSide,
}

/// India VIX level treated as "calm"; slippage scales linearly above it.
const VIX_BASELINE: f64 = 15.0;

/// Buying always pays the adverse side of spread+impact; a long-only book
/// (spec §4.10) never sells to open, so this never needs a sell-side case.
#[must_use]
pub fn execution_price(inputs: SlippageInputs) -> f64 {
    let lots = f64::from(inputs.quantity) / f64::from(inputs.lot_size.max(1));
    let size_fraction = (lots / SIZE_IMPACT_SATURATION_LOTS).clamp(0.0, 1.0);
    let size_impact = SIZE_IMPACT_FLOOR + size_fraction * (SIZE_IMPACT_CEILING - SIZE_IMPACT_FLOOR);

    let vix_multiplier = (inputs.vix / VIX_BASELINE).max(1.0);

    let total_slippage_fraction = (SPREAD_FRACTION + size_impact) * vix_multiplier;
    let _ = inputs.side; // both CALL and PUT buys pay the same adverse-side slippage
    inputs.ltp * (1.0 + total_slippage_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_lot_pays_close_to_the_spread_alone() {
        let price = execution_price(SlippageInputs {
            ltp: 100.0,
            quantity: 75,
            lot_size: 75,
            vix: VIX_BASELINE,
            side: OptionSide::Call,
        });
        assert!(price > 100.0);
        assert!(price < 100.2);
    }

    #[test]
    fn a_large_clip_pays_more_than_a_small_one() {
        let small = execution_price(SlippageInputs {
            ltp: 100.0,
            quantity: 75,
            lot_size: 75,
            vix: VIX_BASELINE,
            side: OptionSide::Call,
        });
        let large = execution_price(SlippageInputs {
            ltp: 100.0,
            quantity: 75 * 25,
            lot_size: 75,
            vix: VIX_BASELINE,
            side: OptionSide::Call,
        });
        assert!(large > small);
    }

    #[test]
    fn elevated_vix_scales_slippage_up() {
        let calm = execution_price(SlippageInputs {
            ltp: 100.0,
            quantity: 75,
            lot_size: 75,
            vix: VIX_BASELINE,
            side: OptionSide::Call,
        });
        let stressed = execution_price(SlippageInputs {
            ltp: 100.0,
            quantity: 75,
            lot_size: 75,
            vix: 30.0,
            side: OptionSide::Call,
        });
        assert!(stressed > calm);
    }
}
