//! Flags a strike whose open interest dwarfs its neighbours — the
//! signature of a single large writer rather than organic retail buildup —
//! and trades away from that strike, since it tends to act as a magnet
//! writers defend.

use crate::contract::{Strategy, StrategyContext};
use crate::strategies::support::build_signal;
use kernel_common::instrument::OptionSide;
use kernel_common::signal::{Direction, Signal};

/// A strike must carry at least this multiple of the chain's mean OI to
/// count as an institutional footprint rather than noise.
const ANOMALY_MULTIPLE: f64 = 3.0;

pub struct InstitutionalFootprint;

impl Strategy for InstitutionalFootprint {
    fn canonical_id(&self) -> &'static str {
        "institutional_footprint"
    }

    fn analyse(&self, ctx: &StrategyContext<'_>) -> Vec<Signal> {
        let chain = &ctx.underlying.option_chain;
        let rows: Vec<(f64, u64, u64)> = chain
            .strikes()
            .map(|(k, row)| {
                (
                    k,
                    row.call.as_ref().map_or(0, |l| l.open_interest),
                    row.put.as_ref().map_or(0, |l| l.open_interest),
                )
            })
            .collect();
        if rows.len() < 3 {
            return Vec::new();
        }

        let mean_oi: f64 = rows.iter().map(|&(_, c, p)| (c + p) as f64).sum::<f64>() / rows.len() as f64;
        if mean_oi <= 0.0 {
            return Vec::new();
        }

        let anomaly = rows
            .iter()
            .max_by(|a, b| (a.1 + a.2).cmp(&(b.1 + b.2)))
            .copied();
        let Some((strike, call_oi, put_oi)) = anomaly else {
            return Vec::new();
        };
        if (call_oi + put_oi) as f64 / mean_oi < ANOMALY_MULTIPLE {
            return Vec::new();
        }

        // A heavy call writer at `strike` defends it as resistance: trade
        // the put side. A heavy put writer defends it as support: trade
        // the call side.
        let (direction, side) = if call_oi >= put_oi {
            (Direction::Put, OptionSide::Put)
        } else {
            (Direction::Call, OptionSide::Call)
        };

        let atm = ctx.underlying.atm_strike;
        let Some(leg) = chain.leg(atm, side) else {
            return Vec::new();
        };
        if !leg.is_plausible() {
            return Vec::new();
        }

        let strength = 50.0 + ((call_oi + put_oi) as f64 / mean_oi - ANOMALY_MULTIPLE) * 10.0;
        vec![build_signal(
            self.canonical_id(),
            ctx,
            direction,
            leg,
            strength,
            format!("strike {strike:.0} carries {:.1}x mean chain OI", (call_oi + put_oi) as f64 / mean_oi),
            1,
        )]
    }
}
