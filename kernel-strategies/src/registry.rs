//! Canonical-id registry and identifier normalisation (spec §4.2, §4.4).
//!
//! One table keyed by canonical-id holds descriptor + aliases. Three
//! lookups — `normalise`, `display`, `allocation` — are the only paths risk,
//! persistence, and reporting code may use to cross the id boundary;
//! everything internal to a strategy deals only in canonical ids.

use kernel_common::strategy_descriptor::{
    CanonicalId, StrategyDescriptor, UNKNOWN_ALLOCATION_FRACTION, UNKNOWN_STRATEGY_ID,
};
use rustc_hash::FxHashMap;

struct Entry {
    descriptor: StrategyDescriptor,
    aliases: &'static [&'static str],
}

pub struct StrategyRegistry {
    entries: FxHashMap<CanonicalId, Entry>,
    alias_lookup: FxHashMap<String, CanonicalId>,
}

fn entry(canonical_id: &str, human_name: &str, weight: f64, allocation: f64, aliases: &'static [&'static str]) -> Entry {
    Entry {
        descriptor: StrategyDescriptor {
            canonical_id: canonical_id.to_string(),
            human_name: human_name.to_string(),
            weight,
            default_allocation_fraction: allocation,
            enabled: true,
        },
        aliases,
    }
}

impl StrategyRegistry {
    /// The registry seeded with the illustrative strategy set (spec §4.2).
    /// Allocation fractions sum to comfortably under 1.0, leaving headroom
    /// for the `unknown` bucket and operator-added strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let seed = vec![
            entry(
                "pcr_analysis",
                "PCR Analysis",
                70.0,
                0.12,
                &["PcrAnalysisStrategy", "PCRAnalysis", "PCRStrategy", "pcr-analysis"],
            ),
            entry(
                "oi_change_patterns",
                "OI Change Patterns",
                65.0,
                0.12,
                &["OiChangePatternsStrategy", "OIChangePatterns", "oi-change-patterns"],
            ),
            entry(
                "max_pain",
                "Max Pain",
                60.0,
                0.10,
                &["MaxPainStrategy", "MaxPain", "max-pain"],
            ),
            entry(
                "iv_skew",
                "IV Skew",
                65.0,
                0.10,
                &["IvSkewStrategy", "IVSkew", "iv-skew"],
            ),
            entry(
                "gamma_scalping",
                "Gamma Scalping",
                55.0,
                0.10,
                &["GammaScalpingStrategy", "GammaScalping", "gamma-scalping"],
            ),
            entry(
                "order_flow_imbalance",
                "Order Flow Imbalance",
                60.0,
                0.10,
                &["OrderFlowImbalanceStrategy", "OrderFlowImbalance", "order-flow-imbalance"],
            ),
            entry(
                "institutional_footprint",
                "Institutional Footprint",
                70.0,
                0.10,
                &[
                    "InstitutionalFootprintStrategy",
                    "InstitutionalFootprint",
                    "institutional-footprint",
                ],
            ),
            entry(
                "support_resistance_oi",
                "Support/Resistance from OI",
                55.0,
                0.08,
                &[
                    "SupportResistanceOiStrategy",
                    "SupportResistanceOI",
                    "support-resistance-oi",
                ],
            ),
            entry(
                "gap_and_go",
                "Gap and Go",
                50.0,
                0.08,
                &["GapAndGoStrategy", "GapAndGo", "gap-and-go"],
            ),
            entry(
                "time_of_day",
                "Time of Day Patterns",
                45.0,
                0.08,
                &["TimeOfDayStrategy", "TimeOfDay", "time-of-day"],
            ),
        ];

        let mut entries = FxHashMap::default();
        let mut alias_lookup = FxHashMap::default();
        for e in seed {
            let canonical = e.descriptor.canonical_id.clone();
            alias_lookup.insert(canonical.to_lowercase(), canonical.clone());
            // The human display name always normalises back to its own
            // canonical id (spec invariant 5: normalise(display(id)) = id),
            // in addition to whatever legacy class-style aliases it carries.
            alias_lookup.insert(e.descriptor.human_name.to_lowercase(), canonical.clone());
            for alias in e.aliases {
                alias_lookup.insert(alias.to_lowercase(), canonical.clone());
            }
            entries.insert(canonical, e);
        }

        entries.insert(
            UNKNOWN_STRATEGY_ID.to_string(),
            entry(
                UNKNOWN_STRATEGY_ID,
                "Unknown",
                0.0,
                UNKNOWN_ALLOCATION_FRACTION,
                &[],
            ),
        );

        Self { entries, alias_lookup }
    }

    /// Map any inbound name — human display name, legacy class name, or
    /// already-canonical id — to its canonical id. Falls back to
    /// `unknown` (spec §4.4).
    #[must_use]
    pub fn normalise(&self, any_name: &str) -> CanonicalId {
        self.alias_lookup
            .get(&any_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_STRATEGY_ID.to_string())
    }

    #[must_use]
    pub fn display(&self, canonical_id: &str) -> &str {
        self.entries
            .get(canonical_id)
            .map_or("Unknown", |e| e.descriptor.human_name.as_str())
    }

    #[must_use]
    pub fn allocation(&self, canonical_id: &str) -> f64 {
        self.entries
            .get(canonical_id)
            .map_or(UNKNOWN_ALLOCATION_FRACTION, |e| e.descriptor.default_allocation_fraction)
    }

    #[must_use]
    pub fn descriptor(&self, canonical_id: &str) -> Option<&StrategyDescriptor> {
        self.entries.get(canonical_id).map(|e| &e.descriptor)
    }

    pub fn enabled_ids(&self) -> impl Iterator<Item = &str> {
        self.entries
            .values()
            .filter(|e| e.descriptor.enabled && e.descriptor.canonical_id != UNKNOWN_STRATEGY_ID)
            .map(|e| e.descriptor.canonical_id.as_str())
    }

    /// Disable a strategy after sustained malformed-signal failures
    /// (spec §7, Domain error policy).
    pub fn disable(&mut self, canonical_id: &str) {
        if let Some(e) = self.entries.get_mut(canonical_id) {
            e.descriptor.enabled = false;
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl kernel_common::AllocationSource for StrategyRegistry {
    fn allocation(&self, canonical_id: &str) -> f64 {
        Self::allocation(self, canonical_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_legacy_class_name_to_canonical() {
        let reg = StrategyRegistry::with_defaults();
        assert_eq!(reg.normalise("PcrAnalysisStrategy"), "pcr_analysis");
        assert_eq!(reg.normalise("pcr_analysis"), "pcr_analysis");
    }

    #[test]
    fn s6_pcr_aliases_all_normalise_to_the_same_canonical_id() {
        // spec §8 S6: "PCR Analysis", "PCRStrategy", "pcr_analysis" must all
        // map to canonical `pcr_analysis`, with that strategy's allocation.
        let reg = StrategyRegistry::with_defaults();
        for name in ["PCR Analysis", "PCRStrategy", "pcr_analysis"] {
            assert_eq!(reg.normalise(name), "pcr_analysis", "{name} should normalise to pcr_analysis");
        }
        assert_eq!(reg.allocation("pcr_analysis"), 0.12);
    }

    #[test]
    fn normalise_of_display_round_trips_for_every_entry() {
        // spec invariant 5: normalise(display(id)) = id for every id in the
        // registry, and normalise is idempotent.
        let reg = StrategyRegistry::with_defaults();
        for id in reg.enabled_ids().map(str::to_string).collect::<Vec<_>>() {
            let human = reg.display(&id).to_string();
            assert_eq!(reg.normalise(&human), id);
            assert_eq!(reg.normalise(&reg.normalise(&id)), reg.normalise(&id));
        }
    }

    #[test]
    fn unknown_name_falls_back_with_lowest_allocation() {
        let reg = StrategyRegistry::with_defaults();
        let canonical = reg.normalise("totally_unrecognised_strategy");
        assert_eq!(canonical, "unknown");
        assert!(reg.allocation(&canonical) <= reg.allocation("pcr_analysis"));
    }

    #[test]
    fn disabled_strategy_is_excluded_from_enabled_ids() {
        let mut reg = StrategyRegistry::with_defaults();
        reg.disable("gap_and_go");
        assert!(!reg.enabled_ids().any(|id| id == "gap_and_go"));
        assert!(reg.enabled_ids().any(|id| id == "pcr_analysis"));
    }
}
