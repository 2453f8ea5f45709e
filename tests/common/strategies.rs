use proptest::prelude::*;
use std::collections::BTreeMap;

use namespace_check::config::{EfficiencyTier, SizeTier, Thresholds};
use namespace_check::models::{NamespaceStats, ResourceAggregate};

/// Strategy for namespace figures, including zero storage
pub fn namespace_stats_strategy() -> impl Strategy<Value = NamespaceStats> {
    prop_oneof![
        (0u64..=1 << 40, 0u64..=1 << 40).prop_map(|(data, storage)| NamespaceStats::new(data, storage)),
        (0u64..=1 << 40).prop_map(|data| NamespaceStats::new(data, 0)),
    ]
}

/// Strategy for aggregates with up to four sub-structures
pub fn resource_aggregate_strategy() -> impl Strategy<Value = ResourceAggregate> {
    (
        namespace_stats_strategy(),
        prop::collection::vec(namespace_stats_strategy(), 0..4),
        any::<bool>(),
    )
        .prop_map(|(own, children, partitioned)| {
            let children: BTreeMap<String, NamespaceStats> = children
                .into_iter()
                .enumerate()
                .map(|(index, stats)| (format!("idx_{index}"), stats))
                .collect();
            ResourceAggregate::new(own, children, partitioned)
        })
}

/// Strategy for a fully configured size tier with warning <= critical
pub fn size_tier_strategy() -> impl Strategy<Value = SizeTier> {
    (0u64..=1 << 41, 0u64..=1 << 41).prop_map(|(a, b)| SizeTier::new(a.min(b), a.max(b)))
}

/// Strategy for an efficiency tier with critical <= warning
pub fn efficiency_tier_strategy() -> impl Strategy<Value = EfficiencyTier> {
    (0u64..=100, 0u64..=100, 0u64..=1 << 41)
        .prop_map(|(a, b, floor)| EfficiencyTier::new(a.max(b), a.min(b), floor))
}

/// Strategy for thresholds where the optional tiers may be unset
pub fn thresholds_strategy() -> impl Strategy<Value = Thresholds> {
    (
        size_tier_strategy(),
        prop::option::of(size_tier_strategy()),
        prop::option::of(efficiency_tier_strategy()),
    )
        .prop_map(|(total, unsharded, efficiency)| Thresholds {
            total,
            unsharded: unsharded.unwrap_or_default(),
            efficiency: efficiency.unwrap_or_default(),
        })
}
