//! # Threshold Classifier
//!
//! Judges one [`ResourceAggregate`] against three independent tiers and
//! combines them by taking the worst result:
//!
//! | Tier        | Evaluated when                          | Triggers on            |
//! |-------------|-----------------------------------------|------------------------|
//! | total       | always                                  | data size at or above  |
//! | unsharded   | resource is not partitioned             | data size at or above  |
//! | efficiency  | data size at or above the tier's floor  | efficiency below       |
//!
//! A tier never lowers the verdict another tier produced.

use serde::Serialize;

use crate::config::{EfficiencyTier, SizeTier, Thresholds};
use crate::constants::Verdict;
use crate::models::ResourceAggregate;

/// Per-tier results for one resource; `None` means the tier was skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierVerdicts {
    pub total: Option<Verdict>,
    pub unsharded: Option<Verdict>,
    pub efficiency: Option<Verdict>,
}

impl TierVerdicts {
    /// Worst verdict across evaluated tiers, OK if nothing triggered
    pub fn combined(&self) -> Verdict {
        [self.total, self.unsharded, self.efficiency]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(Verdict::Ok)
    }
}

/// Outcome of classifying one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub verdict: Verdict,
    /// Total efficiency in percent; `None` when storage size is zero
    pub efficiency: Option<u64>,
    pub tiers: TierVerdicts,
}

/// Running totals across every classified resource.
///
/// Owned by the single thread that classifies; passed by `&mut`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalTally {
    pub ok_count: u64,
    pub warning_count: u64,
    pub critical_count: u64,
    pub error_count: u64,
    /// Largest total data size seen, in bytes
    pub biggest: u64,
}

impl GlobalTally {
    /// Count one classified resource
    pub fn record(&mut self, verdict: Verdict, data_size: u64) {
        match verdict {
            Verdict::Ok => self.ok_count += 1,
            Verdict::Warning => self.warning_count += 1,
            Verdict::Critical => self.critical_count += 1,
            Verdict::Unknown => self.error_count += 1,
        }
        self.biggest = self.biggest.max(data_size);
    }

    /// Count a failure that prevented classification
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Resources counted so far, errors included
    pub fn total(&self) -> u64 {
        self.ok_count + self.warning_count + self.critical_count + self.error_count
    }

    /// Worst verdict represented in the tally
    pub fn worst(&self) -> Verdict {
        if self.error_count > 0 {
            Verdict::Unknown
        } else if self.critical_count > 0 {
            Verdict::Critical
        } else if self.warning_count > 0 {
            Verdict::Warning
        } else {
            Verdict::Ok
        }
    }
}

/// Applies configured thresholds to resource aggregates
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classify one resource without touching any tally
    pub fn classify(&self, aggregate: &ResourceAggregate) -> Classification {
        let data_size = aggregate.total.data_size;
        let efficiency = aggregate.total.efficiency();

        let tiers = TierVerdicts {
            total: size_verdict(&self.thresholds.total, data_size),
            unsharded: if aggregate.partitioned {
                None
            } else {
                size_verdict(&self.thresholds.unsharded, data_size)
            },
            efficiency: efficiency_verdict(&self.thresholds.efficiency, data_size, efficiency),
        };

        Classification {
            verdict: tiers.combined(),
            efficiency,
            tiers,
        }
    }

    /// Classify one resource and count it in `tally`
    pub fn classify_into(
        &self,
        aggregate: &ResourceAggregate,
        tally: &mut GlobalTally,
    ) -> Classification {
        let classification = self.classify(aggregate);
        tally.record(classification.verdict, aggregate.total.data_size);
        classification
    }
}

fn size_verdict(tier: &SizeTier, data_size: u64) -> Option<Verdict> {
    let (warning, critical) = tier.limits()?;
    Some(if data_size >= critical {
        Verdict::Critical
    } else if data_size >= warning {
        Verdict::Warning
    } else {
        Verdict::Ok
    })
}

fn efficiency_verdict(
    tier: &EfficiencyTier,
    data_size: u64,
    efficiency: Option<u64>,
) -> Option<Verdict> {
    let (warning, critical) = tier.limits()?;
    if data_size < tier.floor() {
        return None;
    }
    // Undefined efficiency (no storage allocated) is not judged
    let efficiency = efficiency?;
    Some(if efficiency < critical {
        Verdict::Critical
    } else if efficiency < warning {
        Verdict::Warning
    } else {
        Verdict::Ok
    })
}
