//! # Report Builder
//!
//! Turns a [`CheckOutcome`] into monitoring plugin output: one summary line
//! followed by optional per-resource detail lines.
//!
//! ```text
//! MongoDB collection size CRITICAL: 1 critical, biggest is 4.88 kilobytes
//! shop.orders 6.1 kilobytes 80% unsharded *** CRITICAL ***
//!   data 4.2 kilobytes 85%
//!   _id_ 1.9 kilobytes 68%
//! ```

use serde::Serialize;

use super::check_runner::{CheckOutcome, ResourceVerdict};
use crate::config::CheckConfig;
use crate::constants::Verdict;
use crate::models::NamespaceStats;

const UNITS: [&str; 5] = ["bytes", "kilobytes", "megabytes", "gigabytes", "terabytes"];

/// Rendered check output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub verdict: Verdict,
    /// Comma-separated into the summary line
    pub messages: Vec<String>,
    /// Printed one per line after the summary
    pub details: Vec<String>,
}

impl CheckReport {
    pub fn summary_line(&self) -> String {
        if self.messages.is_empty() {
            format!("{} {}", self.name, self.verdict)
        } else {
            format!("{} {}: {}", self.name, self.verdict, self.messages.join(", "))
        }
    }

    pub fn render(&self) -> String {
        std::iter::once(self.summary_line())
            .chain(self.details.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }
}

/// Output options taken from the check configuration
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    name: String,
    verbose: bool,
    breakdown: bool,
}

impl ReportBuilder {
    pub fn new<S: Into<String>>(name: S, verbose: bool, breakdown: bool) -> Self {
        Self {
            name: name.into(),
            verbose,
            breakdown,
        }
    }

    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.name.clone(), config.verbose, config.breakdown)
    }

    pub fn build(&self, outcome: &CheckOutcome) -> CheckReport {
        if let Some(error) = &outcome.error {
            return CheckReport {
                name: self.name.clone(),
                verdict: Verdict::Unknown,
                messages: vec![error.to_string()],
                details: Vec::new(),
            };
        }

        let tally = &outcome.tally;
        let mut messages = Vec::new();
        if tally.critical_count > 0 {
            messages.push(format!("{} critical", tally.critical_count));
        }
        if tally.warning_count > 0 {
            messages.push(format!("{} warning", tally.warning_count));
        }
        if tally.error_count > 0 {
            messages.push(format!("{} errors", tally.error_count));
        }
        messages.push(format!("biggest is {}", byte_size(tally.biggest)));

        let details = if self.verbose {
            outcome
                .problems()
                .flat_map(|resource| self.resource_lines(resource))
                .collect()
        } else {
            Vec::new()
        };

        CheckReport {
            name: self.name.clone(),
            verdict: outcome.verdict,
            messages,
            details,
        }
    }

    fn resource_lines(&self, resource: &ResourceVerdict) -> Vec<String> {
        let aggregate = &resource.aggregate;
        let status = match resource.verdict() {
            Verdict::Critical => "*** CRITICAL ***",
            Verdict::Warning => "warning",
            _ => "ok",
        };
        let sharding = if aggregate.partitioned {
            "sharded"
        } else {
            "unsharded"
        };

        let mut lines = vec![format!(
            "{} {} {} {} {}",
            resource.key,
            byte_size(aggregate.total.storage_size),
            efficiency_label(resource.classification.efficiency),
            sharding,
            status
        )];

        if self.breakdown {
            lines.push(breakdown_line("data", &aggregate.own));
            for (name, stats) in &aggregate.children {
                lines.push(breakdown_line(name, stats));
            }
        }

        lines
    }
}

fn breakdown_line(label: &str, stats: &NamespaceStats) -> String {
    format!(
        "  {} {} {}",
        label,
        byte_size(stats.storage_size),
        efficiency_label(stats.efficiency())
    )
}

fn efficiency_label(efficiency: Option<u64>) -> String {
    match efficiency {
        Some(percent) => format!("{percent}%"),
        None => "n/a".to_string(),
    }
}

/// Human-readable size with three significant digits, e.g. `4.88 kilobytes`
pub fn byte_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{} {}", three_significant(size), UNITS[unit])
}

/// printf-style `%.3g`: three significant digits, trailing zeros dropped,
/// exponent notation at 1000 and above or below 0.0001
fn three_significant(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }

    let scientific = format!("{value:.2e}");
    let exponent: i32 = scientific
        .split_once('e')
        .and_then(|(_, exponent)| exponent.parse().ok())
        .unwrap_or(0);

    if !(-4..3).contains(&exponent) {
        let mantissa = scientific.split_once('e').map_or("", |(m, _)| m);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        );
    }

    let decimals = (2 - exponent) as usize;
    trim_fraction(&format!("{value:.decimals$}")).to_string()
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use crate::execution::PoolStatsSnapshot;
    use crate::models::{ResourceAggregate, ResourceKey};
    use crate::orchestration::classifier::{Classification, GlobalTally, TierVerdicts};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn outcome(resources: Vec<ResourceVerdict>, tally: GlobalTally) -> CheckOutcome {
        CheckOutcome {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            verdict: tally.worst(),
            tally,
            resources,
            error: None,
            pool: PoolStatsSnapshot::default(),
        }
    }

    fn critical_resource() -> ResourceVerdict {
        let children = BTreeMap::from([("_id_".to_string(), NamespaceStats::new(1000, 2000))]);
        let aggregate = ResourceAggregate::new(NamespaceStats::new(5000, 6000), children, false);
        ResourceVerdict {
            key: ResourceKey::new("shop", "orders"),
            classification: Classification {
                verdict: Verdict::Critical,
                efficiency: aggregate.total.efficiency(),
                tiers: TierVerdicts {
                    total: Some(Verdict::Critical),
                    ..TierVerdicts::default()
                },
            },
            aggregate,
        }
    }

    #[test]
    fn test_byte_size_units() {
        assert_eq!(byte_size(0), "0 bytes");
        assert_eq!(byte_size(512), "512 bytes");
        assert_eq!(byte_size(5000), "4.88 kilobytes");
        assert_eq!(byte_size(1024 * 1024), "1 megabytes");
        assert_eq!(byte_size(3 * 1024 * 1024 * 1024 / 2), "1.5 gigabytes");
        assert_eq!(byte_size(2048 * 1024u64.pow(4)), "2.05e+03 terabytes");
    }

    #[test]
    fn test_three_significant_digits() {
        assert_eq!(three_significant(100.0), "100");
        assert_eq!(three_significant(12.345), "12.3");
        assert_eq!(three_significant(1023.0), "1.02e+03");
        assert_eq!(three_significant(999.7), "1e+03");
        assert_eq!(three_significant(0.5), "0.5");
    }

    #[test]
    fn test_summary_line() {
        let mut tally = GlobalTally::default();
        tally.record(Verdict::Ok, 100);
        tally.record(Verdict::Critical, 5000);
        let report = ReportBuilder::new("MongoDB collection size", false, false)
            .build(&outcome(vec![critical_resource()], tally));

        assert_eq!(
            report.summary_line(),
            "MongoDB collection size CRITICAL: 1 critical, biggest is 4.88 kilobytes"
        );
        assert!(report.details.is_empty());
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_verbose_and_breakdown_details() {
        let mut tally = GlobalTally::default();
        tally.record(Verdict::Critical, 6000);
        let outcome = outcome(vec![critical_resource()], tally);

        let verbose = ReportBuilder::new("check", true, false).build(&outcome);
        assert_eq!(
            verbose.details,
            vec!["shop.orders 7.81 kilobytes 75% unsharded *** CRITICAL ***"]
        );

        let breakdown = ReportBuilder::new("check", true, true).build(&outcome);
        assert_eq!(
            breakdown.details,
            vec![
                "shop.orders 7.81 kilobytes 75% unsharded *** CRITICAL ***",
                "  data 5.86 kilobytes 83%",
                "  _id_ 1.95 kilobytes 50%",
            ]
        );
        assert!(breakdown.render().starts_with("check CRITICAL: 1 critical"));
    }

    #[test]
    fn test_failed_run_reports_unknown() {
        let mut failed = outcome(Vec::new(), GlobalTally::default());
        failed.verdict = Verdict::Unknown;
        failed.error = Some(CheckError::remote_query("connection refused"));

        let report = ReportBuilder::new("check", true, true).build(&failed);
        assert_eq!(
            report.render(),
            "check UNKNOWN: Remote query error: connection refused"
        );
        assert_eq!(report.exit_code(), 3);
    }
}
