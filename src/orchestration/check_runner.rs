//! # Check Runner
//!
//! Runs one complete check: start a pool whose workers each open their own
//! data source session, collect every resource in two waves, then classify
//! the results sequentially on the calling thread.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::classifier::{Classification, Classifier, GlobalTally};
use super::stats_collector::{CollectedResource, DataSourcePool, StatsCollector};
use crate::client::DataSourceConnector;
use crate::config::CheckConfig;
use crate::constants::Verdict;
use crate::error::{CheckError, Result};
use crate::execution::{PoolStatsSnapshot, WorkerPool};
use crate::logging::log_error;
use crate::models::{ResourceAggregate, ResourceKey};

/// Classified result for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceVerdict {
    pub key: ResourceKey,
    pub aggregate: ResourceAggregate,
    pub classification: Classification,
}

impl ResourceVerdict {
    pub fn verdict(&self) -> Verdict {
        self.classification.verdict
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub tally: GlobalTally,
    /// Empty when the run failed; partial results are never reported
    pub resources: Vec<ResourceVerdict>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<CheckError>,
    pub pool: PoolStatsSnapshot,
}

impl CheckOutcome {
    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }

    /// Resources at WARNING or CRITICAL
    pub fn problems(&self) -> impl Iterator<Item = &ResourceVerdict> {
        self.resources
            .iter()
            .filter(|resource| resource.verdict().is_problematic())
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<CheckError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Validated configuration plus the connector sessions are opened with
pub struct CheckRunner {
    config: CheckConfig,
    connector: Arc<dyn DataSourceConnector>,
}

impl CheckRunner {
    /// Fails with [`CheckError::Configuration`] before any work starts
    pub fn new(config: CheckConfig, connector: Arc<dyn DataSourceConnector>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, connector })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Run the check. Remote failures and expired deadlines produce an
    /// UNKNOWN outcome rather than an error.
    pub fn run(&self) -> CheckOutcome {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("check_run", %run_id);
        let _entered = span.enter();

        info!(
            source = %self.connector.describe(),
            threads = self.config.threads,
            "Starting check"
        );

        let worker_connector = Arc::clone(&self.connector);
        let mut pool: DataSourcePool =
            WorkerPool::with_init_hook(move || worker_connector.connect());

        let collected = pool.start(self.config.threads).and_then(|()| {
            let mut primary = self.connector.connect()?;
            StatsCollector::new(&pool)
                .with_deadline(self.config.timeout())
                .collect(primary.as_mut())
        });

        let pool_stats = pool.stats();

        match collected {
            Ok(collected) => {
                pool.shutdown();
                let (resources, tally) = self.classify(collected);
                let verdict = tally.worst();
                info!(
                    verdict = %verdict,
                    ok = tally.ok_count,
                    warning = tally.warning_count,
                    critical = tally.critical_count,
                    biggest = tally.biggest,
                    "Check complete"
                );
                CheckOutcome {
                    run_id,
                    started_at,
                    verdict,
                    tally,
                    resources,
                    error: None,
                    pool: pool_stats,
                }
            }
            Err(error) => {
                // Remaining tasks may be slow or hung; don't wait for them
                pool.detach();
                log_error("check_runner", "collect", &error.to_string(), None);

                let mut tally = GlobalTally::default();
                tally.record_error();
                CheckOutcome {
                    run_id,
                    started_at,
                    verdict: Verdict::Unknown,
                    tally,
                    resources: Vec::new(),
                    error: Some(error),
                    pool: pool_stats,
                }
            }
        }
    }

    fn classify(&self, collected: Vec<CollectedResource>) -> (Vec<ResourceVerdict>, GlobalTally) {
        let classifier = Classifier::new(self.config.thresholds.clone());
        let mut tally = GlobalTally::default();

        let resources = collected
            .into_iter()
            .map(|CollectedResource { key, aggregate }| {
                let classification = classifier.classify_into(&aggregate, &mut tally);
                if classification.verdict.is_problematic() {
                    warn!(
                        resource = %key,
                        verdict = %classification.verdict,
                        data_size = aggregate.total.data_size,
                        efficiency = classification.efficiency,
                        "Resource over threshold"
                    );
                } else {
                    debug!(resource = %key, "Resource ok");
                }
                ResourceVerdict {
                    key,
                    aggregate,
                    classification,
                }
            })
            .collect();

        (resources, tally)
    }
}

/// Validate `config` and run a check against `connector`
pub fn run_check(
    config: CheckConfig,
    connector: Arc<dyn DataSourceConnector>,
) -> Result<CheckOutcome> {
    Ok(CheckRunner::new(config, connector)?.run())
}
