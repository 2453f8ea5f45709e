//! # Check Orchestration
//!
//! Collection, classification and reporting for one check run.
//!
//! - [`stats_collector`] - two-wave fan-out over the worker pool
//! - [`classifier`] - tiered thresholds and the global tally
//! - [`check_runner`] - ties configuration, pool, collector and classifier together
//! - [`report`] - summary and detail lines for monitoring output

pub mod check_runner;
pub mod classifier;
pub mod report;
pub mod stats_collector;

pub use check_runner::{run_check, CheckOutcome, CheckRunner, ResourceVerdict};
pub use classifier::{Classification, Classifier, GlobalTally, TierVerdicts};
pub use report::{byte_size, CheckReport, ReportBuilder};
pub use stats_collector::{measure_resource, CollectedResource, DataSourcePool, StatsCollector};
