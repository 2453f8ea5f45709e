#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Namespace Size Check
//!
//! Monitoring check that inventories every namespace of a data store,
//! measures each one in parallel, and classifies the results against tiered
//! size and efficiency thresholds into a single OK / WARNING / CRITICAL /
//! UNKNOWN verdict.
//!
//! ## Architecture
//!
//! - A fixed-size [`WorkerPool`] of OS threads, each owning its own data
//!   source session built by the pool's init hook
//! - [`TaskFuture`]s decoupling submission from the blocking `get()`
//! - A [`StatsCollector`] running two barrier-separated waves: discover
//!   resources, then measure them
//! - A [`Classifier`] combining independent tiers by worst severity while
//!   keeping a [`GlobalTally`]
//!
//! ## Module Organization
//!
//! - [`client`] - data source traits and the JSON snapshot source
//! - [`config`] - thresholds, layered loading, size strings
//! - [`execution`] - worker pool and futures
//! - [`orchestration`] - collector, classifier, runner and report
//! - [`models`] - namespace statistics and resource aggregates
//! - [`error`] - structured error handling
//! - [`logging`] - tracing setup
//!
//! ## Quick Start
//!
//! ```rust
//! use namespace_check::client::{ResourceSnapshot, Snapshot, SnapshotConnector};
//! use namespace_check::config::{CheckConfig, SizeTier};
//! use namespace_check::{run_check, ReportBuilder, Verdict};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut snapshot = Snapshot::default();
//! snapshot.insert("shop", "orders", ResourceSnapshot::new(6000, 8000, false));
//!
//! let mut config = CheckConfig::default();
//! config.threads = 2;
//! config.thresholds.total = SizeTier::new(1000, 5000);
//!
//! let outcome = run_check(config.clone(), Arc::new(SnapshotConnector::new(snapshot)))?;
//! assert_eq!(outcome.verdict, Verdict::Critical);
//!
//! let report = ReportBuilder::from_config(&config).build(&outcome);
//! println!("{}", report.render());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod models;
pub mod orchestration;

pub use client::{DataSource, DataSourceConnector, SnapshotConnector};
pub use config::{CheckConfig, ConfigManager, ConfigurationError};
pub use constants::Verdict;
pub use error::{CheckError, Result};
pub use execution::{FutureState, TaskFuture, WorkerPool};
pub use models::{NamespaceStats, ResourceAggregate, ResourceKey};
pub use orchestration::{
    run_check, CheckOutcome, CheckReport, CheckRunner, Classification, Classifier, GlobalTally,
    ReportBuilder, StatsCollector,
};
