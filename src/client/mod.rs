//! # Data Source Clients
//!
//! The check engine talks to storage only through the [`DataSource`] and
//! [`DataSourceConnector`] traits. A [`SnapshotConnector`] serving captured
//! sizes from JSON is included for offline runs and tests.

pub mod snapshot;
pub mod traits;

pub use snapshot::{ResourceSnapshot, Snapshot, SnapshotConnector, SnapshotDataSource};
pub use traits::{DataSource, DataSourceConnector};
