//! Snapshot data source
//!
//! Serves namespace sizes from a JSON document captured earlier (for example
//! from `collStats` output), so the check can run without a live server:
//!
//! ```json
//! {
//!   "containers": {
//!     "shop": {
//!       "orders": {
//!         "data_size": 1048576,
//!         "storage_size": 2097152,
//!         "partitioned": false,
//!         "sub_structures": {
//!           "_id_": { "data_size": 4096, "storage_size": 8192 }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::traits::{DataSource, DataSourceConnector};
use crate::constants::SUB_STRUCTURE_SEPARATOR;
use crate::error::{CheckError, Result};
use crate::models::NamespaceStats;

/// Captured sizes for every container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub containers: BTreeMap<String, BTreeMap<String, ResourceSnapshot>>,
}

/// Captured sizes for one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub data_size: u64,
    pub storage_size: u64,
    #[serde(default)]
    pub partitioned: bool,
    #[serde(default)]
    pub sub_structures: BTreeMap<String, NamespaceStats>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CheckError::remote_query(format!("invalid snapshot: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CheckError::remote_query(format!("cannot read snapshot {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Add or replace a resource
    pub fn insert(&mut self, container: &str, resource: &str, snapshot: ResourceSnapshot) {
        self.containers
            .entry(container.to_string())
            .or_default()
            .insert(resource.to_string(), snapshot);
    }

    pub fn resource_count(&self) -> usize {
        self.containers.values().map(BTreeMap::len).sum()
    }

    fn resource(&self, container: &str, resource: &str) -> Result<&ResourceSnapshot> {
        self.containers
            .get(container)
            .and_then(|resources| resources.get(resource))
            .ok_or_else(|| {
                CheckError::remote_query(format!("ns not found: {container}.{resource}"))
            })
    }
}

impl ResourceSnapshot {
    pub fn new(data_size: u64, storage_size: u64, partitioned: bool) -> Self {
        Self {
            data_size,
            storage_size,
            partitioned,
            sub_structures: BTreeMap::new(),
        }
    }

    pub fn with_sub_structure(mut self, name: &str, stats: NamespaceStats) -> Self {
        self.sub_structures.insert(name.to_string(), stats);
        self
    }
}

/// Read-only session over a shared [`Snapshot`]
#[derive(Debug, Clone)]
pub struct SnapshotDataSource {
    snapshot: Arc<Snapshot>,
}

impl SnapshotDataSource {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }
}

impl DataSource for SnapshotDataSource {
    fn list_containers(&mut self) -> Result<Vec<String>> {
        Ok(self.snapshot.containers.keys().cloned().collect())
    }

    fn list_resources(&mut self, container: &str) -> Result<Vec<String>> {
        self.snapshot
            .containers
            .get(container)
            .map(|resources| resources.keys().cloned().collect())
            .ok_or_else(|| CheckError::remote_query(format!("unknown container: {container}")))
    }

    fn list_sub_structures(&mut self, container: &str, resource: &str) -> Result<Vec<String>> {
        let resource = self.snapshot.resource(container, resource)?;
        Ok(resource.sub_structures.keys().cloned().collect())
    }

    fn measure_namespace(&mut self, container: &str, namespace: &str) -> Result<NamespaceStats> {
        match namespace.split_once(SUB_STRUCTURE_SEPARATOR) {
            Some((resource, sub_structure)) => self
                .snapshot
                .resource(container, resource)?
                .sub_structures
                .get(sub_structure)
                .copied()
                .ok_or_else(|| {
                    CheckError::remote_query(format!("ns not found: {container}.{namespace}"))
                }),
            None => {
                let resource = self.snapshot.resource(container, namespace)?;
                Ok(NamespaceStats::new(resource.data_size, resource.storage_size))
            }
        }
    }

    fn is_partitioned(&mut self, container: &str, resource: &str) -> Result<bool> {
        Ok(self.snapshot.resource(container, resource)?.partitioned)
    }
}

/// Hands every worker its own session over one shared snapshot
#[derive(Debug, Clone)]
pub struct SnapshotConnector {
    snapshot: Arc<Snapshot>,
    origin: String,
}

impl SnapshotConnector {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            origin: "in-memory snapshot".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let snapshot = Snapshot::from_file(path)?;
        debug!(
            path = %path.display(),
            containers = snapshot.containers.len(),
            resources = snapshot.resource_count(),
            "Loaded snapshot"
        );
        Ok(Self {
            snapshot: Arc::new(snapshot),
            origin: path.display().to_string(),
        })
    }
}

impl DataSourceConnector for SnapshotConnector {
    fn connect(&self) -> Result<Box<dyn DataSource>> {
        Ok(Box::new(SnapshotDataSource::new(Arc::clone(&self.snapshot))))
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SnapshotDataSource {
        let mut snapshot = Snapshot::default();
        snapshot.insert(
            "shop",
            "orders",
            ResourceSnapshot::new(100, 200, true)
                .with_sub_structure("_id_", NamespaceStats::new(10, 20)),
        );
        snapshot.insert("shop", "users", ResourceSnapshot::new(5, 8, false));
        SnapshotDataSource::new(Arc::new(snapshot))
    }

    #[test]
    fn test_listing() {
        let mut source = sample();
        assert_eq!(source.list_containers().unwrap(), vec!["shop"]);
        assert_eq!(source.list_resources("shop").unwrap(), vec!["orders", "users"]);
        assert_eq!(source.list_sub_structures("shop", "orders").unwrap(), vec!["_id_"]);
        assert!(source.list_sub_structures("shop", "users").unwrap().is_empty());
    }

    #[test]
    fn test_measure_resource_and_sub_structure() {
        let mut source = sample();
        assert_eq!(
            source.measure_namespace("shop", "orders").unwrap(),
            NamespaceStats::new(100, 200)
        );
        assert_eq!(
            source.measure_namespace("shop", "orders.$_id_").unwrap(),
            NamespaceStats::new(10, 20)
        );
        assert!(source.is_partitioned("shop", "orders").unwrap());
        assert!(!source.is_partitioned("shop", "users").unwrap());
    }

    #[test]
    fn test_unknown_namespaces_are_remote_errors() {
        let mut source = sample();
        assert!(matches!(
            source.measure_namespace("shop", "carts"),
            Err(CheckError::RemoteQuery(_))
        ));
        assert!(matches!(
            source.measure_namespace("shop", "orders.$email_1"),
            Err(CheckError::RemoteQuery(_))
        ));
        assert!(matches!(
            source.list_resources("archive"),
            Err(CheckError::RemoteQuery(_))
        ));
    }

    #[test]
    fn test_parse_json() {
        let snapshot = Snapshot::from_json(
            r#"{"containers": {"db": {"c": {"data_size": 1, "storage_size": 2}}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.resource_count(), 1);
        assert!(!snapshot.containers["db"]["c"].partitioned);

        assert!(matches!(
            Snapshot::from_json("{not json"),
            Err(CheckError::RemoteQuery(_))
        ));
    }

    #[test]
    fn test_connector_sessions_share_snapshot() {
        let mut snapshot = Snapshot::default();
        snapshot.insert("db", "c", ResourceSnapshot::new(1, 1, false));
        let connector = SnapshotConnector::new(snapshot);

        let mut first = connector.connect().unwrap();
        let mut second = connector.connect().unwrap();
        assert_eq!(first.list_containers().unwrap(), second.list_containers().unwrap());
        assert_eq!(connector.describe(), "snapshot in-memory snapshot");
    }
}
