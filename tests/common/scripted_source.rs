//! In-memory data source with injectable faults.
//!
//! Wraps the snapshot source and lets a test make connections fail, make
//! chosen namespaces fail or hang, and count what the engine asked for.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use namespace_check::client::{ResourceSnapshot, Snapshot, SnapshotConnector};
use namespace_check::config::{CheckConfig, EfficiencyTier, SizeTier};
use namespace_check::error::{CheckError, Result};
use namespace_check::models::NamespaceStats;
use namespace_check::{DataSource, DataSourceConnector};

/// Fault plan shared by every session a [`ScriptedConnector`] opens
#[derive(Debug, Default)]
pub struct Faults {
    pub refuse_connections: bool,
    pub failing_namespaces: HashSet<String>,
    pub slow_namespaces: HashSet<String>,
    pub delay: Duration,
    pub connects: AtomicUsize,
    pub measured: Mutex<Vec<String>>,
}

impl Faults {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn measured(&self) -> Vec<String> {
        self.measured.lock().clone()
    }
}

pub struct ScriptedConnector {
    inner: SnapshotConnector,
    pub faults: Arc<Faults>,
}

impl ScriptedConnector {
    pub fn new(snapshot: Snapshot) -> Self {
        Self::with_faults(snapshot, Faults::default())
    }

    pub fn with_faults(snapshot: Snapshot, faults: Faults) -> Self {
        Self {
            inner: SnapshotConnector::new(snapshot),
            faults: Arc::new(faults),
        }
    }
}

impl DataSourceConnector for ScriptedConnector {
    fn connect(&self) -> Result<Box<dyn DataSource>> {
        self.faults.connects.fetch_add(1, Ordering::SeqCst);
        if self.faults.refuse_connections {
            return Err(CheckError::remote_query("connection refused"));
        }
        Ok(Box::new(ScriptedSource {
            inner: self.inner.connect()?,
            faults: Arc::clone(&self.faults),
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedSource {
    inner: Box<dyn DataSource>,
    faults: Arc<Faults>,
}

impl DataSource for ScriptedSource {
    fn list_containers(&mut self) -> Result<Vec<String>> {
        self.inner.list_containers()
    }

    fn list_resources(&mut self, container: &str) -> Result<Vec<String>> {
        self.inner.list_resources(container)
    }

    fn list_sub_structures(&mut self, container: &str, resource: &str) -> Result<Vec<String>> {
        self.inner.list_sub_structures(container, resource)
    }

    fn measure_namespace(&mut self, container: &str, namespace: &str) -> Result<NamespaceStats> {
        let full_name = format!("{container}.{namespace}");
        self.faults.measured.lock().push(full_name.clone());

        if self.faults.slow_namespaces.contains(&full_name) {
            thread::sleep(self.faults.delay);
        }
        if self.faults.failing_namespaces.contains(&full_name) {
            return Err(CheckError::remote_query(format!("collStats failed for {full_name}")));
        }
        self.inner.measure_namespace(container, namespace)
    }

    fn is_partitioned(&mut self, container: &str, resource: &str) -> Result<bool> {
        self.inner.is_partitioned(container, resource)
    }
}

/// Three unsharded resources: small, huge and sparse
pub fn three_resource_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.insert("app", "small", ResourceSnapshot::new(100, 100, false));
    snapshot.insert("app", "huge", ResourceSnapshot::new(5000, 5000, false));
    snapshot.insert("app", "sparse", ResourceSnapshot::new(50, 200, false));
    snapshot
}

/// total 1000/5000, unsharded 1000/4000, efficiency 50%/20% above `floor`
pub fn tiered_config(threads: usize, floor: u64) -> CheckConfig {
    let mut config = CheckConfig::default();
    config.threads = threads;
    config.thresholds.total = SizeTier::new(1000, 5000);
    config.thresholds.unsharded = SizeTier::new(1000, 4000);
    config.thresholds.efficiency = EfficiencyTier::new(50, 20, floor);
    config
}
