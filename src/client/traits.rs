//! # Data Source Traits
//!
//! The seam between the check engine and whatever actually stores the
//! namespaces. A [`DataSource`] is one client session; a
//! [`DataSourceConnector`] opens sessions, one per pool worker plus one for
//! the orchestrating thread.

use crate::error::Result;
use crate::models::NamespaceStats;

/// One client session against the data source.
///
/// Methods take `&mut self`: a session belongs to exactly one worker and is
/// never shared, so implementations need no internal locking. Every failure
/// should be reported as [`CheckError::RemoteQuery`](crate::error::CheckError::RemoteQuery).
pub trait DataSource {
    /// Top-level containers, e.g. database names
    fn list_containers(&mut self) -> Result<Vec<String>>;

    /// Resources inside a container, e.g. collection names
    fn list_resources(&mut self, container: &str) -> Result<Vec<String>>;

    /// Sub-structures of a resource, e.g. index names
    fn list_sub_structures(&mut self, container: &str, resource: &str) -> Result<Vec<String>>;

    /// Size figures for one namespace.
    ///
    /// `namespace` is relative to the container: either a resource name or a
    /// sub-structure name of the form `resource.$sub_structure`.
    fn measure_namespace(&mut self, container: &str, namespace: &str) -> Result<NamespaceStats>;

    /// Whether the resource's data is split across partitions or shards
    fn is_partitioned(&mut self, container: &str, resource: &str) -> Result<bool>;
}

impl<D: DataSource + ?Sized> DataSource for Box<D> {
    fn list_containers(&mut self) -> Result<Vec<String>> {
        (**self).list_containers()
    }

    fn list_resources(&mut self, container: &str) -> Result<Vec<String>> {
        (**self).list_resources(container)
    }

    fn list_sub_structures(&mut self, container: &str, resource: &str) -> Result<Vec<String>> {
        (**self).list_sub_structures(container, resource)
    }

    fn measure_namespace(&mut self, container: &str, namespace: &str) -> Result<NamespaceStats> {
        (**self).measure_namespace(container, namespace)
    }

    fn is_partitioned(&mut self, container: &str, resource: &str) -> Result<bool> {
        (**self).is_partitioned(container, resource)
    }
}

/// Opens data source sessions.
///
/// Called from pool worker threads as the pool's init hook, so it must be
/// shareable across threads; the sessions it returns need not be.
pub trait DataSourceConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn DataSource>>;

    /// Short description for logs, e.g. `host:port`
    fn describe(&self) -> String {
        "data source".to_string()
    }
}
