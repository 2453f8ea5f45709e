//! Per-resource measurement results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::NamespaceStats;
use crate::constants::SUB_STRUCTURE_SEPARATOR;

/// A resource inside a container, e.g. collection `orders` in database `shop`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub container: String,
    pub resource: String,
}

impl ResourceKey {
    pub fn new<C: Into<String>, R: Into<String>>(container: C, resource: R) -> Self {
        Self {
            container: container.into(),
            resource: resource.into(),
        }
    }

    /// `container.resource`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.container, self.resource)
    }

    /// Namespace name of a sub-structure within this resource, relative to
    /// the container: `resource.$sub_structure`
    pub fn sub_structure_namespace(&self, sub_structure: &str) -> String {
        format!("{}{}{}", self.resource, SUB_STRUCTURE_SEPARATOR, sub_structure)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.resource)
    }
}

/// Sizes for one resource: its own namespace, each sub-structure, and the sum.
///
/// Built once by the collector and read once by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAggregate {
    pub total: NamespaceStats,
    pub own: NamespaceStats,
    pub children: BTreeMap<String, NamespaceStats>,
    pub partitioned: bool,
}

impl ResourceAggregate {
    /// Build an aggregate, summing `own` and every child into `total`
    pub fn new(
        own: NamespaceStats,
        children: BTreeMap<String, NamespaceStats>,
        partitioned: bool,
    ) -> Self {
        let total = own + children.values().copied().sum::<NamespaceStats>();
        Self {
            total,
            own,
            children,
            partitioned,
        }
    }

    /// Aggregate for a resource without sub-structures
    pub fn leaf(own: NamespaceStats, partitioned: bool) -> Self {
        Self::new(own, BTreeMap::new(), partitioned)
    }
}
