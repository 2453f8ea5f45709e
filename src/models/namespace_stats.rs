//! Size figures for a single namespace

use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Logical and physical size of one namespace, in bytes.
///
/// `storage_size >= data_size` is the normal case but is not enforced; a
/// compressed or freshly compacted namespace can report more data than
/// storage, which shows up as an efficiency above 100%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub data_size: u64,
    pub storage_size: u64,
}

impl NamespaceStats {
    pub fn new(data_size: u64, storage_size: u64) -> Self {
        Self {
            data_size,
            storage_size,
        }
    }

    /// Data size as a whole percentage of storage size, truncated.
    ///
    /// Returns `None` when nothing is allocated, since the ratio is undefined.
    pub fn efficiency(&self) -> Option<u64> {
        if self.storage_size == 0 {
            return None;
        }
        let percent = u128::from(self.data_size) * 100 / u128::from(self.storage_size);
        Some(u64::try_from(percent).unwrap_or(u64::MAX))
    }
}

impl Add for NamespaceStats {
    type Output = NamespaceStats;

    fn add(self, other: NamespaceStats) -> NamespaceStats {
        NamespaceStats {
            data_size: self.data_size.saturating_add(other.data_size),
            storage_size: self.storage_size.saturating_add(other.storage_size),
        }
    }
}

impl std::iter::Sum for NamespaceStats {
    fn sum<I: Iterator<Item = NamespaceStats>>(iter: I) -> Self {
        iter.fold(NamespaceStats::default(), Add::add)
    }
}
