pub mod namespace_stats;
pub mod resource_aggregate;

// Re-export core models for easy access
pub use namespace_stats::NamespaceStats;
pub use resource_aggregate::{ResourceAggregate, ResourceKey};
