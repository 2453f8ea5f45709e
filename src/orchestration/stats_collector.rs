//! # Stats Collector
//!
//! Two fan-out waves over a shared [`WorkerPool`]:
//!
//! 1. **Discovery** - one task per container lists its resources.
//! 2. **Measurement** - one task per resource measures it and its
//!    sub-structures and looks up whether it is partitioned.
//!
//! Each wave ends in a barrier: every future of the wave is resolved before
//! anything of the next wave is submitted. Task bodies only talk to their
//! worker's own data source session; they never submit to or wait on the
//! pool, which keeps a saturated pool from deadlocking on itself.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::client::DataSource;
use crate::error::{CheckError, Result};
use crate::execution::{TaskFuture, WorkerPool};
use crate::logging::log_wave_operation;
use crate::models::{ResourceAggregate, ResourceKey};

/// Pool whose workers each own one data source session
pub type DataSourcePool = WorkerPool<Box<dyn DataSource>>;

/// One measured resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedResource {
    pub key: ResourceKey,
    pub aggregate: ResourceAggregate,
}

/// Drives both waves against a started pool
pub struct StatsCollector<'a> {
    pool: &'a DataSourcePool,
    deadline: Option<Duration>,
}

impl<'a> StatsCollector<'a> {
    pub fn new(pool: &'a DataSourcePool) -> Self {
        Self {
            pool,
            deadline: None,
        }
    }

    /// Bound the total wait of each wave; the clock restarts at the barrier
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Discover and measure every resource.
    ///
    /// `primary` is the orchestrating thread's own session, used only to list
    /// containers. The first failed task aborts collection with its error.
    /// Results keep discovery order.
    pub fn collect(&self, primary: &mut dyn DataSource) -> Result<Vec<CollectedResource>> {
        let containers = primary.list_containers()?;
        let keys = self.discover(containers)?;
        self.measure(keys)
    }

    /// Wave 1: list resources of every container in parallel
    pub fn discover(&self, containers: Vec<String>) -> Result<Vec<ResourceKey>> {
        let started = Instant::now();
        let container_count = containers.len();

        let futures: Vec<TaskFuture<Vec<ResourceKey>>> = containers
            .into_iter()
            .map(|container| {
                self.pool.submit(move |source: &mut Box<dyn DataSource>| {
                    let resources = source.list_resources(&container)?;
                    Ok(resources
                        .into_iter()
                        .map(|resource| ResourceKey::new(container.clone(), resource))
                        .collect())
                })
            })
            .collect();

        let wave_deadline = self.wave_deadline(started);
        let mut keys = Vec::new();
        for future in &futures {
            keys.extend(self.resolve(future, wave_deadline)?);
        }

        log_wave_operation(
            "discover",
            container_count,
            keys.len(),
            started.elapsed(),
        );
        Ok(keys)
    }

    /// Wave 2: measure every resource in parallel
    pub fn measure(&self, keys: Vec<ResourceKey>) -> Result<Vec<CollectedResource>> {
        let started = Instant::now();
        let task_count = keys.len();

        let futures: Vec<(ResourceKey, TaskFuture<ResourceAggregate>)> = keys
            .into_iter()
            .map(|key| {
                let task_key = key.clone();
                let future = self
                    .pool
                    .submit(move |source: &mut Box<dyn DataSource>| {
                        measure_resource(source.as_mut(), &task_key)
                    });
                (key, future)
            })
            .collect();

        let wave_deadline = self.wave_deadline(started);
        let mut collected = Vec::with_capacity(futures.len());
        for (key, future) in futures {
            let aggregate = self.resolve(&future, wave_deadline)?;
            collected.push(CollectedResource { key, aggregate });
        }

        log_wave_operation("measure", task_count, collected.len(), started.elapsed());
        info!(
            resources = collected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Measured all resources"
        );
        Ok(collected)
    }

    /// `None` when no deadline is set or it lies past the end of the clock
    fn wave_deadline(&self, started: Instant) -> Option<Instant> {
        self.deadline.and_then(|deadline| started.checked_add(deadline))
    }

    fn resolve<T: Clone>(&self, future: &TaskFuture<T>, wave_deadline: Option<Instant>) -> Result<T> {
        let (Some(deadline), Some(wave_deadline)) = (self.deadline, wave_deadline) else {
            return future.get();
        };
        let remaining = wave_deadline.saturating_duration_since(Instant::now());
        future.get_timeout(remaining).map_err(|error| match error {
            CheckError::Timeout { .. } => {
                CheckError::timeout("collection wave", deadline.as_secs_f64())
            }
            other => other,
        })
    }
}

/// Measure one resource and all of its sub-structures on a single session
pub fn measure_resource(source: &mut dyn DataSource, key: &ResourceKey) -> Result<ResourceAggregate> {
    let own = source.measure_namespace(&key.container, &key.resource)?;

    let mut children = BTreeMap::new();
    for sub_structure in source.list_sub_structures(&key.container, &key.resource)? {
        let namespace = key.sub_structure_namespace(&sub_structure);
        let stats = source.measure_namespace(&key.container, &namespace)?;
        children.insert(sub_structure, stats);
    }

    let partitioned = source.is_partitioned(&key.container, &key.resource)?;

    debug!(
        resource = %key,
        data_size = own.data_size,
        sub_structures = children.len(),
        partitioned,
        "Measured resource"
    );

    Ok(ResourceAggregate::new(own, children, partitioned))
}
