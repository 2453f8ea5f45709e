pub mod future;
pub mod worker_pool;

pub use future::{FutureState, TaskFuture};
pub use worker_pool::{PoolStatsSnapshot, WorkerPool};
