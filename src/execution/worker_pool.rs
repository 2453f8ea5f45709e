//! Fixed-size worker pool for blocking measurement calls
//!
//! Workers are long-lived OS threads sharing one unbounded FIFO queue. Each
//! worker runs the pool's init hook once, in its own thread, to build a private
//! context (typically a data source client) that it alone uses for every task
//! it claims. Task failures and panics are captured into the task's future;
//! they never take a worker down.

use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::future::TaskFuture;
use crate::error::{CheckError, Result};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// (pool id, worker id) of the pool worker running on this thread
    static CURRENT_WORKER: Cell<Option<(u64, usize)>> = const { Cell::new(None) };
}

/// Pool and worker id when called from inside a pool worker
pub(crate) fn current_worker() -> Option<(u64, usize)> {
    CURRENT_WORKER.with(Cell::get)
}

type InitHook<C> = Arc<dyn Fn() -> Result<C> + Send + Sync>;

/// A queued task. It receives the worker's context, or the error that
/// prevented the context from being built.
type Job<C> = Box<dyn FnOnce(std::result::Result<&mut C, &CheckError>) + Send>;

/// Counters shared by every worker of a pool
#[derive(Debug, Default)]
pub struct PoolStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

impl PoolStats {
    fn record_outcome<T>(&self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(CheckError::TaskPanicked(_)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.panicked.fetch_add(1, Ordering::Relaxed)
            }
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PoolStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    /// Includes panicked tasks
    pub failed: u64,
    pub panicked: u64,
}

impl PoolStatsSnapshot {
    /// Tasks submitted but not yet settled
    pub fn outstanding(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}

struct WorkerHandle {
    id: usize,
    handle: JoinHandle<()>,
}

/// Fixed-size pool of worker threads, each owning a context of type `C`.
///
/// # Examples
///
/// ```rust
/// use namespace_check::execution::WorkerPool;
///
/// let mut pool = WorkerPool::with_init_hook(|| Ok(String::from("client")));
/// pool.start(2).unwrap();
///
/// let future = pool.submit(|client: &mut String| Ok(client.len()));
/// assert_eq!(future.get(), Ok(6));
///
/// pool.shutdown();
/// ```
pub struct WorkerPool<C: 'static> {
    id: u64,
    sender: Option<Sender<Job<C>>>,
    receiver: Receiver<Job<C>>,
    init_hook: InitHook<C>,
    workers: Vec<WorkerHandle>,
    stats: Arc<PoolStats>,
}

impl<C: Default + 'static> WorkerPool<C> {
    /// Pool whose workers start from `C::default()`
    pub fn new() -> Self {
        Self::with_init_hook(|| Ok(C::default()))
    }
}

impl<C: Default + 'static> Default for WorkerPool<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> WorkerPool<C> {
    /// Pool whose workers each build their context with `init_hook`.
    ///
    /// The hook runs once per worker, on that worker's thread, before the
    /// worker claims its first task. Hooks of different workers run in no
    /// particular order and must not depend on each other.
    pub fn with_init_hook<F>(init_hook: F) -> Self
    where
        F: Fn() -> Result<C> + Send + Sync + 'static,
    {
        let (sender, receiver) = channel::unbounded();
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            sender: Some(sender),
            receiver,
            init_hook: Arc::new(init_hook),
            workers: Vec::new(),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Spawn `count` workers. A pool is started once and never resized.
    pub fn start(&mut self, count: usize) -> Result<()> {
        if !self.workers.is_empty() {
            return Err(CheckError::Pool(format!(
                "pool already started with {} workers",
                self.workers.len()
            )));
        }
        if count == 0 {
            return Err(CheckError::Pool(
                "worker count must be at least 1".to_string(),
            ));
        }

        for id in 0..count {
            let pool_id = self.id;
            let receiver = self.receiver.clone();
            let init_hook = Arc::clone(&self.init_hook);

            let handle = thread::Builder::new()
                .name(format!("nscheck-worker-{id}"))
                .spawn(move || worker_loop(pool_id, id, init_hook, receiver))
                .map_err(|e| CheckError::Pool(format!("failed to spawn worker {id}: {e}")))?;

            self.workers.push(WorkerHandle { id, handle });
        }

        info!(pool_id = self.id, workers = count, "Worker pool started");
        Ok(())
    }

    /// Queue `work` and return immediately with a future for its result.
    ///
    /// Work queued before [`start`](Self::start) waits until workers exist.
    /// Task bodies must not wait on futures of this same pool; doing so is
    /// rejected with [`CheckError::SelfBlocking`].
    pub fn submit<T, F>(&self, work: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T> + Send + 'static,
    {
        let (future, completer) = TaskFuture::pending(self.id);
        let stats = Arc::clone(&self.stats);

        let job: Job<C> = Box::new(move |context: std::result::Result<&mut C, &CheckError>| {
            completer.mark_running();

            let outcome = match context {
                // The context is reused after a panic; clients must tolerate
                // an interrupted call.
                Ok(context) => panic::catch_unwind(AssertUnwindSafe(|| work(context)))
                    .unwrap_or_else(|payload| {
                        Err(CheckError::TaskPanicked(panic_message(payload.as_ref())))
                    }),
                Err(init_error) => Err(init_error.clone()),
            };

            stats.record_outcome(&outcome);
            completer.complete(outcome);
        });

        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                // Unreachable while the pool holds its own receiver; the
                // dropped job fails the future with PoolShutDown.
                warn!(pool_id = self.id, "Task queue closed, task discarded");
            }
        }

        future
    }

    /// Number of running workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_started(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Tasks waiting in the queue
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the queue, let workers drain the tasks already queued, and join
    /// them.
    pub fn shutdown(mut self) {
        self.close_and_join();
    }

    /// Abandon the pool without waiting for workers.
    ///
    /// For use after a failure or an expired deadline: a worker may be stuck
    /// in a remote call, and joining it would hang the caller. Tasks still in
    /// the queue are discarded and their futures fail with
    /// [`CheckError::PoolShutDown`]; only tasks already running finish.
    pub fn detach(mut self) {
        self.sender.take();

        let mut discarded = 0usize;
        while let Ok(job) = self.receiver.try_recv() {
            drop(job);
            discarded += 1;
        }

        let detached = std::mem::take(&mut self.workers).len();
        debug!(
            pool_id = self.id,
            workers = detached,
            discarded,
            "Worker pool detached"
        );
    }

    fn close_and_join(&mut self) {
        if self.sender.take().is_none() && self.workers.is_empty() {
            return;
        }

        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                error!(pool_id = self.id, worker = worker.id, "Worker thread panicked");
            }
        }

        debug!(
            pool_id = self.id,
            stats = ?self.stats.snapshot(),
            "Worker pool shut down"
        );
    }
}

impl<C: 'static> Drop for WorkerPool<C> {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn worker_loop<C>(
    pool_id: u64,
    worker_id: usize,
    init_hook: InitHook<C>,
    receiver: Receiver<Job<C>>,
) {
    CURRENT_WORKER.with(|current| current.set(Some((pool_id, worker_id))));

    let mut context = panic::catch_unwind(AssertUnwindSafe(|| init_hook()))
        .unwrap_or_else(|payload| {
            Err(CheckError::TaskPanicked(format!(
                "init hook: {}",
                panic_message(payload.as_ref())
            )))
        });

    match &context {
        Ok(_) => debug!(pool_id, worker = worker_id, "Worker initialized"),
        // Keep consuming so every queued future settles, failing each task
        // with the init error.
        Err(e) => error!(
            pool_id,
            worker = worker_id,
            error = %e,
            "Worker init hook failed; tasks on this worker will fail"
        ),
    }

    while let Ok(job) = receiver.recv() {
        let job_context = match &mut context {
            Ok(context) => Ok(context),
            Err(e) => Err(&*e),
        };
        job(job_context);
    }

    debug!(pool_id, worker = worker_id, "Worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_start_twice_is_rejected() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(2).unwrap();
        assert!(matches!(pool.start(2), Err(CheckError::Pool(_))));
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        assert!(matches!(pool.start(0), Err(CheckError::Pool(_))));
        assert!(!pool.is_started());
    }

    #[test]
    fn test_init_hook_runs_once_per_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::clone(&calls);

        let mut pool = WorkerPool::with_init_hook(move || {
            Ok(hook_calls.fetch_add(1, Ordering::SeqCst))
        });
        pool.start(3).unwrap();

        let futures: Vec<_> = (0..30)
            .map(|_| pool.submit(|ordinal: &mut usize| Ok(*ordinal)))
            .collect();
        let ordinals: HashSet<usize> = futures.iter().map(|f| f.get().unwrap()).collect();

        pool.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(ordinals.iter().all(|ordinal| *ordinal < 3));
    }

    #[test]
    fn test_context_is_private_to_worker() {
        let mut pool = WorkerPool::with_init_hook(|| Ok(Vec::<u32>::new()));
        pool.start(1).unwrap();

        for n in 0..5 {
            pool.submit(move |seen: &mut Vec<u32>| {
                seen.push(n);
                Ok(())
            });
        }
        let seen = pool.submit(|seen: &mut Vec<u32>| Ok(seen.clone()));

        assert_eq!(seen.get().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_failing_task_does_not_kill_worker() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(1).unwrap();

        let failed = pool.submit(|_: &mut ()| -> Result<u32> {
            Err(CheckError::remote_query("connection reset"))
        });
        let panicked = pool.submit(|_: &mut ()| -> Result<u32> { panic!("boom") });
        let after = pool.submit(|_: &mut ()| Ok(5u32));

        assert_eq!(failed.get(), Err(CheckError::remote_query("connection reset")));
        assert_eq!(panicked.get(), Err(CheckError::TaskPanicked("boom".to_string())));
        assert_eq!(after.get(), Ok(5));

        let stats = pool.stats();
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_init_failure_fails_tasks_instead_of_hanging() {
        let mut pool: WorkerPool<()> =
            WorkerPool::with_init_hook(|| Err(CheckError::remote_query("connection refused")));
        pool.start(2).unwrap();

        let futures: Vec<_> = (0..4).map(|i| pool.submit(move |_: &mut ()| Ok(i))).collect();
        for future in futures {
            assert_eq!(future.get(), Err(CheckError::remote_query("connection refused")));
        }
    }

    #[test]
    fn test_tasks_submitted_before_start_run_after_start() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        let future = pool.submit(|_: &mut ()| Ok("queued"));
        assert_eq!(pool.queued(), 1);

        pool.start(1).unwrap();
        assert_eq!(future.get(), Ok("queued"));
    }

    #[test]
    fn test_unstarted_pool_drop_fails_pending_futures() {
        let pool: WorkerPool<()> = WorkerPool::new();
        let future = pool.submit(|_: &mut ()| Ok(1));
        drop(pool);
        assert_eq!(future.get(), Err(CheckError::PoolShutDown));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(2).unwrap();

        let futures: Vec<_> = (0..10)
            .map(|i| {
                pool.submit(move |_: &mut ()| {
                    thread::sleep(Duration::from_millis(2));
                    Ok(i)
                })
            })
            .collect();
        pool.shutdown();

        for (i, future) in futures.iter().enumerate() {
            assert_eq!(future.get(), Ok(i));
        }
    }

    #[test]
    fn test_detach_discards_queued_tasks() {
        let (started_tx, started_rx) = channel::bounded(1);
        let (release_tx, release_rx) = channel::bounded::<()>(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(1).unwrap();

        let running = pool.submit(move |_: &mut ()| {
            started_tx.send(()).ok();
            release_rx.recv().ok();
            Ok(0usize)
        });
        let queued: Vec<_> = (1..=5)
            .map(|i| {
                let ran = Arc::clone(&ran);
                pool.submit(move |_: &mut ()| {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        started_rx.recv().unwrap();
        pool.detach();
        release_tx.send(()).unwrap();

        assert_eq!(running.get(), Ok(0));
        for future in &queued {
            assert_eq!(future.get(), Err(CheckError::PoolShutDown));
        }
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_cannot_wait_on_its_own_pool() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(1).unwrap();

        let inner = pool.submit(|_: &mut ()| Ok(1u8));
        inner.get().unwrap();

        let nested = pool.submit(move |_: &mut ()| inner.get());
        assert_eq!(nested.get(), Err(CheckError::SelfBlocking { worker: 0 }));
    }

    #[test]
    fn test_worker_may_wait_on_another_pool() {
        let mut outer: WorkerPool<()> = WorkerPool::new();
        let mut inner: WorkerPool<()> = WorkerPool::new();
        outer.start(1).unwrap();
        inner.start(1).unwrap();

        let inner_future = inner.submit(|_: &mut ()| Ok(9u8));
        let outer_future = outer.submit(move |_: &mut ()| inner_future.get());
        assert_eq!(outer_future.get(), Ok(9));
    }

    #[test]
    fn test_concurrency_never_exceeds_pool_size() {
        let mut pool: WorkerPool<()> = WorkerPool::new();
        pool.start(3).unwrap();

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(Mutex::new(0usize));

        let futures: Vec<_> = (0..24)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move |_: &mut ()| {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    {
                        let mut peak = peak.lock().unwrap();
                        *peak = (*peak).max(now);
                    }
                    thread::sleep(Duration::from_millis(3));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        for future in futures {
            future.get().unwrap();
        }
        assert!(*peak.lock().unwrap() <= 3);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(17u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
