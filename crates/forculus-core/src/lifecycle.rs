// ── Lifecycle management for long-running tasks ──
//
// Every subscriber and watcher runs as one tokio task spawned on a shared
// `TaskTracker`. Each task gets its own `CancellationToken`; `stop()`
// cancels them in registration order and then waits for the tracker to
// drain.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// A long-running task the lifecycle manager can start and stop.
pub trait Service: Send + 'static {
    fn name(&self) -> &str;

    /// Run until `stop` is cancelled (or the work is done).
    fn run(self, stop: CancellationToken) -> impl Future<Output = ()> + Send;
}

struct ManagedTask {
    name: String,
    stop: CancellationToken,
}

struct LifecycleInner {
    tracker: TaskTracker,
    tasks: Mutex<Vec<ManagedTask>>,
    /// Cancelled once `stop()` begins.
    shutdown: CancellationToken,
}

/// Owns every started task and performs coordinated shutdown.
///
/// Cheaply cloneable; clones share the same task set.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<LifecycleInner>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                tracker: TaskTracker::new(),
                tasks: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Spawn `service` and track it.
    ///
    /// Starting after shutdown began still spawns the task, but with its
    /// stop token already cancelled, so it exits at its first check.
    pub fn start<S: Service>(&self, service: S) {
        let name = service.name().to_owned();
        let stop = CancellationToken::new();

        {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            if self.inner.shutdown.is_cancelled() {
                warn!(service = %name, "started after shutdown, stopping immediately");
                stop.cancel();
            }
            tasks.push(ManagedTask {
                name: name.clone(),
                stop: stop.clone(),
            });
        }

        debug!(service = %name, "starting");
        self.inner.tracker.spawn(async move {
            service.run(stop).await;
            debug!(service = %name, "exited");
        });
    }

    /// Signal every task to stop, in registration order, then wait for all
    /// of them to finish. Safe to call more than once.
    pub async fn stop(&self) {
        let stops: Vec<(String, CancellationToken)> = {
            let tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            self.inner.shutdown.cancel();
            tasks
                .iter()
                .map(|t| (t.name.clone(), t.stop.clone()))
                .collect()
        };

        for (name, stop) in &stops {
            debug!(service = %name, "signalling stop");
            stop.cancel();
        }

        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!(tasks = stops.len(), "all tasks stopped");
    }

    /// Token cancelled when shutdown begins. Useful for work that runs
    /// before a task is handed to the manager, such as a bootstrap retry.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Number of tasks started so far.
    pub fn task_count(&self) -> usize {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of tasks still running.
    pub fn running(&self) -> usize {
        self.inner.tracker.len()
    }
}
