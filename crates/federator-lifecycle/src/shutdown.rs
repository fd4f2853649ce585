//! Ordered shutdown. Every long-running component (the scheduler, the gRPC server, the
//! offset store's flush loop) registers a shutdown task with an `order`; when shutdown is
//! triggered, tasks run strictly in ascending order, one at a time, so e.g. the scheduler
//! can stop dispatching new ticks before the offset store it depends on is closed.
//!
//! This is deliberately simpler than a supervised-component manager: there is no
//! liveness tracking or automatic restart here, just "run these in this order when asked."

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

type BoxedShutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Entry {
    order: i32,
    name: String,
    task: BoxedShutdown,
}

/// Coordinates the shutdown sequence for one process. Cheap to clone; the task list and
/// cancellation token are shared.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: std::sync::Arc<Mutex<Vec<Entry>>>,
    started: std::sync::Arc<AtomicBool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Default::default(),
            started: Default::default(),
        }
    }

    /// A token that resolves once shutdown has been triggered. Pass clones to any task
    /// that needs to notice shutdown without waiting for its turn in the ordered sequence.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Register a shutdown task. Lower `order` values run first. Registering after
    /// [`Self::run_shutdown`] has started has no effect; the set of tasks is frozen at
    /// that point.
    pub fn register(
        &self,
        order: i32,
        name: impl Into<String>,
        task: impl Future<Output = ()> + Send + 'static,
    ) {
        if self.started.load(Ordering::SeqCst) {
            tracing::warn!("shutdown already started, ignoring late registration");
            return;
        }
        let mut tasks = self.tasks.lock().expect("poisoned shutdown task list");
        tasks.push(Entry {
            order,
            name: name.into(),
            task: Box::pin(task),
        });
    }

    /// Cancel the shared token, waking anything waiting on it, without running the
    /// ordered task list. Safe to call multiple times.
    pub fn signal(&self) {
        self.token.cancel();
    }

    /// Cancel the token and then run every registered task in ascending `order`,
    /// sequentially. Idempotent: a second call returns immediately.
    pub async fn run_shutdown(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.token.cancel();

        let mut tasks = {
            let mut guard = self.tasks.lock().expect("poisoned shutdown task list");
            std::mem::take(&mut *guard)
        };
        tasks.sort_by_key(|entry| entry.order);

        for entry in tasks {
            tracing::info!(task = %entry.name, order = entry.order, "running shutdown task");
            entry.task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_tasks_in_ascending_order() {
        let coordinator = ShutdownCoordinator::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (i, name) in [(10, "last"), (0, "first"), (5, "middle")] {
            let order = order.clone();
            let name = name.to_string();
            coordinator.register(i, name.clone(), async move {
                order.lock().unwrap().push(name);
            });
        }

        coordinator.run_shutdown().await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "middle", "last"]);
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let coordinator = ShutdownCoordinator::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        coordinator.register(0, "counted", async move {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        coordinator.run_shutdown().await;
        coordinator.run_shutdown().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn late_registration_is_ignored() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.run_shutdown().await;
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        coordinator.register(0, "late", async move {
            ran_clone.store(true, Ordering::SeqCst);
        });
        assert!(!ran.load(Ordering::SeqCst));
    }
}
