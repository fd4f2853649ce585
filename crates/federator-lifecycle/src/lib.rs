//! Process lifecycle: health reporting, ordered shutdown, and the signal handling that
//! ties the two together. Every federator binary builds one [`Lifecycle`] and threads its
//! [`ShutdownCoordinator`] and health registries through its components.

pub mod health;
pub mod http;
pub mod metrics;
pub mod shutdown;
pub mod signals;

pub use health::{ComponentStatus, HealthHandle, HealthRegistry, HealthStatus};
pub use shutdown::ShutdownCoordinator;

/// Bundles the two health registries and the shutdown coordinator a process needs, and
/// spawns the task that waits for SIGINT/SIGTERM and triggers the ordered shutdown.
pub struct Lifecycle {
    pub liveness: HealthRegistry,
    pub readiness: HealthRegistry,
    pub shutdown: ShutdownCoordinator,
}

impl Lifecycle {
    pub fn new(process_name: &str) -> Self {
        Self {
            liveness: HealthRegistry::new(&format!("{process_name}-liveness")),
            readiness: HealthRegistry::new(&format!("{process_name}-readiness")),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Spawns a background task that waits for a termination signal and then runs the
    /// ordered shutdown sequence. Returns immediately; callers typically `await` on
    /// `shutdown.cancellation_token().cancelled()` elsewhere to know when to stop serving.
    pub fn spawn_signal_handler(&self) {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_shutdown_signal().await;
            shutdown.run_shutdown().await;
        });
    }

    pub fn probe_router(&self) -> axum::Router {
        http::probe_router(self.liveness.clone(), self.readiness.clone())
    }
}
