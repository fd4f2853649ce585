//! The side-channel axum router every federator binary exposes alongside its primary
//! protocol (HTTP for the client, gRPC for the server): liveness and readiness probes.

use axum::routing::get;
use axum::Router;

use crate::health::HealthRegistry;

/// Liveness answers "is the process stuck" (restart if not); readiness answers "can the
/// process currently do useful work" (pull from the load balancer if not). Kept on two
/// separate registries since a process can be alive but not ready, e.g. still waiting on
/// its first successful management-plane fetch.
pub fn probe_router(liveness: HealthRegistry, readiness: HealthRegistry) -> Router {
    Router::new()
        .route(
            "/_liveness",
            get(move || {
                let liveness = liveness.clone();
                async move { liveness.get_status() }
            }),
        )
        .route(
            "/_readiness",
            get(move || {
                let readiness = readiness.clone();
                async move { readiness.get_status() }
            }),
        )
}
