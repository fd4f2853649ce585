//! Health reporting for the loops a process runs (job ticks, stream pumps, the gRPC
//! server). The overall status is the AND of every registered component: unhealthy if
//! any component is unhealthy or has gone stale past its deadline.
//!
//! Liveness and readiness are kept as separate registries by callers (one
//! [`HealthRegistry`] each) rather than folded into one status, since the two checks
//! answer different questions ("should k8s restart me" vs "should the LB send traffic").

use std::collections::HashMap;
use std::ops::Add;
use std::sync::{Arc, RwLock};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Default, Debug)]
pub struct HealthStatus {
    pub healthy: bool,
    pub components: HashMap<String, ComponentStatus>,
}

impl IntoResponse for HealthStatus {
    fn into_response(self) -> Response {
        let body = format!("{:?}", self);
        match self.healthy {
            true => (StatusCode::OK, body),
            false => (StatusCode::SERVICE_UNAVAILABLE, body),
        }
        .into_response()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ComponentStatus {
    Starting,
    HealthyUntil(time::OffsetDateTime),
    Unhealthy,
    Stalled,
}

struct HealthMessage {
    component: String,
    status: ComponentStatus,
}

pub struct HealthHandle {
    component: String,
    deadline: Duration,
    sender: mpsc::Sender<HealthMessage>,
}

impl HealthHandle {
    pub async fn report_healthy(&self) {
        self.report_status(ComponentStatus::HealthyUntil(
            time::OffsetDateTime::now_utc().add(self.deadline),
        ))
        .await
    }

    pub async fn report_status(&self, status: ComponentStatus) {
        let message = HealthMessage {
            component: self.component.clone(),
            status,
        };
        if let Err(err) = self.sender.send(message).await {
            warn!("failed to report health status for {}: {err}", self.component);
        }
    }

    pub async fn report_unhealthy(&self) {
        self.report_status(ComponentStatus::Unhealthy).await
    }
}

#[derive(Clone)]
pub struct HealthRegistry {
    name: String,
    components: Arc<RwLock<HashMap<String, ComponentStatus>>>,
    sender: mpsc::Sender<HealthMessage>,
}

impl HealthRegistry {
    pub fn new(name: &str) -> Self {
        let (tx, mut rx) = mpsc::channel::<HealthMessage>(32);
        let registry = Self {
            name: name.to_owned(),
            components: Default::default(),
            sender: tx,
        };

        let components = registry.components.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match components.write() {
                    Ok(mut map) => {
                        map.insert(message.component, message.status);
                    }
                    Err(_) => warn!("poisoned health registry mutex"),
                }
            }
        });

        registry
    }

    pub async fn register(&self, component: impl Into<String>, deadline: Duration) -> HealthHandle {
        let handle = HealthHandle {
            component: component.into(),
            deadline,
            sender: self.sender.clone(),
        };
        handle.report_status(ComponentStatus::Starting).await;
        handle
    }

    pub fn get_status(&self) -> HealthStatus {
        let components = self
            .components
            .read()
            .expect("poisoned health registry mutex");
        let now = time::OffsetDateTime::now_utc();

        let result = components
            .iter()
            .fold(
                HealthStatus {
                    healthy: !components.is_empty(),
                    components: Default::default(),
                },
                |mut acc, (name, status)| {
                    match status {
                        ComponentStatus::HealthyUntil(until) if *until > now => {
                            acc.components.insert(name.clone(), status.clone());
                        }
                        ComponentStatus::HealthyUntil(_) => {
                            acc.healthy = false;
                            acc.components.insert(name.clone(), ComponentStatus::Stalled);
                        }
                        _ => {
                            acc.healthy = false;
                            acc.components.insert(name.clone(), status.clone());
                        }
                    }
                    acc
                },
            );
        if !result.healthy {
            warn!("{} health check failed: {:?}", self.name, result.components);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_until<F: Fn() -> bool>(check: F) {
        let deadline = time::OffsetDateTime::now_utc().add(Duration::seconds(5));
        while !check() && time::OffsetDateTime::now_utc() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(check());
    }

    #[tokio::test]
    async fn unregistered_is_unhealthy() {
        let registry = HealthRegistry::new("readiness");
        assert!(!registry.get_status().healthy);
    }

    #[tokio::test]
    async fn goes_healthy_then_unhealthy() {
        let registry = HealthRegistry::new("readiness");
        let handle = registry.register("topic-job", Duration::seconds(30)).await;
        wait_until(|| registry.get_status().components.len() == 1).await;
        assert!(!registry.get_status().healthy);

        handle.report_healthy().await;
        wait_until(|| registry.get_status().healthy).await;

        handle.report_unhealthy().await;
        wait_until(|| !registry.get_status().healthy).await;
    }

    #[tokio::test]
    async fn stale_report_is_stalled() {
        let registry = HealthRegistry::new("readiness");
        let handle = registry.register("file-job", Duration::seconds(30)).await;
        handle
            .report_status(ComponentStatus::HealthyUntil(
                time::OffsetDateTime::now_utc() - Duration::seconds(1),
            ))
            .await;
        wait_until(|| !registry.get_status().healthy).await;
        assert_eq!(
            registry.get_status().components.get("file-job"),
            Some(&ComponentStatus::Stalled)
        );
    }
}
