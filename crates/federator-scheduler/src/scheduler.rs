//! Wraps `tokio_cron_scheduler::JobScheduler` with the federator's job bookkeeping:
//! per-job state (`New` → `Started` → `Stopped`), the reconcile-driven add/remove API,
//! and dispatch into a caller-supplied [`JobRunner`] so this crate stays agnostic to
//! what a tick actually does (topic streaming, file exchange, dynamic-config refresh are
//! all implemented one layer up).

use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Europe::London;
use federator_common::config_model::ScheduleType;
use federator_common::ids::ManagementNodeId;
use federator_common::{FederatorError, JobParams};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::iso;
use crate::reconcile::{self, ReconcilePlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    New,
    Started,
    Stopped,
}

struct PresentJob {
    params: JobParams,
    scheduler_uuid: Uuid,
    state: JobState,
}

/// Runs one tick of a job. Implemented by the client binary for each of its job kinds;
/// this trait is the only seam between the scheduling machinery and the job bodies.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_tick(&self, params: JobParams);
}

pub struct FederatorScheduler {
    inner: JobScheduler,
    present: Arc<Mutex<HashMap<String, PresentJob>>>,
    runner: Arc<dyn JobRunner>,
}

impl FederatorScheduler {
    pub async fn new(runner: Arc<dyn JobRunner>) -> Result<Self, FederatorError> {
        let inner = JobScheduler::new()
            .await
            .map_err(|e| FederatorError::Configuration(format!("failed to start scheduler: {e}")))?;
        inner
            .start()
            .await
            .map_err(|e| FederatorError::Configuration(format!("failed to start scheduler: {e}")))?;

        Ok(Self {
            inner,
            present: Default::default(),
            runner,
        })
    }

    /// Registers one job with the underlying cron scheduler and marks it `Started`.
    /// `require_immediate_trigger` additionally fires one tick right away, before the
    /// first scheduled occurrence, for jobs the management plane flags as urgent.
    pub async fn register_job(&self, params: JobParams) -> Result<(), FederatorError> {
        let job_id = params.job_id().to_string();
        let base = params.base().clone();
        let runner = self.runner.clone();
        let tick_params = params.clone();

        let job = match base.schedule_type {
            ScheduleType::Cron => {
                let run_params = tick_params.clone();
                Job::new_async_tz(base.schedule_expression.as_str(), London, move |_uuid, _l| {
                    let runner = runner.clone();
                    let params = run_params.clone();
                    Box::pin(async move { runner.run_tick(params).await })
                })
                .map_err(|e| {
                    FederatorError::Configuration(format!(
                        "invalid cron expression '{}' for job {job_id}: {e}",
                        base.schedule_expression
                    ))
                })?
            }
            ScheduleType::Interval => {
                let interval = iso::parse_interval(&base.schedule_expression)?;
                let run_params = tick_params.clone();
                Job::new_repeated_async(interval, move |_uuid, _l| {
                    let runner = runner.clone();
                    let params = run_params.clone();
                    Box::pin(async move { runner.run_tick(params).await })
                })
                .map_err(|e| {
                    FederatorError::Configuration(format!(
                        "invalid interval '{}' for job {job_id}: {e}",
                        base.schedule_expression
                    ))
                })?
            }
        };

        let scheduler_uuid = self
            .inner
            .add(job)
            .await
            .map_err(|e| FederatorError::Configuration(format!("failed to register job {job_id}: {e}")))?;

        if base.require_immediate_trigger {
            let runner = self.runner.clone();
            let params = tick_params.clone();
            tokio::spawn(async move { runner.run_tick(params).await });
        }

        self.present.lock().await.insert(
            job_id,
            PresentJob {
                params: tick_params,
                scheduler_uuid,
                state: JobState::Started,
            },
        );
        Ok(())
    }

    pub async fn remove_recurring_job(&self, job_id: &str) -> Result<(), FederatorError> {
        let removed = self.present.lock().await.remove(job_id);
        if let Some(present) = removed {
            self.inner.remove(&present.scheduler_uuid).await.map_err(|e| {
                FederatorError::Configuration(format!("failed to remove job {job_id}: {e}"))
            })?;
            tracing::info!(job_id, "removed recurring job");
        }
        Ok(())
    }

    /// Diffs `desired` against the currently registered jobs belonging to
    /// `management_node_id` and applies the plan: removals first, then additions, so a
    /// changed job's old registration is always gone before its replacement is added.
    /// Jobs belonging to other management nodes (or the node's own bootstrap jobs, which
    /// callers keep out of `desired`) are left untouched.
    pub async fn reload_recurrent_jobs(
        &self,
        management_node_id: &ManagementNodeId,
        desired: Vec<JobParams>,
    ) -> Result<(), FederatorError> {
        let snapshot: HashMap<String, JobParams> = {
            let present = self.present.lock().await;
            present
                .iter()
                .map(|(id, job)| (id.clone(), job.params.clone()))
                .collect()
        };

        let ReconcilePlan { to_remove, to_add } = reconcile::plan(management_node_id, &desired, &snapshot);

        for job_id in to_remove {
            self.remove_recurring_job(&job_id).await?;
        }
        for params in to_add {
            self.register_job(params).await?;
        }
        Ok(())
    }

    pub async fn job_state(&self, job_id: &str) -> Option<JobState> {
        self.present.lock().await.get(job_id).map(|j| j.state)
    }

    pub async fn shutdown(&mut self) -> Result<(), FederatorError> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| FederatorError::Configuration(format!("scheduler shutdown failed: {e}")))
    }
}
