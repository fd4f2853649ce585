//! The shared state every job tick reads from: the config service, token service,
//! offset store and event sink. `ClientJobRunner` is the seam `federator-scheduler`
//! dispatches into; it only knows how to route a tick to the right job module.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use federator_common::config_model::ConsumerConfig;
use federator_common::JobParams;
use federator_config::ConfigService;
use federator_offset_store::OffsetStore;
use federator_scheduler::{FederatorScheduler, JobRunner};
use federator_token_service::TokenService;
use tokio::sync::OnceCell;

use crate::sink::EventSink;

pub struct ClientRuntime {
    pub consumer_config_service: Arc<dyn ConfigService<ConsumerConfig>>,
    pub token_service: Arc<dyn TokenService>,
    pub offset_store: Arc<dyn OffsetStore>,
    pub sink: Arc<dyn EventSink>,
    /// Root directory every file-exchange job's `destination_path` is resolved and
    /// confined to (§4.7 path validation).
    pub files_root: PathBuf,
}

pub struct ClientJobRunner {
    runtime: Arc<ClientRuntime>,
    scheduler: OnceCell<Arc<FederatorScheduler>>,
}

impl ClientJobRunner {
    pub fn new(runtime: Arc<ClientRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            scheduler: OnceCell::new(),
        })
    }

    /// The scheduler can only be constructed with a `JobRunner` already in hand, so it is
    /// attached here once, right after construction, rather than threaded through the
    /// constructor.
    pub fn attach_scheduler(&self, scheduler: Arc<FederatorScheduler>) {
        let _ = self.scheduler.set(scheduler);
    }
}

#[async_trait]
impl JobRunner for ClientJobRunner {
    async fn run_tick(&self, params: JobParams) {
        let job_id = params.job_id().to_string();
        let start = std::time::Instant::now();

        let result = match &params {
            JobParams::DynamicConfig(p) => {
                crate::jobs::dynamic_config::run(&self.runtime, self.scheduler.get().cloned(), p).await
            }
            JobParams::Topic(p) => crate::jobs::topic_stream::run(&self.runtime, p).await,
            JobParams::File(p) => crate::jobs::file_exchange::run(&self.runtime, p).await,
        };

        metrics::histogram!("job_tick_duration_seconds", "job_id" => job_id.clone())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                metrics::counter!("jobs_total", "job_id" => job_id, "result" => "ok").increment(1);
            }
            Err(err) => {
                tracing::error!(job_id, error = %err, "job tick failed");
                metrics::counter!("jobs_total", "job_id" => job_id, "result" => "error").increment(1);
            }
        }
    }
}
