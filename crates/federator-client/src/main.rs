mod config;
mod jobs;
mod paths;
mod runtime;
mod sink;

use std::sync::Arc;

use envconfig::Envconfig;
use federator_common::config_model::{ConsumerConfig, ScheduleType};
use federator_common::{ids::ManagementNodeId, DynamicConfigJobParams, JobBase, JobParams};
use federator_config::{CachedConfigService, CircuitBreaker, ManagementNodeFetcher};
use federator_lifecycle::Lifecycle;
use federator_offset_store::{Cipher, InMemoryOffsetStore, OffsetStore, RedisOffsetStore};
use federator_scheduler::FederatorScheduler;
use federator_token_service::IdpTokenService;

use crate::config::Config;
use crate::runtime::{ClientJobRunner, ClientRuntime};
use crate::sink::{EventSink, KafkaSink, LogSink};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().expect("failed to load configuration from env");
    let recorder = federator_lifecycle::metrics::install_recorder();
    let lifecycle = Lifecycle::new("federator-client");

    let management_node_id = ManagementNodeId::from(Some(config.management_node_id.clone()));

    let token_service: Arc<dyn federator_token_service::TokenService> = Arc::new(IdpTokenService::new(
        config.idp_token_url.clone(),
        config.idp_jwks_url.clone(),
        config.idp_client_id.as_str(),
        config.idp_client_secret.clone(),
        config.idp_audience.clone(),
        None,
        config.request_timeout.0,
    ));

    let circuit_breaker = Arc::new(CircuitBreaker::new(
        config.management_node_base_url.clone(),
        (&config.management_node_cb).into(),
    ));
    let fetcher = ManagementNodeFetcher::<ConsumerConfig>::new(
        config.management_node_base_url.clone(),
        token_service.clone(),
        circuit_breaker,
        config.request_timeout.0,
    );
    let consumer_config_service = Arc::new(CachedConfigService::new(
        fetcher,
        "/api/v1/consumer-config",
        federator_common::RetryPolicy::default(),
    ));

    let offset_store: Arc<dyn OffsetStore> = match config.offset_store_provider.as_str() {
        "redis" => {
            let cipher = config
                .redis_aes_key
                .as_ref()
                .map(|key| Cipher::new(key.as_bytes()))
                .transpose()
                .expect("invalid REDIS_AES_KEY");
            Arc::new(
                RedisOffsetStore::new(&config.redis_url, cipher)
                    .expect("failed to build redis offset store"),
            )
        }
        _ => Arc::new(InMemoryOffsetStore::new()),
    };
    offset_store.ping().await.expect("offset store is unreachable at startup");

    let sink: Arc<dyn EventSink> = match config.event_sink.as_str() {
        "kafka" => {
            let brokers = config
                .kafka_bootstrap_servers
                .clone()
                .expect("KAFKA_BOOTSTRAP_SERVERS must be set when EVENT_SINK=kafka");
            let topic = config
                .kafka_topic
                .clone()
                .expect("KAFKA_TOPIC must be set when EVENT_SINK=kafka");
            Arc::new(KafkaSink::new(topic, brokers).expect("failed to build kafka sink"))
        }
        _ => Arc::new(LogSink),
    };

    let client_runtime = Arc::new(ClientRuntime {
        consumer_config_service,
        token_service,
        offset_store,
        sink,
        files_root: std::path::PathBuf::from(&config.files_root),
    });

    let runner = ClientJobRunner::new(client_runtime);
    let scheduler = Arc::new(
        FederatorScheduler::new(runner.clone())
            .await
            .expect("failed to start job scheduler"),
    );
    runner.attach_scheduler(scheduler.clone());

    let bootstrap_job = JobParams::DynamicConfig(DynamicConfigJobParams {
        base: JobBase {
            job_id: "dynamic-config".to_string(),
            job_name: "dynamic-config".to_string(),
            schedule_type: ScheduleType::Interval,
            schedule_expression: config.config_poll_interval.clone(),
            amount_of_retries: 3,
            management_node_id,
            require_immediate_trigger: true,
        },
    });
    scheduler
        .register_job(bootstrap_job)
        .await
        .expect("failed to register bootstrap dynamic-config job");

    let readiness = lifecycle.readiness.register("scheduler", time::Duration::seconds(120)).await;
    readiness.report_healthy().await;

    lifecycle.shutdown.register(0, "readiness", async move {
        readiness.report_unhealthy().await;
    });

    lifecycle.spawn_signal_handler();

    let app = lifecycle
        .probe_router()
        .merge(federator_lifecycle::metrics::metrics_router(recorder));

    let bind = config.bind();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));
    tracing::info!(%bind, "federator-client listening");

    let shutdown_token = lifecycle.shutdown.cancellation_token();
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "http server exited with error");
            }
        }
        _ = shutdown_token.cancelled() => {
            tracing::info!("shutdown requested, stopping http server");
        }
    }
}
