mod auth;
mod config;
mod file_service;
mod filter;
mod topic_service;

use std::sync::Arc;

use envconfig::Envconfig;
use federator_common::config_model::ProducerConfig;
use federator_common::ids::ManagementNodeId;
use federator_config::{CachedConfigService, CircuitBreaker, ManagementNodeFetcher};
use federator_lifecycle::Lifecycle;
use federator_proto::file_exchange_server::FileExchangeServer;
use federator_proto::topic_stream_server::TopicStreamServer;
use federator_token_service::IdpTokenService;

use crate::config::Config;
use crate::file_service::FileExchangeService;
use crate::topic_service::TopicStreamService;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().expect("failed to load configuration from env");
    let recorder = federator_lifecycle::metrics::install_recorder();
    let lifecycle = Lifecycle::new("federator-server");

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
    let fetcher = ManagementNodeFetcher::<ProducerConfig>::new(
        config.management_node_base_url.clone(),
        token_service.clone(),
        circuit_breaker,
        config.request_timeout.0,
    );
    let producer_config_service = Arc::new(CachedConfigService::new(
        fetcher,
        "/api/v1/producer-config",
        federator_common::RetryPolicy::default(),
    ));

    let topic_service = TopicStreamService {
        producer_config_service: producer_config_service.clone(),
        token_service: token_service.clone(),
        management_node_id: management_node_id.clone(),
        kafka_brokers: config.kafka_bootstrap_servers.clone(),
    };
    let file_service = FileExchangeService {
        producer_config_service,
        token_service,
        management_node_id,
    };

    let readiness = lifecycle.readiness.register("grpc", time::Duration::seconds(120)).await;
    readiness.report_healthy().await;
    lifecycle.shutdown.register(0, "readiness", async move {
        readiness.report_unhealthy().await;
    });
    lifecycle.spawn_signal_handler();
    let shutdown_token = lifecycle.shutdown.cancellation_token();

    let grpc_bind = config.grpc_bind().parse().expect("invalid grpc bind address");
    let grpc_shutdown_token = shutdown_token.clone();
    let grpc_server = tonic::transport::Server::builder()
        .add_service(TopicStreamServer::new(topic_service))
        .add_service(FileExchangeServer::new(file_service))
        .serve_with_shutdown(grpc_bind, async move {
            grpc_shutdown_token.cancelled().await;
        });
    tracing::info!(bind = %grpc_bind, "federator-server grpc listening");

    let http_app = lifecycle
        .probe_router()
        .merge(federator_lifecycle::metrics::metrics_router(recorder));
    let http_bind = config.bind();
    let listener = tokio::net::TcpListener::bind(&http_bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {http_bind}: {e}"));
    tracing::info!(bind = %http_bind, "federator-server http listening");

    tokio::select! {
        result = grpc_server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "grpc server exited with error");
            }
        }
        result = axum::serve(listener, http_app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "http server exited with error");
            }
        }
        _ = shutdown_token.cancelled() => {
            tracing::info!("shutdown requested, stopping servers");
        }
    }
}
