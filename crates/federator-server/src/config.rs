//! Environment configuration for the federator server process (§6 external interfaces).

use envconfig::Envconfig;
use federator_common::{EnvMsDuration, NonEmptyString};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "GRPC_BIND_HOST", default = "0.0.0.0")]
    pub grpc_host: String,

    #[envconfig(from = "GRPC_BIND_PORT", default = "9090")]
    pub grpc_port: u16,

    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8080")]
    pub port: u16,

    #[envconfig(from = "MANAGEMENT_NODE_BASE_URL")]
    pub management_node_base_url: String,

    #[envconfig(from = "MANAGEMENT_NODE_ID", default = "default")]
    pub management_node_id: String,

    #[envconfig(from = "IDP_TOKEN_URL")]
    pub idp_token_url: String,

    #[envconfig(from = "IDP_JWKS_URL")]
    pub idp_jwks_url: String,

    #[envconfig(from = "IDP_CLIENT_ID")]
    pub idp_client_id: NonEmptyString,

    #[envconfig(from = "IDP_CLIENT_SECRET")]
    pub idp_client_secret: String,

    #[envconfig(from = "IDP_AUDIENCE")]
    pub idp_audience: Option<String>,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "5000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "KAFKA_BOOTSTRAP_SERVERS")]
    pub kafka_bootstrap_servers: String,

    #[envconfig(nested = true)]
    pub management_node_cb: CircuitBreakerEnvConfig,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn grpc_bind(&self) -> String {
        format!("{}:{}", self.grpc_host, self.grpc_port)
    }
}

#[derive(Envconfig, Clone)]
pub struct CircuitBreakerEnvConfig {
    #[envconfig(from = "MANAGEMENT_NODE_CB_FAILURE_RATE", default = "0.5")]
    pub failure_rate_threshold: f64,

    #[envconfig(from = "MANAGEMENT_NODE_CB_MIN_CALLS", default = "5")]
    pub minimum_calls: u32,

    #[envconfig(from = "MANAGEMENT_NODE_CB_WINDOW", default = "20")]
    pub window_size: u32,

    #[envconfig(from = "MANAGEMENT_NODE_CB_OPEN_MS", default = "30000")]
    pub open_duration: EnvMsDuration,
}

impl From<&CircuitBreakerEnvConfig> for federator_config::CircuitBreakerConfig {
    fn from(cfg: &CircuitBreakerEnvConfig) -> Self {
        federator_config::CircuitBreakerConfig {
            failure_rate_threshold: cfg.failure_rate_threshold,
            minimum_calls: cfg.minimum_calls,
            window_size: cfg.window_size,
            open_duration: cfg.open_duration.0,
        }
    }
}
