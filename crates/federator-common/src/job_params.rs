//! Job parameter types. `JobParams` is the unit the scheduler diffs structurally during
//! reconcile (§4.4); every field that participates in that comparison must be `Eq`.

use crate::config_model::ScheduleType;
use crate::ids::ManagementNodeId;
use crate::naming::{clean_server_name, strip_scheme};

/// A derived value describing how to reach a remote producer server. Lives only for the
/// duration of a reconcile; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub client_name: String,
    pub client_key: String,
    pub server_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub tls: bool,
}

impl ConnectionTarget {
    pub const DEFAULT_PORT: u16 = 50051;
    pub const DEFAULT_TLS: bool = false;

    pub fn new(
        client_name: impl Into<String>,
        client_key: impl Into<String>,
        server_name: &str,
        server_host: &str,
        server_port: Option<u16>,
        tls: Option<bool>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            client_key: client_key.into(),
            server_name: clean_server_name(server_name),
            server_host: strip_scheme(server_host).to_string(),
            server_port: server_port.unwrap_or(Self::DEFAULT_PORT),
            tls: tls.unwrap_or(Self::DEFAULT_TLS),
        }
    }

    pub fn endpoint(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.server_host, self.server_port)
    }
}

/// Fields common to every recurring job, regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBase {
    pub job_id: String,
    pub job_name: String,
    pub schedule_type: ScheduleType,
    pub schedule_expression: String,
    pub amount_of_retries: u32,
    pub management_node_id: ManagementNodeId,
    pub require_immediate_trigger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicJobParams {
    pub base: JobBase,
    pub topic: String,
    pub connection_target: ConnectionTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJobParams {
    pub base: JobBase,
    pub connection_target: ConnectionTarget,
    pub source_path: String,
    pub destination_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicConfigJobParams {
    pub base: JobBase,
}

/// The tagged variant the scheduler catalogues jobs by (§9 "dynamic dispatch over job
/// kinds"). Structural equality over this enum is exactly the `presentParams != desiredParams`
/// comparison the reconcile algorithm uses to decide whether to recreate a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobParams {
    Topic(TopicJobParams),
    File(FileJobParams),
    DynamicConfig(DynamicConfigJobParams),
}

impl JobParams {
    pub fn base(&self) -> &JobBase {
        match self {
            JobParams::Topic(p) => &p.base,
            JobParams::File(p) => &p.base,
            JobParams::DynamicConfig(p) => &p.base,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.base().job_id
    }

    pub fn management_node_id(&self) -> &ManagementNodeId {
        &self.base().management_node_id
    }
}
