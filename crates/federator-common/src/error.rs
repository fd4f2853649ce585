//! The error taxonomy shared across every component (§7) and the gRPC status mapping
//! used both when classifying an inbound stream status (§4.6) and when the server needs
//! to reject a call (§4.8).

use thiserror::Error;

/// How a failure should be handled by the component that observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Safe to retry, subject to the caller's retry budget.
    Retryable,
    /// Never retried; the affected job tick ends and the error is logged.
    Fatal,
    /// An authentication/authorisation failure; one token refresh + retry is permitted
    /// before it is treated as fatal.
    Auth,
}

/// Errors raised by any federator component. Each variant records enough context to log
/// usefully without needing the caller to re-derive it.
#[derive(Error, Debug)]
pub enum FederatorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("token fetch failed for management node {management_node_id}: {source}")]
    TokenFetch {
        management_node_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("token verification failed: {0}")]
    TokenInvalid(String),

    #[error("management plane request failed ({status}): {message}")]
    ManagementPlane { status: u16, message: String },

    #[error("management plane is unreachable: {0}")]
    ManagementPlaneUnreachable(#[source] anyhow::Error),

    #[error("circuit breaker is open for {key}")]
    CircuitOpen { key: String },

    #[error("offset store is unreachable: {0}")]
    OffsetStoreUnreachable(#[source] anyhow::Error),

    #[error("local sink rejected the record: {0}")]
    SinkFailure(#[source] anyhow::Error),

    #[error("job {topic} failed: {source}")]
    Job {
        topic: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("attribute filter is malformed: {0}")]
    MalformedFilter(String),

    #[error("requested topic {0} is not available to this consumer")]
    InvalidTopic(String),

    #[error("caller is not authenticated: {0}")]
    Unauthenticated(String),

    #[error("caller is not authorised: {0}")]
    PermissionDenied(String),
}

impl FederatorError {
    /// Classification used by job runtimes to decide whether the scheduler should
    /// reschedule the tick (§7 propagation policy).
    pub fn retry_class(&self) -> RetryClass {
        match self {
            FederatorError::Configuration(_)
            | FederatorError::MalformedFilter(_)
            | FederatorError::InvalidTopic(_) => RetryClass::Fatal,
            FederatorError::TokenFetch { .. }
            | FederatorError::TokenInvalid(_)
            | FederatorError::Unauthenticated(_)
            | FederatorError::PermissionDenied(_) => RetryClass::Auth,
            FederatorError::ManagementPlane { status, .. } => {
                if *status == 401 || *status >= 500 {
                    RetryClass::Retryable
                } else {
                    RetryClass::Fatal
                }
            }
            FederatorError::ManagementPlaneUnreachable(_)
            | FederatorError::CircuitOpen { .. }
            | FederatorError::OffsetStoreUnreachable(_)
            | FederatorError::SinkFailure(_) => RetryClass::Retryable,
            FederatorError::Job { .. } => RetryClass::Retryable,
        }
    }
}

/// Classify an incoming gRPC status from a producer-server stream per §4.6's table.
pub fn classify_grpc_status(status: &tonic::Status) -> RetryClass {
    use tonic::Code::*;
    match status.code() {
        DeadlineExceeded | ResourceExhausted | Aborted | Unavailable | DataLoss
        | Unauthenticated | PermissionDenied => RetryClass::Retryable,
        Ok | Cancelled | InvalidArgument | NotFound | AlreadyExists | FailedPrecondition
        | OutOfRange | Unimplemented | Internal => RetryClass::Fatal,
        _ => RetryClass::Fatal,
    }
}

/// Map a server-side `FederatorError` to the gRPC status the client observes. Used by
/// C8 when closing a call; authorisation failures are always evaluated (and thus mapped)
/// before any data byte is emitted.
impl From<&FederatorError> for tonic::Status {
    fn from(err: &FederatorError) -> Self {
        match err {
            FederatorError::Unauthenticated(msg) => tonic::Status::unauthenticated(msg.clone()),
            FederatorError::PermissionDenied(msg) => tonic::Status::permission_denied(msg.clone()),
            FederatorError::InvalidTopic(topic) => {
                tonic::Status::invalid_argument(format!("unknown topic: {topic}"))
            }
            FederatorError::TokenInvalid(msg) => tonic::Status::unauthenticated(msg.clone()),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}
