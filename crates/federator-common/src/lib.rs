//! Shared types for the federation data plane: the producer/consumer configuration
//! model, job parameters, the error taxonomy, and the retry policy used by every
//! component that talks to an upstream over the network.

pub mod config_model;
pub mod env_types;
pub mod error;
pub mod ids;
pub mod job_params;
pub mod naming;
pub mod retry;

pub use config_model::{
    AttributeFilter, ConsumerConfig, ConsumerDescriptor, ProducerConfig, ProducerDescriptor,
    ProductConsumerDescriptor, ProductDescriptor, ProductType, ScheduleType,
};
pub use env_types::{EnvMsDuration, NonEmptyString};
pub use error::{FederatorError, RetryClass};
pub use ids::ManagementNodeId;
pub use job_params::{
    ConnectionTarget, DynamicConfigJobParams, FileJobParams, JobBase, JobParams, TopicJobParams,
};
pub use retry::RetryPolicy;
