//! Generated gRPC types and service traits for the two data-plane streams: topic
//! streaming (`TopicStream.StreamTopic`) and file exchange (`FileExchange.StreamFile`).

pub mod federator {
    pub mod v1 {
        tonic::include_proto!("federator.v1");
    }
}

pub use federator::v1::*;
