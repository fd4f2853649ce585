//! Where consumed records go once the client has pulled them off a producer server's
//! stream: the local event log. Two implementations, mirroring the teacher's split
//! between a trivial development sink and a Kafka-backed production one.

use async_trait::async_trait;
use federator_common::FederatorError;
use rdkafka::config::ClientConfig;
use rdkafka::producer::future_producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

#[derive(Debug, Clone)]
pub struct ForwardedRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub source_offset: String,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, record: ForwardedRecord) -> Result<(), FederatorError>;
}

pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn send(&self, record: ForwardedRecord) -> Result<(), FederatorError> {
        tracing::info!(
            offset = %record.source_offset,
            value_len = record.value.len(),
            "forwarded record"
        );
        metrics::counter!("records_forwarded_total").increment(1);
        Ok(())
    }
}

#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(topic: String, brokers: String) -> Result<Self, FederatorError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .create()
            .map_err(|e| FederatorError::SinkFailure(e.into()))?;
        Ok(Self { producer, topic })
    }
}

#[async_trait]
impl EventSink for KafkaSink {
    async fn send(&self, record: ForwardedRecord) -> Result<(), FederatorError> {
        let headers = record
            .headers
            .iter()
            .fold(rdkafka::message::OwnedHeaders::new(), |acc, (k, v)| {
                acc.insert(rdkafka::message::Header {
                    key: k.as_str(),
                    value: Some(v.as_str()),
                })
            });

        let result = self
            .producer
            .send(
                FutureRecord::to(&self.topic)
                    .key(&record.key)
                    .payload(&record.value)
                    .headers(headers),
                Timeout::Never,
            )
            .await;

        match result {
            Ok(_) => {
                metrics::counter!("records_forwarded_total").increment(1);
                Ok(())
            }
            Err((err, _)) => Err(FederatorError::SinkFailure(err.into())),
        }
    }
}
