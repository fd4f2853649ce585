//! Implements `TopicStream.StreamTopic`: authenticate, authorise the caller against the
//! producer's configured consumers, then stream Kafka records (filtered, resumed from
//! the requested offset) to the client.

use std::pin::Pin;
use std::sync::Arc;

use federator_common::config_model::ProducerConfig;
use federator_common::ids::ManagementNodeId;
use federator_config::ConfigService;
use federator_proto::topic_stream_server::TopicStream;
use federator_proto::{Header, KafkaByteBatch, TopicRequest};
use federator_token_service::TokenService;
use futures::Stream;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{Message, Offset, TopicPartitionList};
use tonic::{Request, Response, Status};

use crate::{auth, filter};

pub struct TopicStreamService {
    pub producer_config_service: Arc<dyn ConfigService<ProducerConfig>>,
    pub token_service: Arc<dyn TokenService>,
    pub management_node_id: ManagementNodeId,
    pub kafka_brokers: String,
}

#[tonic::async_trait]
impl TopicStream for TopicStreamService {
    type StreamTopicStream = Pin<Box<dyn Stream<Item = Result<KafkaByteBatch, Status>> + Send>>;

    async fn stream_topic(
        &self,
        request: Request<TopicRequest>,
    ) -> Result<Response<Self::StreamTopicStream>, Status> {
        let caller = auth::authenticate(self.token_service.as_ref(), &request).await?;
        let req = request.into_inner();

        let config = self
            .producer_config_service
            .get_config(&self.management_node_id)
            .await
            .map_err(|e| Status::from(&e))?;

        if !filter::is_authorized(&config, &caller.client_id) {
            return Err(Status::permission_denied(format!(
                "{} is not a configured consumer",
                caller.client_id
            )));
        }

        let filters = filter::filters_for(&config, &req.topic, &caller.client_id)
            .ok_or_else(|| Status::invalid_argument(format!("unknown topic: {}", req.topic)))?
            .to_vec();

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.kafka_brokers)
            .set("group.id", format!("federator-server-{}", caller.client_id))
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| Status::internal(format!("failed to create kafka consumer: {e}")))?;

        let mut partitions = TopicPartitionList::new();
        let offset = match req.offset.parse::<i64>() {
            Ok(value) => Offset::Offset(value + 1),
            Err(_) => Offset::Beginning,
        };
        partitions
            .add_partition_offset(&req.topic, 0, offset)
            .map_err(|e| Status::invalid_argument(format!("invalid topic/offset: {e}")))?;
        consumer
            .assign(&partitions)
            .map_err(|e| Status::internal(format!("failed to assign partition: {e}")))?;

        let topic = req.topic.clone();
        let stream = futures::stream::unfold(consumer, move |consumer| {
            let filters = filters.clone();
            let topic = topic.clone();
            async move {
                loop {
                    match consumer.recv().await {
                        Ok(message) => {
                            let headers: Vec<(String, String)> = message
                                .headers()
                                .map(|hs| {
                                    (0..hs.count())
                                        .filter_map(|i| {
                                            let h = hs.get(i);
                                            h.value.map(|v| {
                                                (h.key.to_string(), String::from_utf8_lossy(v).to_string())
                                            })
                                        })
                                        .collect()
                                })
                                .unwrap_or_default();

                            if !filter::record_passes(&filters, &headers) {
                                metrics::counter!("records_filtered_total", "topic" => topic.clone())
                                    .increment(1);
                                continue;
                            }

                            let batch = KafkaByteBatch {
                                key: message.key().unwrap_or_default().to_vec(),
                                value: message.payload().unwrap_or_default().to_vec(),
                                headers: headers
                                    .into_iter()
                                    .map(|(name, value)| Header { name, value })
                                    .collect(),
                                offset: message.offset().to_string(),
                                timestamp_ms: message.timestamp().to_millis().unwrap_or(0),
                            };
                            metrics::counter!("records_forwarded_total", "topic" => topic.clone())
                                .increment(1);
                            return Some((Ok(batch), consumer));
                        }
                        Err(e) => return Some((Err(Status::internal(format!("kafka error: {e}"))), consumer)),
                    }
                }
            }
        });

        Ok(Response::new(Box::pin(stream)))
    }
}
