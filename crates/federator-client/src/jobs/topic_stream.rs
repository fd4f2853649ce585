//! The topic-stream job: opens a resumable server-streaming call against a producer
//! server's `TopicStream.StreamTopic`, forwards every batch to the local event sink, and
//! commits the new offset only after the sink accepted the record (at-least-once, never
//! silently drops on a sink failure).

use federator_common::{naming, FederatorError, TopicJobParams};
use federator_proto::topic_stream_client::TopicStreamClient;
use federator_proto::TopicRequest;
use tonic::transport::Channel;
use tonic::Request;

use crate::runtime::ClientRuntime;
use crate::sink::ForwardedRecord;

pub async fn run(runtime: &ClientRuntime, params: &TopicJobParams) -> Result<(), FederatorError> {
    let offset_key = naming::offset_key(
        &params.connection_target.client_key,
        &params.connection_target.server_name,
        &params.topic,
    );

    let channel = Channel::from_shared(params.connection_target.endpoint())
        .map_err(|e| FederatorError::Job {
            topic: params.topic.clone(),
            source: e.into(),
        })?
        .connect()
        .await
        .map_err(|e| FederatorError::Job {
            topic: params.topic.clone(),
            source: e.into(),
        })?;

    let token = runtime.token_service.fetch_token().await?;
    let mut client = TopicStreamClient::new(channel);

    let last_offset = runtime.offset_store.get_offset(&offset_key).await?.unwrap_or_default();

    let mut request = Request::new(TopicRequest {
        topic: params.topic.clone(),
        offset: last_offset,
        consumer_name: params.connection_target.client_name.clone(),
        attribute_filter: Vec::new(),
    });
    request
        .metadata_mut()
        .insert("authorization", format!("Bearer {token}").parse().map_err(|e: tonic::metadata::errors::InvalidMetadataValue| {
            FederatorError::Job {
                topic: params.topic.clone(),
                source: e.into(),
            }
        })?);

    let mut stream = client
        .stream_topic(request)
        .await
        .map_err(|status| FederatorError::Job {
            topic: params.topic.clone(),
            source: anyhow::anyhow!(status),
        })?
        .into_inner();

    loop {
        let next = stream.message().await.map_err(|status| FederatorError::Job {
            topic: params.topic.clone(),
            source: anyhow::anyhow!(status),
        })?;
        let Some(batch) = next else {
            break;
        };

        let headers = batch
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();

        runtime
            .sink
            .send(ForwardedRecord {
                key: batch.key,
                value: batch.value,
                headers,
                source_offset: batch.offset.clone(),
            })
            .await?;

        runtime.offset_store.set_offset(&offset_key, &batch.offset).await?;
    }

    Ok(())
}
