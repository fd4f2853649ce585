//! Implements `FileExchange.StreamFile`: authenticate, authorise, then stream a local
//! file's contents back to the client in fixed-size chunks starting at the requested
//! byte offset, along with the whole-file SHA-256 checksum and chunk bookkeeping the
//! client needs to detect a corrupted or out-of-order transfer.

use std::pin::Pin;
use std::sync::Arc;

use federator_common::config_model::ProducerConfig;
use federator_common::ids::ManagementNodeId;
use federator_config::ConfigService;
use federator_proto::file_exchange_server::FileExchange;
use federator_proto::{FileChunk, FileStreamRequest};
use federator_token_service::TokenService;
use futures::Stream;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tonic::{Request, Response, Status};

use crate::{auth, filter};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hashes the whole file from the start, independent of the resume offset: the checksum
/// the client verifies against always covers the complete file, not just the resumed tail.
async fn file_checksum(path: &str) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct FileExchangeService {
    pub producer_config_service: Arc<dyn ConfigService<ProducerConfig>>,
    pub token_service: Arc<dyn TokenService>,
    pub management_node_id: ManagementNodeId,
}

#[tonic::async_trait]
impl FileExchange for FileExchangeService {
    type StreamFileStream = Pin<Box<dyn Stream<Item = Result<FileChunk, Status>> + Send>>;

    async fn stream_file(
        &self,
        request: Request<FileStreamRequest>,
    ) -> Result<Response<Self::StreamFileStream>, Status> {
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

        // A file source is addressed the same way a topic is: by looking it up as a
        // product's configured destination/source path.
        filter::filters_for(&config, &req.source_path, &caller.client_id)
            .ok_or_else(|| Status::invalid_argument(format!("unknown file source: {}", req.source_path)))?;

        let file_len = tokio::fs::metadata(&req.source_path)
            .await
            .map_err(|e| Status::not_found(format!("{}: {e}", req.source_path)))?
            .len();
        let checksum = file_checksum(&req.source_path)
            .await
            .map_err(|e| Status::internal(format!("failed to checksum {}: {e}", req.source_path)))?;

        let mut file = tokio::fs::File::open(&req.source_path)
            .await
            .map_err(|e| Status::not_found(format!("{}: {e}", req.source_path)))?;
        file.seek(std::io::SeekFrom::Start(req.byte_offset))
            .await
            .map_err(|e| Status::internal(format!("failed to seek: {e}")))?;

        let remaining = file_len.saturating_sub(req.byte_offset);
        let total_chunks = remaining.div_ceil(CHUNK_SIZE as u64);

        let stream = futures::stream::unfold(
            (file, req.byte_offset, 0u64),
            move |(mut file, offset, chunk_index)| {
                let checksum = checksum.clone();
                async move {
                    let mut buffer = vec![0u8; CHUNK_SIZE];
                    match file.read(&mut buffer).await {
                        Ok(0) => None,
                        Ok(n) => {
                            buffer.truncate(n);
                            let is_final = n < CHUNK_SIZE;
                            let chunk = FileChunk {
                                data: buffer,
                                byte_offset: offset,
                                is_final,
                                chunk_index,
                                total_chunks,
                                file_checksum: if is_final { checksum.clone() } else { String::new() },
                            };
                            metrics::counter!("file_bytes_forwarded_total").increment(n as u64);
                            Some((Ok(chunk), (file, offset + n as u64, chunk_index + 1)))
                        }
                        Err(e) => {
                            Some((Err(Status::internal(format!("read failed: {e}"))), (file, offset, chunk_index)))
                        }
                    }
                }
            },
        );

        Ok(Response::new(Box::pin(stream)))
    }
}
