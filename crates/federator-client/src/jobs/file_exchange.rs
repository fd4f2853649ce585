//! The file-exchange job: resumes a byte-offset file transfer from a producer server's
//! `FileExchange.StreamFile`, appending each chunk to the local destination path and
//! committing the new byte offset only once the whole file's SHA-256 checksum has been
//! verified. A chunk-index gap or a checksum mismatch discards the partially-written
//! file and fails the tick without committing, so the next tick re-requests from the
//! last committed offset.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tonic::transport::Channel;
use tonic::Request;

use federator_common::{naming, FederatorError, FileJobParams};
use federator_proto::file_exchange_client::FileExchangeClient;
use federator_proto::FileStreamRequest;

use crate::paths::validate_path;
use crate::runtime::ClientRuntime;

pub async fn run(runtime: &ClientRuntime, params: &FileJobParams) -> Result<(), FederatorError> {
    let job_err = |source: anyhow::Error| FederatorError::Job {
        topic: params.source_path.clone(),
        source,
    };

    let destination = validate_path(&runtime.files_root, &params.destination_path)?;
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| job_err(e.into()))?;
    }

    let offset_key = naming::offset_key(
        &params.connection_target.client_key,
        &params.connection_target.server_name,
        &params.destination_path,
    );

    let channel = Channel::from_shared(params.connection_target.endpoint())
        .map_err(|e| job_err(e.into()))?
        .connect()
        .await
        .map_err(|e| job_err(e.into()))?;

    let token = runtime.token_service.fetch_token().await?;
    let mut client = FileExchangeClient::new(channel);

    let byte_offset: u64 = runtime
        .offset_store
        .get_offset(&offset_key)
        .await?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let mut request = Request::new(FileStreamRequest {
        source_path: params.source_path.clone(),
        byte_offset,
        consumer_name: params.connection_target.client_name.clone(),
    });
    request.metadata_mut().insert(
        "authorization",
        format!("Bearer {token}")
            .parse()
            .map_err(|e: tonic::metadata::errors::InvalidMetadataValue| job_err(e.into()))?,
    );

    let mut stream = client
        .stream_file(request)
        .await
        .map_err(|status| job_err(anyhow::anyhow!(status)))?
        .into_inner();

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&destination)
        .await
        .map_err(|e| job_err(e.into()))?;

    let mut expected_chunk_index = 0u64;

    loop {
        let next = stream.message().await.map_err(|status| job_err(anyhow::anyhow!(status)))?;
        let Some(chunk) = next else {
            break;
        };

        if chunk.chunk_index != expected_chunk_index {
            let _ = file.set_len(byte_offset).await;
            return Err(job_err(anyhow::anyhow!(
                "chunk index mismatch for {}: expected {expected_chunk_index}, got {}; discarding transfer",
                params.destination_path,
                chunk.chunk_index
            )));
        }
        expected_chunk_index += 1;

        let next_offset = chunk.byte_offset + chunk.data.len() as u64;
        file.write_all(&chunk.data).await.map_err(|e| job_err(e.into()))?;

        if chunk.is_final {
            file.flush().await.map_err(|e| job_err(e.into()))?;

            // The checksum covers the whole assembled file, not just this run's chunks,
            // so it has to be computed over the destination file's full contents rather
            // than accumulated incrementally (a resumed transfer only sees its own tail).
            if !chunk.file_checksum.is_empty() {
                let digest = whole_file_checksum(&destination).await.map_err(|e| job_err(e.into()))?;
                if !digest.eq_ignore_ascii_case(&chunk.file_checksum) {
                    let _ = file.set_len(byte_offset).await;
                    return Err(job_err(anyhow::anyhow!(
                        "checksum mismatch for {}: expected {}, got {digest}; discarding transfer",
                        params.destination_path,
                        chunk.file_checksum
                    )));
                }
            }
            runtime.offset_store.set_offset(&offset_key, &next_offset.to_string()).await?;
            break;
        }
    }

    Ok(())
}

async fn whole_file_checksum(path: &std::path::Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
