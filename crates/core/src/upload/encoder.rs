//! Payload reading and base64 encoding with a bounded wait.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;
use tracing::debug;

use super::data_url::DataUrl;
use super::error::EncodeError;
use super::types::{ImageSource, UploadRequest};

/// Default ceiling for reading and encoding a payload.
pub const DEFAULT_ENCODE_TIMEOUT: Duration = Duration::from_secs(15);

/// Shortest base64 body accepted as a plausible image.
pub const MIN_ENCODED_LEN: usize = 16;

/// Read the request payload within `limit`.
///
/// The read future is dropped when the limit expires, which cancels file reads.
pub async fn read_payload(request: &UploadRequest, limit: Duration) -> Result<Bytes, EncodeError> {
    bounded(limit, read_source(request.source(), request.byte_len())).await
}

/// Read and encode the request payload within `limit`.
///
/// Returns the structured data URL; callers that only want the base64 body use
/// [`DataUrl::into_data`].
pub async fn encode_image(request: &UploadRequest, limit: Duration) -> Result<DataUrl, EncodeError> {
    let work = async {
        let bytes = read_source(request.source(), request.byte_len()).await?;
        let mime_type = request.mime_type().to_string();

        let encoded = tokio::task::spawn_blocking(move || {
            let encoded = DataUrl::encode(&mime_type, &bytes);
            check_encoded(&encoded).map(|()| encoded)
        })
        .await
        .map_err(|e| EncodeError::EncodingFailure(e.to_string()))??;

        debug!(
            encoded_len = encoded.data().len(),
            bytes = request.byte_len(),
            "Image encoded"
        );
        Ok(encoded)
    };

    bounded(limit, work).await
}

async fn bounded<T>(
    limit: Duration,
    work: impl Future<Output = Result<T, EncodeError>>,
) -> Result<T, EncodeError> {
    timeout(limit, work)
        .await
        .map_err(|_| EncodeError::Timeout { limit })?
}

async fn read_source(source: &ImageSource, declared_len: u64) -> Result<Bytes, EncodeError> {
    let bytes = match source {
        ImageSource::Bytes(bytes) => bytes.clone(),
        ImageSource::File(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| EncodeError::ReadFailure(format!("{}: {e}", path.display())))?,
    };

    if bytes.is_empty() {
        return Err(EncodeError::InvalidInput("payload is empty".to_string()));
    }
    if bytes.len() as u64 != declared_len {
        return Err(EncodeError::ReadFailure(format!(
            "read {} bytes, expected {declared_len}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn check_encoded(encoded: &DataUrl) -> Result<(), EncodeError> {
    let data = encoded.data();
    if data.len() < MIN_ENCODED_LEN {
        return Err(EncodeError::EncodingFailure(format!(
            "encoded payload suspiciously short ({} chars)",
            data.len()
        )));
    }
    // The body handed out is the data portion only, never a full data URL.
    if data.starts_with("data:") || data.contains(',') {
        return Err(EncodeError::EncodingFailure(
            "encoded payload still carries a data URL header".to_string(),
        ));
    }
    Ok(())
}
