use bytes::Bytes;
use futures_util::stream;
use reqwest::{multipart, Body, Client};

use crate::config::UploaderConfig;
use crate::errors::{UploadError, UploadResult, FALLBACK_UPLOAD_MESSAGE};

/// Chunk size for the streamed request body. Small enough that progress
/// callbacks fire at a useful granularity for large recordings.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP client for the upload endpoint.
pub struct BackendClient {
    client: Client,
    endpoint_url: String,
    upload_kind: String,
}

impl BackendClient {
    pub fn new(config: &UploaderConfig) -> UploadResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            upload_kind: config.upload_kind.clone(),
        })
    }

    /// POST one file as multipart/form-data (fields `file` and `type`),
    /// invoking `on_progress` with a 0-100 percentage as the body is handed
    /// to the transport.
    ///
    /// A response that arrives counts as a completed upload; status code
    /// interpretation is left to the backend contract. Transport failures
    /// come back as `UploadError::UploadFailed` with a normalized,
    /// always-present message.
    pub async fn upload<F>(&self, file_name: &str, data: Bytes, on_progress: F) -> UploadResult<()>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let total_bytes = data.len() as u64;

        // Zero-copy chunking; each slice shares the payload allocation.
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| data.slice(start..data.len().min(start + UPLOAD_CHUNK_SIZE)))
            .collect();

        let mut sent = 0u64;
        let body_stream = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(percent_sent(sent, total_bytes));
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        let file_part = multipart::Part::stream_with_length(Body::wrap_stream(body_stream), total_bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;

        let form = multipart::Form::new()
            .text("type", self.upload_kind.clone())
            .part("file", file_part);

        log::debug!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            total_bytes,
            self.endpoint_url
        );

        match self.client.post(&self.endpoint_url).multipart(form).send().await {
            Ok(response) => {
                log::debug!(
                    "Upload of {} completed with status {}",
                    file_name,
                    response.status()
                );
                // Drain the body; a response that arrived is already terminal.
                response.bytes().await.ok();
                Ok(())
            }
            Err(err) => Err(UploadError::UploadFailed {
                reason: normalize_transport_detail(Some(&err.to_string())),
            }),
        }
    }
}

/// Integer percentage of bytes sent, rounded, never above 100.
pub(crate) fn percent_sent(sent: u64, total: u64) -> u8 {
    let ratio = sent as f64 / total.max(1) as f64;
    ((ratio * 100.0).round() as u64).min(100) as u8
}

/// Transport errors do not guarantee a detail string; every failure surfaced
/// to a record must carry one, so the default is applied here.
pub(crate) fn normalize_transport_detail(detail: Option<&str>) -> String {
    match detail {
        Some(message) if !message.trim().is_empty() => message.to_string(),
        _ => FALLBACK_UPLOAD_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_rounded_and_clamped() {
        assert_eq!(percent_sent(0, 100), 0);
        assert_eq!(percent_sent(1, 3), 33);
        assert_eq!(percent_sent(2, 3), 67);
        assert_eq!(percent_sent(100, 100), 100);
        assert_eq!(percent_sent(150, 100), 100);
    }

    #[test]
    fn percent_of_empty_payload_does_not_divide_by_zero() {
        assert_eq!(percent_sent(0, 0), 0);
    }

    #[test]
    fn missing_transport_detail_falls_back() {
        assert_eq!(normalize_transport_detail(None), "Upload failed");
        assert_eq!(normalize_transport_detail(Some("   ")), "Upload failed");
        assert_eq!(
            normalize_transport_detail(Some("connection refused")),
            "connection refused"
        );
    }
}
