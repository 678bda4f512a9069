//! Fast image hosting provider (ImgBB).
//!
//! One multipart POST per attempt carrying the base64 body of the image. Progress
//! is reported at fixed milestones because the HTTP client exposes no byte-level
//! upload progress.

use async_trait::async_trait;
use reqwest::{Client, multipart::Form};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::config::ImgbbConfig;
use super::encoder::encode_image;
use super::error::{ProviderError, UploadError};
use super::progress::ProgressReporter;
use super::provider::UploadProvider;
use super::types::{ProviderKind, UploadRequest, is_valid_image_url};

/// Milestone after the attempt starts.
const PROGRESS_STARTED: u8 = 10;
/// Milestone once the payload is encoded.
const PROGRESS_ENCODED: u8 = 30;
/// Milestone once the provider answered.
const PROGRESS_RESPONDED: u8 = 70;

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgbbImage>,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: Option<String>,
}

/// Uploads images to the ImgBB hosting API.
#[derive(Debug, Clone)]
pub struct ImgbbProvider {
    client: Client,
    config: ImgbbConfig,
}

impl ImgbbProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: ImgbbConfig) -> Result<Self, UploadError> {
        if config.api_key.trim().is_empty() {
            return Err(UploadError::configuration("ImgBB API key is empty"));
        }
        let client = Client::builder()
            .user_agent(concat!("inhamissa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a provider sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: ImgbbConfig) -> Self {
        Self { client, config }
    }

    /// The provider configuration.
    #[must_use]
    pub fn config(&self) -> &ImgbbConfig {
        &self.config
    }

    fn classify(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::timeout(self.config.request_timeout)
        } else {
            ProviderError::network(err.to_string())
        }
    }
}

#[async_trait]
impl UploadProvider for ImgbbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Imgbb
    }

    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &ProgressReporter,
    ) -> Result<String, ProviderError> {
        progress.report(PROGRESS_STARTED);

        let encoded = encode_image(request, self.config.encode_timeout).await?;
        progress.report(PROGRESS_ENCODED);

        let name = request.display_name();
        let form = Form::new()
            .text("image", encoded.into_data())
            .text("name", name.clone());

        debug!(endpoint = %self.config.endpoint, name = %name, "Posting image to ImgBB");
        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .multipart(form)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(&e))?;
        progress.report(PROGRESS_RESPONDED);

        if !status.is_success() {
            warn!(status = status.as_u16(), "ImgBB rejected upload");
            return Err(ProviderError::rejected(status.as_u16(), truncate(&body)));
        }

        let url = parse_response(&body)?;
        progress.report(100);
        info!(url = %url, "Image uploaded to ImgBB");
        Ok(url)
    }
}

/// Extract the public URL from an ImgBB response body.
pub(crate) fn parse_response(body: &str) -> Result<String, ProviderError> {
    let response: ImgbbResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("malformed JSON: {e}")))?;

    if !response.success {
        return Err(ProviderError::invalid_response("success flag not set"));
    }

    let url = response
        .data
        .and_then(|data| data.url)
        .ok_or_else(|| ProviderError::invalid_response("response has no data.url"))?;

    if !is_valid_image_url(&url) {
        return Err(ProviderError::invalid_response(format!(
            "not an absolute URL: {url}"
        )));
    }
    Ok(url)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
