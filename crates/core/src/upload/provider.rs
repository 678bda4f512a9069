//! Upload provider abstraction.

use async_trait::async_trait;

use super::error::ProviderError;
use super::progress::ProgressReporter;
use super::types::{ProviderKind, UploadRequest};

/// A backend that turns an image into a public URL.
///
/// Each call is one attempt; providers never retry internally. Progress goes to
/// `progress` and the returned URL must be absolute.
#[async_trait]
pub trait UploadProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Upload `request` and return the public URL.
    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &ProgressReporter,
    ) -> Result<String, ProviderError>;
}
