//! Upload request and outcome types.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use inhamissa_shared::OwnerId;
use serde::{Deserialize, Serialize};

use super::error::UploadError;

/// Identifies which provider produced an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Fast image hosting API (ImgBB).
    Imgbb,
    /// Resumable object storage. Serialized as `firebase`, the identifier stored
    /// documents already use for this provider.
    Firebase,
}

impl ProviderKind {
    /// Identifier reported to callers as the upload `method`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imgbb => "imgbb",
            Self::Firebase => "firebase",
        }
    }

    /// The provider used when this one fails.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Imgbb => Self::Firebase,
            Self::Firebase => Self::Imgbb,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Bytes already held in memory.
    Bytes(Bytes),
    /// A file read lazily by the encoder.
    File(PathBuf),
}

/// A single image upload.
///
/// Immutable once built; validation happens in the orchestrator before any I/O.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    source: ImageSource,
    mime_type: String,
    byte_len: u64,
    owner_id: OwnerId,
    file_name: Option<String>,
}

impl UploadRequest {
    /// Create a request for an in-memory payload.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>, mime_type: impl Into<String>, owner_id: OwnerId) -> Self {
        let data = data.into();
        Self {
            byte_len: data.len() as u64,
            source: ImageSource::Bytes(data),
            mime_type: mime_type.into(),
            owner_id,
            file_name: None,
        }
    }

    /// Create a request for a file on disk.
    ///
    /// The MIME type is derived from the file extension and the length from the
    /// file metadata. The file itself is read later by the encoder.
    pub async fn from_path(path: impl AsRef<Path>, owner_id: OwnerId) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            UploadError::invalid_input(format!("cannot access {}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(UploadError::invalid_input(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_for_extension)
            .unwrap_or("application/octet-stream");

        Ok(Self {
            source: ImageSource::File(path.to_path_buf()),
            mime_type: mime_type.to_string(),
            byte_len: metadata.len(),
            owner_id,
            file_name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(String::from),
        })
    }

    /// Attach the original file name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Payload source.
    #[must_use]
    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Declared byte length.
    #[must_use]
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    /// Owner of the upload.
    #[must_use]
    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// Original file name, if known.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Check the request invariants against the configured maximum size.
    pub fn validate(&self, max_file_size: u64) -> Result<(), UploadError> {
        if !self.mime_type.starts_with("image/") {
            return Err(UploadError::invalid_input(format!(
                "MIME type '{}' is not an image",
                self.mime_type
            )));
        }
        if self.byte_len == 0 {
            return Err(UploadError::invalid_input("image is empty"));
        }
        if self.byte_len > max_file_size {
            return Err(UploadError::invalid_input(format!(
                "image size {} bytes exceeds maximum allowed {} bytes",
                self.byte_len, max_file_size
            )));
        }
        Ok(())
    }

    /// Lowercase file extension, from the file name or else the MIME type.
    #[must_use]
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .or_else(|| extension_for_mime(&self.mime_type).map(String::from))
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Display name sent to the hosting API: the file stem with every
    /// non-alphanumeric character replaced by `_`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let stem = self
            .file_name
            .as_deref()
            .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
            .filter(|stem| !stem.is_empty())
            .unwrap_or("image");
        sanitize_name(stem)
    }
}

/// Successful upload result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Always `true`; failures are reported as errors.
    pub success: bool,
    /// Public URL of the uploaded image.
    pub url: String,
    /// Provider that produced `url`.
    pub method: ProviderKind,
}

impl UploadOutcome {
    /// Create a successful outcome.
    #[must_use]
    pub fn new(url: impl Into<String>, method: ProviderKind) -> Self {
        Self {
            success: true,
            url: url.into(),
            method,
        }
    }
}

/// Returns true when `url` parses as an absolute URL.
#[must_use]
pub fn is_valid_image_url(url: &str) -> bool {
    !url.is_empty()
        && reqwest::Url::parse(url)
            .is_ok_and(|parsed| parsed.has_host() || matches!(parsed.scheme(), "data" | "file"))
}

/// Map a MIME type to its usual file extension.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/avif" => Some("avif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Map a file extension to an image MIME type.
#[must_use]
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        "avif" => Some("image/avif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
