//! Image upload with provider fallback.
//!
//! Two interchangeable providers turn an image into a public URL:
//!
//! - [`ImgbbProvider`]: base64 multipart POST to the ImgBB hosting API.
//! - [`ResumableStorageProvider`]: chunked write to object storage through
//!   [`BlobStore`](crate::storage::BlobStore), with stall detection.
//!
//! [`Uploader`] validates the request, orders the providers by payload size and
//! falls back to the other provider once when the first attempt fails.
//!
//! # Example
//!
//! ```rust,ignore
//! let uploader = Uploader::from_app_config(&config)?;
//! let request = UploadRequest::from_path("photo.jpg", owner_id).await?;
//! let outcome = uploader
//!     .upload_image(request, |percent| tracing::debug!(percent, "progress"))
//!     .await?;
//! println!("{} via {}", outcome.url, outcome.method);
//! ```

mod config;
mod data_url;
mod encoder;
mod error;
mod imgbb;
mod orchestrator;
mod progress;
mod provider;
mod resumable;
mod types;

pub use config::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_DIRECT_STORAGE_THRESHOLD, DEFAULT_MAX_FILE_SIZE, ImgbbConfig,
    ResumableConfig, UploaderConfig,
};
pub use data_url::{DataUrl, DataUrlError};
pub use encoder::{DEFAULT_ENCODE_TIMEOUT, MIN_ENCODED_LEN, encode_image, read_payload};
pub use error::{EncodeError, ProviderError, ProviderFailure, UploadError};
pub use imgbb::ImgbbProvider;
pub use orchestrator::Uploader;
pub use progress::{ProgressEvent, ProgressReporter, UploadTask};
pub use provider::UploadProvider;
pub use resumable::{ResumableStorageProvider, scale_progress};
pub use types::{
    ImageSource, ProviderKind, UploadOutcome, UploadRequest, extension_for_mime,
    is_valid_image_url, mime_for_extension,
};
