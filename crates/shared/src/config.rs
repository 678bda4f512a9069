//! Application configuration management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Upload policy shared by both providers.
    #[serde(default)]
    pub upload: UploadSettings,
    /// Fast image hosting API configuration.
    pub imgbb: ImgbbSettings,
    /// Resumable object storage. Absent means the storage provider is not initialized.
    #[serde(default)]
    pub storage: Option<StorageSettings>,
}

/// Upload policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Largest accepted payload in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Payloads at or above this size go to object storage first.
    #[serde(default = "default_direct_storage_threshold")]
    pub direct_storage_threshold: u64,
    /// Ceiling for reading and encoding a payload.
    #[serde(default = "default_encode_timeout")]
    pub encode_timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            direct_storage_threshold: default_direct_storage_threshold(),
            encode_timeout_secs: default_encode_timeout(),
        }
    }
}

fn default_max_file_size() -> u64 {
    32 * 1024 * 1024
}

fn default_direct_storage_threshold() -> u64 {
    5 * 1024 * 1024
}

fn default_encode_timeout() -> u64 {
    15
}

/// Fast image hosting API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgbbSettings {
    /// Upload endpoint.
    #[serde(default = "default_imgbb_endpoint")]
    pub endpoint: String,
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Upper bound on the whole request.
    #[serde(default = "default_imgbb_timeout")]
    pub request_timeout_secs: u64,
}

fn default_imgbb_endpoint() -> String {
    "https://api.imgbb.com/1/upload".to_string()
}

fn default_imgbb_timeout() -> u64 {
    12
}

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Resumable object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend to write objects to.
    pub provider: StorageProvider,
    /// Key prefix for uploaded objects.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Public base URL objects are served from. When unset, local filesystem objects
    /// resolve to `file://` URLs and other backends use presigned reads.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Overall ceiling for one storage attempt.
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
    /// Interval between stall checks.
    #[serde(default = "default_stall_poll_interval")]
    pub stall_poll_interval_secs: u64,
    /// Unchanged polls tolerated before a transfer counts as stalled.
    #[serde(default = "default_max_stalled_polls")]
    pub max_stalled_polls: u32,
    /// Size of each written chunk in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Lifetime of presigned read URLs.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,
}

fn default_prefix() -> String {
    "uploads".to_string()
}

fn default_storage_timeout() -> u64 {
    60
}

fn default_stall_poll_interval() -> u64 {
    3
}

fn default_max_stalled_polls() -> u32 {
    3
}

fn default_chunk_size() -> usize {
    256 * 1024
}

fn default_presign_ttl() -> u64 {
    3600 // 1 hour
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Loads configuration with `dir` holding the `default` and `{RUN_MODE}` files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let dir = dir.as_ref();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(
                config::File::with_name(&dir.join(&run_mode).to_string_lossy()).required(false),
            )
            .add_source(
                config::Environment::with_prefix("INHAMISSA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
