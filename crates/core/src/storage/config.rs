//! Storage configuration types.

use inhamissa_shared::{StorageProvider, StorageSettings};

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Key prefix for uploaded objects (default: `uploads`).
    pub prefix: String,
    /// Public base URL objects are served from.
    pub public_base_url: Option<String>,
    /// Size of each written chunk in bytes.
    pub chunk_size: usize,
    /// Presigned download URL TTL in seconds (default: 3600 = 1 hour).
    pub presign_ttl_secs: u64,
}

impl StorageConfig {
    /// Default key prefix.
    pub const DEFAULT_PREFIX: &'static str = "uploads";
    /// Default chunk size: 256KB.
    pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;
    /// Smallest accepted chunk size.
    pub const MIN_CHUNK_SIZE: usize = 4 * 1024;
    /// Default presigned read TTL: 1 hour.
    pub const DEFAULT_PRESIGN_TTL: u64 = 3600;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            prefix: Self::DEFAULT_PREFIX.to_string(),
            public_base_url: None,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            presign_ttl_secs: Self::DEFAULT_PRESIGN_TTL,
        }
    }

    /// Build the config from the `[storage]` settings section.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let mut config = Self::new(settings.provider.clone())
            .with_prefix(settings.prefix.clone())
            .with_chunk_size(settings.chunk_size)
            .with_presign_ttl(settings.presign_ttl_secs);
        if let Some(base) = &settings.public_base_url {
            config = config.with_public_base_url(base.clone());
        }
        config
    }

    /// Set the key prefix. Surrounding slashes are dropped.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    /// Serve objects from a public base URL instead of file or presigned URLs.
    #[must_use]
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the chunk size, never below [`Self::MIN_CHUNK_SIZE`].
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(Self::MIN_CHUNK_SIZE);
        self
    }

    /// Set presigned read URL TTL.
    #[must_use]
    pub fn with_presign_ttl(mut self, secs: u64) -> Self {
        self.presign_ttl_secs = secs;
        self
    }
}
