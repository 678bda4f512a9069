//! Upload configuration.

use std::time::Duration;

use inhamissa_shared::{ImgbbSettings, StorageSettings, UploadSettings};

use super::encoder::DEFAULT_ENCODE_TIMEOUT;

/// Default maximum payload size (32 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// Default size at which payloads go to object storage first (5 MiB).
pub const DEFAULT_DIRECT_STORAGE_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Default backstop for a single provider attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(90);

/// Orchestrator policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploaderConfig {
    /// Largest accepted payload in bytes.
    pub max_file_size: u64,
    /// Payloads at or above this size try object storage first.
    pub direct_storage_threshold: u64,
    /// Backstop applied around every provider attempt.
    pub attempt_timeout: Duration,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            direct_storage_threshold: DEFAULT_DIRECT_STORAGE_THRESHOLD,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl UploaderConfig {
    /// Build from application settings.
    #[must_use]
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
            direct_storage_threshold: settings.direct_storage_threshold,
            ..Self::default()
        }
    }

    /// Set the maximum payload size.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the direct storage threshold.
    #[must_use]
    pub fn with_direct_storage_threshold(mut self, bytes: u64) -> Self {
        self.direct_storage_threshold = bytes;
        self
    }

    /// Set the per-attempt backstop.
    #[must_use]
    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = limit;
        self
    }
}

/// Default ImgBB endpoint.
pub const DEFAULT_IMGBB_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

/// Default ceiling for one ImgBB request.
pub const DEFAULT_IMGBB_TIMEOUT: Duration = Duration::from_secs(12);

/// Fast hosting API configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgbbConfig {
    /// Upload endpoint.
    pub endpoint: String,
    /// API key.
    pub api_key: String,
    /// Ceiling for the HTTP request.
    pub request_timeout: Duration,
    /// Ceiling for reading and encoding the payload.
    pub encode_timeout: Duration,
}

impl ImgbbConfig {
    /// Create with the default endpoint and timeouts.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_IMGBB_ENDPOINT.to_string(),
            api_key: api_key.into(),
            request_timeout: DEFAULT_IMGBB_TIMEOUT,
            encode_timeout: DEFAULT_ENCODE_TIMEOUT,
        }
    }

    /// Build from application settings.
    #[must_use]
    pub fn from_settings(imgbb: &ImgbbSettings, upload: &UploadSettings) -> Self {
        Self {
            endpoint: imgbb.endpoint.clone(),
            api_key: imgbb.api_key.clone(),
            request_timeout: Duration::from_secs(imgbb.request_timeout_secs),
            encode_timeout: Duration::from_secs(upload.encode_timeout_secs),
        }
    }

    /// Override the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = limit;
        self
    }
}

/// Default ceiling for one storage attempt.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between stall checks.
pub const DEFAULT_STALL_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of unchanged polls before a transfer counts as stalled.
pub const DEFAULT_MAX_STALLED_POLLS: u32 = 3;

/// How long a cancelled transfer gets to wind down before it is aborted.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Resumable storage provider timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumableConfig {
    /// Overall ceiling for the transfer.
    pub timeout: Duration,
    /// Interval between stall checks.
    pub poll_interval: Duration,
    /// Unchanged polls tolerated while the transfer is incomplete.
    pub max_stalled_polls: u32,
    /// Ceiling for reading the payload.
    pub read_timeout: Duration,
    /// Wait for a cancelled transfer to stop before aborting its task.
    pub cancel_grace: Duration,
}

impl Default for ResumableConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STORAGE_TIMEOUT,
            poll_interval: DEFAULT_STALL_POLL_INTERVAL,
            max_stalled_polls: DEFAULT_MAX_STALLED_POLLS,
            read_timeout: DEFAULT_ENCODE_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

impl ResumableConfig {
    /// Build from application settings.
    #[must_use]
    pub fn from_settings(storage: &StorageSettings, upload: &UploadSettings) -> Self {
        Self {
            timeout: Duration::from_secs(storage.timeout_secs),
            poll_interval: Duration::from_secs(storage.stall_poll_interval_secs.max(1)),
            max_stalled_polls: storage.max_stalled_polls,
            read_timeout: Duration::from_secs(upload.encode_timeout_secs),
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }

    /// Override the overall timeout.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = limit;
        self
    }

    /// Override stall detection.
    #[must_use]
    pub fn with_stall_detection(mut self, poll_interval: Duration, max_stalled_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_stalled_polls = max_stalled_polls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploader_defaults() {
        let config = UploaderConfig::default();
        assert_eq!(config.max_file_size, 32 * 1024 * 1024);
        assert_eq!(config.direct_storage_threshold, 5 * 1024 * 1024);
    }

    #[test]
    fn test_uploader_from_settings() {
        let settings = UploadSettings {
            max_file_size: 1000,
            direct_storage_threshold: 100,
            encode_timeout_secs: 5,
        };
        let config = UploaderConfig::from_settings(&settings);
        assert_eq!(config.max_file_size, 1000);
        assert_eq!(config.direct_storage_threshold, 100);
        assert_eq!(config.attempt_timeout, DEFAULT_ATTEMPT_TIMEOUT);
    }

    #[test]
    fn test_imgbb_from_settings() {
        let imgbb = ImgbbSettings {
            endpoint: "http://localhost:9000/upload".into(),
            api_key: "k".into(),
            request_timeout_secs: 3,
        };
        let config = ImgbbConfig::from_settings(&imgbb, &UploadSettings::default());
        assert_eq!(config.endpoint, "http://localhost:9000/upload");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.encode_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_resumable_poll_interval_floor() {
        let storage = StorageSettings {
            provider: inhamissa_shared::StorageProvider::local_fs("/tmp"),
            prefix: "uploads".into(),
            public_base_url: None,
            timeout_secs: 60,
            stall_poll_interval_secs: 0,
            max_stalled_polls: 3,
            chunk_size: 1024,
            presign_ttl_secs: 60,
        };
        let config = ResumableConfig::from_settings(&storage, &UploadSettings::default());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
