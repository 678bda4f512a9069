//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use inhamissa_shared::{OwnerId, StorageProvider};
use opendal::{Operator, services};
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::StorageConfig;
use super::error::StorageError;

/// Length of the random token embedded in object keys.
const KEY_TOKEN_LEN: usize = 10;

/// Blob store the resumable upload provider writes to.
///
/// Implemented by [`StorageService`]; tests substitute stores that stall or fail.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Generate a fresh object key for an upload owned by `owner`.
    fn object_key(&self, owner: &OwnerId, extension: &str) -> String;

    /// Write `data` under `key`, publishing the running byte count on `progress`.
    ///
    /// Implementations must stop and discard the partial object once `cancel` fires.
    async fn write(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &watch::Sender<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError>;

    /// Resolve a publicly fetchable URL for a stored object.
    async fn public_url(&self, key: &str) -> Result<String, StorageError>;

    /// Remove a stored object.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage service for uploaded images.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );
                Operator::new(builder).map(|b| b.finish())
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Generate storage key for an upload.
    ///
    /// Format: `{prefix}/{unix_millis}_{random_token}_{owner_id}.{extension}`
    #[must_use]
    pub fn generate_object_key(&self, owner: &OwnerId, extension: &str) -> String {
        let token: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(KEY_TOKEN_LEN)
            .map(char::from)
            .collect();
        let file_name = format!(
            "{}_{}_{}.{}",
            Utc::now().timestamp_millis(),
            token,
            owner,
            extension.to_ascii_lowercase()
        );

        if self.config.prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.config.prefix, file_name)
        }
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    async fn abort_writer(writer: &mut opendal::Writer, key: &str) {
        if let Err(e) = writer.abort().await {
            warn!(key, error = %e, "Failed to abort partial write");
        }
    }
}

#[async_trait]
impl BlobStore for StorageService {
    fn object_key(&self, owner: &OwnerId, extension: &str) -> String {
        self.generate_object_key(owner, extension)
    }

    async fn write(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &watch::Sender<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        let chunk_size = self.config.chunk_size;
        let mut request = self.operator.writer_with(key).chunk(chunk_size);
        // Local fs has no object metadata and rejects the option.
        if self.operator.info().full_capability().write_with_content_type {
            request = request.content_type(content_type);
        }
        let mut writer = request.await?;

        let mut written = 0u64;
        for start in (0..data.len()).step_by(chunk_size) {
            let end = (start + chunk_size).min(data.len());

            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = writer.write(data.slice(start..end)) => Some(result),
            };

            match step {
                None => {
                    Self::abort_writer(&mut writer, key).await;
                    return Err(StorageError::Cancelled { written });
                }
                Some(Err(e)) => {
                    Self::abort_writer(&mut writer, key).await;
                    return Err(e.into());
                }
                Some(Ok(())) => {
                    written += (end - start) as u64;
                    progress.send_replace(written);
                }
            }
        }

        writer.close().await?;
        debug!(key, bytes = written, provider = self.provider_name(), "Object written");
        Ok(written)
    }

    async fn public_url(&self, key: &str) -> Result<String, StorageError> {
        if let Some(base) = &self.config.public_base_url {
            return Ok(format!("{base}/{key}"));
        }

        if let StorageProvider::LocalFs { root } = &self.config.provider {
            let path = tokio::fs::canonicalize(root.join(key))
                .await
                .map_err(|e| StorageError::operation(format!("{key}: {e}")))?;
            return Url::from_file_path(&path)
                .map(|url| url.to_string())
                .map_err(|()| {
                    StorageError::operation(format!("not an absolute path: {}", path.display()))
                });
        }

        let ttl = Duration::from_secs(self.config.presign_ttl_secs);
        let presigned = self.operator.presign_read(key, ttl).await?;
        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await?;
        debug!(key, provider = self.provider_name(), "Object deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("inhamissa-storage-{}", uuid::Uuid::new_v4()))
    }

    fn local_service(config: StorageConfig) -> StorageService {
        StorageService::from_config(config).expect("should create service")
    }

    #[test]
    fn test_generate_object_key_format() {
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(temp_root())));
        let owner = OwnerId::parse("uid123").unwrap();

        let key = service.generate_object_key(&owner, "PNG");
        let file_name = key.strip_prefix("uploads/").expect("prefixed key");
        let (stem, ext) = file_name.rsplit_once('.').unwrap();
        let parts: Vec<&str> = stem.split('_').collect();

        assert_eq!(ext, "png");
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1].len(), KEY_TOKEN_LEN);
        assert_eq!(parts[2], "uid123");
    }

    #[test]
    fn test_generate_object_key_without_prefix() {
        let config = StorageConfig::new(StorageProvider::local_fs(temp_root())).with_prefix("");
        let service = local_service(config);
        let owner = OwnerId::parse("uid").unwrap();

        let key = service.generate_object_key(&owner, "jpg");
        assert!(!key.contains('/'));
        assert!(key.ends_with("_uid.jpg"));
    }

    #[test]
    fn test_object_keys_unique_within_same_millisecond() {
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(temp_root())));
        let owner = OwnerId::parse("uid").unwrap();

        let keys: std::collections::HashSet<String> = (0..500)
            .map(|_| service.generate_object_key(&owner, "png"))
            .collect();
        assert_eq!(keys.len(), 500);
    }

    #[tokio::test]
    async fn test_chunked_write_reports_bytes() {
        let config = StorageConfig::new(StorageProvider::local_fs(temp_root()))
            .with_chunk_size(StorageConfig::MIN_CHUNK_SIZE)
            .with_public_base_url("https://cdn.example.com");
        let service = local_service(config);
        let data = Bytes::from(vec![7u8; StorageConfig::MIN_CHUNK_SIZE * 3 + 10]);
        let (tx, rx) = watch::channel(0u64);

        let written = service
            .write("uploads/a.png", data.clone(), "image/png", &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, data.len() as u64);
        assert_eq!(*rx.borrow(), data.len() as u64);
        assert!(service.exists("uploads/a.png").await);
        assert_eq!(
            service.public_url("uploads/a.png").await.unwrap(),
            "https://cdn.example.com/uploads/a.png"
        );
    }

    #[tokio::test]
    async fn test_cancelled_write_stops() {
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(temp_root())));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, rx) = watch::channel(0u64);

        let err = service
            .write("uploads/b.png", Bytes::from(vec![1u8; 1024]), "image/png", &tx, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Cancelled { written: 0 }));
        assert_eq!(*rx.borrow(), 0);
    }

    #[tokio::test]
    async fn test_local_public_url_without_base_is_file_url() {
        let root = temp_root();
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(&root)));
        let (tx, _rx) = watch::channel(0u64);
        service
            .write("uploads/c.png", Bytes::from(vec![2u8; 64]), "image/png", &tx, &CancellationToken::new())
            .await
            .unwrap();

        let url = service.public_url("uploads/c.png").await.unwrap();

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.scheme(), "file");
        let path = parsed.to_file_path().unwrap();
        assert_eq!(std::fs::read(path).unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_local_public_url_for_missing_object_fails() {
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(temp_root())));
        assert!(service.public_url("uploads/missing.png").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let service = local_service(StorageConfig::new(StorageProvider::local_fs(temp_root())));
        let (tx, _rx) = watch::channel(0u64);
        service
            .write("uploads/d.png", Bytes::from(vec![4u8; 64]), "image/png", &tx, &CancellationToken::new())
            .await
            .unwrap();
        assert!(service.exists("uploads/d.png").await);

        service.delete("uploads/d.png").await.unwrap();

        assert!(!service.exists("uploads/d.png").await);
    }
}
