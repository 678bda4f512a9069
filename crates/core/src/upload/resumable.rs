//! Resumable object storage provider.
//!
//! Writes the raw bytes to a [`BlobStore`] on a separate task while this task
//! watches the transferred byte count. A transfer whose count stops advancing is
//! cancelled as stalled; one exceeding the overall ceiling is cancelled as timed
//! out. In both cases the write is cancelled before the error is returned.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep_until, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ResumableConfig;
use super::encoder::read_payload;
use super::error::ProviderError;
use super::progress::ProgressReporter;
use super::provider::UploadProvider;
use super::types::{ProviderKind, UploadRequest, is_valid_image_url};
use crate::storage::{BlobStore, StorageError};

/// Progress once the transfer is set up.
const PROGRESS_STARTED: u8 = 10;

/// Highest progress reported from byte counts alone; 100 waits for the URL.
const PROGRESS_TRANSFER_CAP: u8 = 99;

type WriteHandle = JoinHandle<Result<u64, StorageError>>;

enum Transfer {
    Finished(Result<Result<u64, StorageError>, tokio::task::JoinError>),
    Stalled(ProviderError),
    TimedOut,
}

/// Uploads images to object storage with stall detection.
#[derive(Clone)]
pub struct ResumableStorageProvider {
    store: Option<Arc<dyn BlobStore>>,
    config: ResumableConfig,
}

impl std::fmt::Debug for ResumableStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableStorageProvider")
            .field("initialized", &self.store.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl ResumableStorageProvider {
    /// Create a provider backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, config: ResumableConfig) -> Self {
        Self {
            store: Some(store),
            config,
        }
    }

    /// A provider without storage; every attempt fails with `NotInitialized`.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self {
            store: None,
            config: ResumableConfig::default(),
        }
    }

    async fn cancel_transfer(&self, cancel: &CancellationToken, handle: &mut WriteHandle) {
        cancel.cancel();
        if timeout(self.config.cancel_grace, &mut *handle).await.is_err() {
            warn!("Transfer ignored cancellation, aborting its task");
            handle.abort();
        }
    }
}

#[async_trait]
impl UploadProvider for ResumableStorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Firebase
    }

    async fn upload(
        &self,
        request: &UploadRequest,
        progress: &ProgressReporter,
    ) -> Result<String, ProviderError> {
        let store = self.store.clone().ok_or(ProviderError::NotInitialized)?;
        let deadline = Instant::now() + self.config.timeout;

        let data = timeout_at(deadline, read_payload(request, self.config.read_timeout))
            .await
            .map_err(|_| ProviderError::timeout(self.config.timeout))??;
        let total = data.len() as u64;
        let key = store.object_key(request.owner_id(), &request.extension());
        progress.report(PROGRESS_STARTED);
        info!(key = %key, bytes = total, "Starting storage transfer");

        let (tx, rx) = watch::channel(0u64);
        let cancel = CancellationToken::new();
        // Dropping this attempt (outer timeout, aborted task) cancels the write too.
        let _cancel_on_drop = cancel.clone().drop_guard();

        let mut handle: WriteHandle = tokio::spawn({
            let store = Arc::clone(&store);
            let key = key.clone();
            let content_type = request.mime_type().to_string();
            let cancel = cancel.clone();
            async move { store.write(&key, data, &content_type, &tx, &cancel).await }
        });

        let transfer = tokio::select! {
            biased;
            joined = &mut handle => Transfer::Finished(joined),
            stalled = watch_transfer(rx, total, progress, &self.config) => Transfer::Stalled(stalled),
            () = sleep_until(deadline) => Transfer::TimedOut,
        };

        let written = match transfer {
            Transfer::Finished(Ok(Ok(written))) => written,
            Transfer::Finished(Ok(Err(e))) => {
                warn!(key = %key, error = %e, "Storage write failed");
                return Err(ProviderError::StorageFailure(e.to_string()));
            }
            Transfer::Finished(Err(e)) => {
                return Err(ProviderError::StorageFailure(format!("write task failed: {e}")));
            }
            Transfer::Stalled(err) => {
                warn!(key = %key, error = %err, "Storage transfer stalled, cancelling");
                self.cancel_transfer(&cancel, &mut handle).await;
                return Err(err);
            }
            Transfer::TimedOut => {
                warn!(key = %key, timeout = ?self.config.timeout, "Storage transfer timed out, cancelling");
                self.cancel_transfer(&cancel, &mut handle).await;
                return Err(ProviderError::timeout(self.config.timeout));
            }
        };
        progress.report(scale_progress(written, total));
        debug!(key = %key, written, "Storage transfer complete");

        let url = match timeout_at(deadline, store.public_url(&key)).await {
            Ok(Ok(url)) if is_valid_image_url(&url) => url,
            Ok(Ok(url)) => {
                let err = ProviderError::UrlResolutionFailure(format!("not an absolute URL: {url}"));
                return Err(discard_object(store.as_ref(), &key, err).await);
            }
            Ok(Err(e)) => {
                let err = ProviderError::UrlResolutionFailure(e.to_string());
                return Err(discard_object(store.as_ref(), &key, err).await);
            }
            Err(_) => {
                let err = ProviderError::timeout(self.config.timeout);
                return Err(discard_object(store.as_ref(), &key, err).await);
            }
        };

        progress.report(100);
        info!(key = %key, url = %url, "Image uploaded to storage");
        Ok(url)
    }
}

/// Remove an object nobody can reach, then hand back the error that caused it.
async fn discard_object(store: &dyn BlobStore, key: &str, err: ProviderError) -> ProviderError {
    warn!(key, error = %err, "No usable URL for stored object, deleting it");
    if let Err(e) = store.delete(key).await {
        warn!(key, error = %e, "Failed to delete unreachable object");
    }
    err
}

/// Report progress as bytes arrive and resolve once the transfer stalls.
///
/// Resolves only when the count stays below `total` for too many polls.
async fn watch_transfer(
    mut rx: watch::Receiver<u64>,
    total: u64,
    progress: &ProgressReporter,
    config: &ResumableConfig,
) -> ProviderError {
    let mut ticks = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    let mut high_water = 0u64;
    let mut unchanged = 0u32;
    let mut writer_open = true;

    loop {
        tokio::select! {
            changed = rx.changed(), if writer_open => {
                if changed.is_ok() {
                    progress.report(scale_progress(*rx.borrow_and_update(), total));
                } else {
                    writer_open = false;
                }
            }
            _ = ticks.tick() => {
                let current = *rx.borrow();
                if current > high_water {
                    high_water = current;
                    unchanged = 0;
                } else if current < total {
                    unchanged += 1;
                    if unchanged > config.max_stalled_polls {
                        return ProviderError::stalled(current, total, unchanged);
                    }
                }
            }
        }
    }
}

/// Map transferred bytes onto the 10..=99 band.
#[must_use]
pub fn scale_progress(transferred: u64, total: u64) -> u8 {
    if total == 0 {
        return PROGRESS_STARTED;
    }
    let transferred = transferred.min(total);
    let scaled = u64::from(PROGRESS_STARTED) + transferred * 90 / total;
    u8::try_from(scaled.min(u64::from(PROGRESS_TRANSFER_CAP))).unwrap_or(PROGRESS_TRANSFER_CAP)
}
