//! Fallback orchestrator.
//!
//! Validates a request, picks the provider order by payload size, and makes at
//! most one attempt per provider. The first success wins; when both fail the
//! caller gets every failure in attempt order.

use std::sync::Arc;

use inhamissa_shared::AppConfig;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::{ImgbbConfig, ResumableConfig, UploaderConfig};
use super::error::{ProviderError, ProviderFailure, UploadError};
use super::imgbb::ImgbbProvider;
use super::progress::{ProgressEvent, ProgressReporter, UploadTask};
use super::provider::UploadProvider;
use super::resumable::ResumableStorageProvider;
use super::types::{UploadOutcome, UploadRequest, is_valid_image_url};
use crate::storage::{StorageConfig, StorageService};

/// Uploads images through the fast hosting API and object storage.
///
/// Cheap to clone; clones share the providers.
#[derive(Clone)]
pub struct Uploader {
    config: UploaderConfig,
    fast: Arc<dyn UploadProvider>,
    storage: Arc<dyn UploadProvider>,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .field("fast", &self.fast.kind())
            .field("storage", &self.storage.kind())
            .finish()
    }
}

impl Uploader {
    /// Create an uploader from explicit providers.
    #[must_use]
    pub fn new(
        config: UploaderConfig,
        fast: Arc<dyn UploadProvider>,
        storage: Arc<dyn UploadProvider>,
    ) -> Self {
        Self {
            config,
            fast,
            storage,
        }
    }

    /// Build the uploader described by application configuration.
    ///
    /// A missing or unusable storage section leaves the storage provider
    /// uninitialized; its attempts then fail with `NotInitialized`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the hosting API client cannot be built.
    pub fn from_app_config(app: &AppConfig) -> Result<Self, UploadError> {
        let fast = ImgbbProvider::new(ImgbbConfig::from_settings(&app.imgbb, &app.upload))?;

        let storage = match &app.storage {
            Some(settings) => match StorageService::from_config(StorageConfig::from_settings(settings)) {
                Ok(service) => {
                    info!(provider = service.provider_name(), "Object storage initialized");
                    ResumableStorageProvider::new(
                        Arc::new(service),
                        ResumableConfig::from_settings(settings, &app.upload),
                    )
                }
                Err(e) => {
                    warn!(error = %e, "Object storage unavailable, uploads will use the hosting API only");
                    ResumableStorageProvider::uninitialized()
                }
            },
            None => {
                info!("No object storage configured");
                ResumableStorageProvider::uninitialized()
            }
        };

        Ok(Self::new(
            UploaderConfig::from_settings(&app.upload),
            Arc::new(fast),
            Arc::new(storage),
        ))
    }

    /// The orchestrator policy.
    #[must_use]
    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Providers in attempt order for a payload of `byte_len` bytes.
    #[must_use]
    pub fn provider_order(&self, byte_len: u64) -> [&Arc<dyn UploadProvider>; 2] {
        if byte_len >= self.config.direct_storage_threshold {
            [&self.storage, &self.fast]
        } else {
            [&self.fast, &self.storage]
        }
    }

    /// Start an upload on its own task.
    #[must_use]
    pub fn start(&self, request: UploadRequest) -> UploadTask {
        let (tx, rx) = mpsc::unbounded_channel();
        let uploader = self.clone();
        let handle = tokio::spawn(async move { uploader.run(&request, Some(tx)).await });
        UploadTask::new(rx, handle)
    }

    /// Upload without progress reporting.
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
        self.run(request, None).await
    }

    /// Upload, calling `on_progress` with each percentage as it is reported.
    pub async fn upload_image<F>(
        &self,
        request: UploadRequest,
        mut on_progress: F,
    ) -> Result<UploadOutcome, UploadError>
    where
        F: FnMut(u8),
    {
        let mut task = self.start(request);
        while let Some(event) = task.next_progress().await {
            on_progress(event.percent);
        }
        task.outcome().await
    }

    async fn run(
        &self,
        request: &UploadRequest,
        progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<UploadOutcome, UploadError> {
        if let Err(e) = request.validate(self.config.max_file_size) {
            debug!(owner_id = %request.owner_id(), error = %e, "Upload request rejected");
            return Err(e);
        }

        let mut failures = Vec::with_capacity(2);
        for (attempt, provider) in self.provider_order(request.byte_len()).into_iter().enumerate() {
            let kind = provider.kind();
            let reporter = ProgressReporter::new(progress.clone(), kind);
            if attempt > 0 {
                info!(provider = %kind, "Falling back to next provider");
                reporter.reset();
            }

            info!(
                provider = %kind,
                owner_id = %request.owner_id(),
                bytes = request.byte_len(),
                "Upload attempt started"
            );
            let result = match timeout(self.config.attempt_timeout, provider.upload(request, &reporter)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(self.config.attempt_timeout)),
            };
            let result = result.and_then(|url| {
                if is_valid_image_url(&url) {
                    Ok(url)
                } else {
                    Err(ProviderError::invalid_response(format!(
                        "not an absolute URL: {url}"
                    )))
                }
            });

            match result {
                Ok(url) => {
                    info!(provider = %kind, url = %url, "Upload succeeded");
                    return Ok(UploadOutcome::new(url, kind));
                }
                Err(error) => {
                    warn!(provider = %kind, error = %error, "Upload attempt failed");
                    failures.push(ProviderFailure {
                        provider: kind,
                        error,
                    });
                }
            }
        }

        let err = UploadError::AllProvidersFailed { failures };
        error!(owner_id = %request.owner_id(), error = %err, "Upload failed on all providers");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inhamissa_shared::OwnerId;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::upload::types::ProviderKind;

    /// Reports its milestones, then returns a fixed result.
    struct ScriptedProvider {
        kind: ProviderKind,
        milestones: Vec<u8>,
        result: Option<Result<String, ProviderError>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn ok(kind: ProviderKind, url: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                milestones: vec![10, 100],
                result: Some(Ok(url.to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(kind: ProviderKind, error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                kind,
                milestones: vec![10],
                result: Some(Err(error)),
                calls: AtomicUsize::new(0),
            })
        }

        /// Never finishes.
        fn hanging(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                milestones: vec![10],
                result: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UploadProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn upload(
            &self,
            _request: &UploadRequest,
            progress: &ProgressReporter,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for &m in &self.milestones {
                progress.report(m);
            }
            match &self.result {
                Some(result) => result.clone(),
                None => std::future::pending().await,
            }
        }
    }

    fn request(len: usize, mime: &str) -> UploadRequest {
        UploadRequest::from_bytes(vec![1u8; len], mime, OwnerId::parse("user-9").unwrap())
    }

    fn uploader(fast: Arc<ScriptedProvider>, storage: Arc<ScriptedProvider>) -> Uploader {
        let config = UploaderConfig::default()
            .with_max_file_size(32 * 1024 * 1024)
            .with_direct_storage_threshold(5 * 1024 * 1024);
        Uploader::new(config, fast, storage)
    }

    #[rstest]
    #[case(1024, ProviderKind::Imgbb)]
    #[case(5 * 1024 * 1024 - 1, ProviderKind::Imgbb)]
    #[case(5 * 1024 * 1024, ProviderKind::Firebase)]
    #[case(10 * 1024 * 1024, ProviderKind::Firebase)]
    fn test_provider_order(#[case] len: u64, #[case] first: ProviderKind) {
        let up = uploader(
            ScriptedProvider::ok(ProviderKind::Imgbb, "https://a.test/1"),
            ScriptedProvider::ok(ProviderKind::Firebase, "https://b.test/1"),
        );
        let [p, q] = up.provider_order(len);
        assert_eq!(p.kind(), first);
        assert_eq!(q.kind(), first.other());
    }

    #[tokio::test]
    async fn test_first_provider_success() {
        let fast = ScriptedProvider::ok(ProviderKind::Imgbb, "https://i.ibb.co/x.png");
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://cdn.test/x.png");
        let up = uploader(fast.clone(), storage.clone());

        let outcome = up.upload(&request(1024, "image/png")).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.method, ProviderKind::Imgbb);
        assert_eq!(outcome.url, "https://i.ibb.co/x.png");
        assert_eq!((fast.calls(), storage.calls()), (1, 0));
    }

    #[tokio::test]
    async fn test_fallback_resets_progress() {
        let fast = ScriptedProvider::failing(ProviderKind::Imgbb, ProviderError::rejected(503, "down"));
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://cdn.test/y.png");
        let up = uploader(fast.clone(), storage.clone());

        let mut seen = Vec::new();
        let outcome = up
            .upload_image(request(1024, "image/jpeg"), |p| seen.push(p))
            .await
            .unwrap();

        assert_eq!(outcome.method, ProviderKind::Firebase);
        assert_eq!(seen, vec![10, 0, 10, 100]);
        assert_eq!(seen.iter().filter(|&&p| p == 0).count(), 1);
        assert_eq!((fast.calls(), storage.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_both_fail_aggregates_in_attempt_order() {
        let fast = ScriptedProvider::failing(ProviderKind::Imgbb, ProviderError::network("reset"));
        let storage = ScriptedProvider::failing(ProviderKind::Firebase, ProviderError::NotInitialized);
        let up = uploader(fast.clone(), storage.clone());

        let err = up.upload(&request(6 * 1024 * 1024, "image/png")).await.unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].provider, ProviderKind::Firebase);
        assert_eq!(failures[0].error, ProviderError::NotInitialized);
        assert_eq!(failures[1].provider, ProviderKind::Imgbb);
        assert_eq!((fast.calls(), storage.calls()), (1, 1));
    }

    #[rstest]
    #[case(1024, "text/plain")]
    #[case(0, "image/png")]
    #[case(32 * 1024 * 1024 + 1, "image/png")]
    #[tokio::test]
    async fn test_invalid_requests_touch_no_provider(#[case] len: usize, #[case] mime: &str) {
        let fast = ScriptedProvider::ok(ProviderKind::Imgbb, "https://a.test/1");
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://b.test/1");
        let up = uploader(fast.clone(), storage.clone());

        let err = up.upload(&request(len, mime)).await.unwrap_err();

        assert!(matches!(err, UploadError::InvalidInput(_)));
        assert_eq!((fast.calls(), storage.calls()), (0, 0));
    }

    #[tokio::test]
    async fn test_relative_url_counts_as_failure() {
        let fast = ScriptedProvider::ok(ProviderKind::Imgbb, "/relative.png");
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://cdn.test/z.png");
        let up = uploader(fast, storage);

        let outcome = up.upload(&request(1024, "image/png")).await.unwrap();
        assert_eq!(outcome.method, ProviderKind::Firebase);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_hits_backstop() {
        let fast = ScriptedProvider::hanging(ProviderKind::Imgbb);
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://cdn.test/h.png");
        let config = UploaderConfig::default().with_attempt_timeout(Duration::from_secs(5));
        let up = Uploader::new(config, fast, storage);
        let started = tokio::time::Instant::now();

        let outcome = up.upload(&request(1024, "image/png")).await.unwrap();

        assert_eq!(outcome.method, ProviderKind::Firebase);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_start_streams_provider_events() {
        let fast = ScriptedProvider::ok(ProviderKind::Imgbb, "https://i.ibb.co/s.png");
        let storage = ScriptedProvider::ok(ProviderKind::Firebase, "https://cdn.test/s.png");
        let up = uploader(fast, storage);

        let mut task = up.start(request(2048, "image/gif"));
        let mut events = Vec::new();
        while let Some(event) = task.next_progress().await {
            events.push(event);
        }

        assert!(events.iter().all(|e| e.provider == ProviderKind::Imgbb));
        assert_eq!(events.last().map(|e| e.percent), Some(100));
        assert_eq!(task.outcome().await.unwrap().method, ProviderKind::Imgbb);
    }

    #[tokio::test]
    async fn test_aborted_task() {
        let fast = ScriptedProvider::hanging(ProviderKind::Imgbb);
        let storage = ScriptedProvider::hanging(ProviderKind::Firebase);
        let up = uploader(fast, storage);

        let task = up.start(request(1024, "image/png"));
        task.abort();

        assert!(matches!(task.outcome().await, Err(UploadError::Aborted(_))));
    }
}
