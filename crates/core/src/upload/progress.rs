//! Progress reporting and the handle for a running upload.
//!
//! Progress is pushed over an unbounded channel so a slow consumer never holds up
//! the upload. Within one provider attempt the reported percentage only grows;
//! the orchestrator emits a single `0` when it switches to the fallback provider.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::UploadError;
use super::types::{ProviderKind, UploadOutcome};

/// One progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Provider attempt the update belongs to.
    pub provider: ProviderKind,
    /// Completion percentage in `[0, 100]`.
    pub percent: u8,
}

/// Per-attempt progress publisher.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
    provider: ProviderKind,
    last: AtomicU8,
}

impl ProgressReporter {
    /// Create a reporter for one attempt of `provider`.
    #[must_use]
    pub fn new(tx: Option<mpsc::UnboundedSender<ProgressEvent>>, provider: ProviderKind) -> Self {
        Self {
            tx,
            provider,
            last: AtomicU8::new(0),
        }
    }

    /// A reporter that drops every update.
    #[must_use]
    pub fn disabled(provider: ProviderKind) -> Self {
        Self::new(None, provider)
    }

    /// Report `percent`, clamped to 100. Values not above the last report are dropped.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent > previous {
            self.send(percent);
        }
    }

    /// Announce a fresh attempt: emits `0` and restarts the monotonic sequence.
    pub fn reset(&self) {
        self.last.store(0, Ordering::Release);
        self.send(0);
    }

    /// Highest percentage reported so far.
    #[must_use]
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }

    fn send(&self, percent: u8) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(ProgressEvent {
                provider: self.provider,
                percent,
            });
        }
    }
}

/// Handle to an upload running on its own task.
///
/// Drain [`UploadTask::next_progress`] until it returns `None`, then await
/// [`UploadTask::outcome`]. The progress stream ends when the upload finishes.
#[derive(Debug)]
pub struct UploadTask {
    progress: mpsc::UnboundedReceiver<ProgressEvent>,
    handle: JoinHandle<Result<UploadOutcome, UploadError>>,
}

impl UploadTask {
    pub(crate) fn new(
        progress: mpsc::UnboundedReceiver<ProgressEvent>,
        handle: JoinHandle<Result<UploadOutcome, UploadError>>,
    ) -> Self {
        Self { progress, handle }
    }

    /// Next progress update, or `None` once the upload has finished.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// Wait for the upload result.
    pub async fn outcome(self) -> Result<UploadOutcome, UploadError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(UploadError::Aborted("cancelled".to_string())),
            Err(e) => Err(UploadError::Aborted(e.to_string())),
        }
    }

    /// Cancel the upload. [`UploadTask::outcome`] then reports `Aborted`.
    pub fn abort(&self) {
        self.handle.abort();
    }
}
