//! Upload error types.
//!
//! Three layers: [`EncodeError`] for reading and encoding a payload,
//! [`ProviderError`] for a single provider attempt, and [`UploadError`] for what
//! the orchestrator finally reports.

use std::time::Duration;

use thiserror::Error;

use super::types::ProviderKind;

/// Errors from reading and encoding an image payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Payload absent or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload could not be read.
    #[error("failed to read image: {0}")]
    ReadFailure(String),

    /// Reading and encoding did not finish in time.
    #[error("encoding timed out after {limit:?}")]
    Timeout {
        /// Ceiling that was exceeded.
        limit: Duration,
    },

    /// The encoded result is malformed.
    #[error("encoding failed: {0}")]
    EncodingFailure(String),
}

/// Errors from a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider has no storage handle.
    #[error("storage provider not initialized")]
    NotInitialized,

    /// Payload could not be read or encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Transport-level failure.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Provider answered with a non-success status.
    #[error("provider rejected upload with status {status}: {body}")]
    ProviderRejected {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// Provider answered successfully but the body is unusable.
    #[error("invalid provider response: {0}")]
    ProviderResponseInvalid(String),

    /// Transferred bytes stopped advancing.
    #[error("transfer stalled at {transferred}/{total} bytes after {polls} unchanged polls")]
    StalledTransfer {
        /// Bytes transferred when the stall was detected.
        transferred: u64,
        /// Total bytes to transfer.
        total: u64,
        /// Consecutive polls without progress.
        polls: u32,
    },

    /// The attempt exceeded its time budget.
    #[error("timed out after {limit:?}")]
    Timeout {
        /// Ceiling that was exceeded.
        limit: Duration,
    },

    /// The object was written but no public URL could be resolved.
    #[error("object stored but URL resolution failed: {0}")]
    UrlResolutionFailure(String),

    /// The object store refused or failed the write.
    #[error("storage write failed: {0}")]
    StorageFailure(String),
}

impl ProviderError {
    /// Create a rejected error.
    #[must_use]
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::ProviderRejected {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::ProviderResponseInvalid(msg.into())
    }

    /// Create a network error.
    #[must_use]
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkFailure(msg.into())
    }

    /// Create a stalled transfer error.
    #[must_use]
    pub fn stalled(transferred: u64, total: u64, polls: u32) -> Self {
        Self::StalledTransfer {
            transferred,
            total,
            polls,
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout { limit }
    }
}

/// A provider attempt that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}: {error}")]
pub struct ProviderFailure {
    /// Provider that was attempted.
    pub provider: ProviderKind,
    /// Why it failed.
    pub error: ProviderError,
}

/// Errors reported by the upload orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The request failed validation; no provider was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every provider was attempted and failed.
    #[error("upload failed on all providers ({})", join_failures(.failures))]
    AllProvidersFailed {
        /// One entry per attempted provider, in attempt order.
        failures: Vec<ProviderFailure>,
    },

    /// The uploader could not be built from configuration.
    #[error("uploader configuration error: {0}")]
    Configuration(String),

    /// The background upload task ended without a result.
    #[error("upload task aborted: {0}")]
    Aborted(String),
}

impl UploadError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Provider failures carried by this error, empty for other kinds.
    #[must_use]
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
