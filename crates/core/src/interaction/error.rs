//! Interaction error types.

use inhamissa_shared::PostId;
use thiserror::Error;

/// Like and comment operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    /// The post does not exist (anymore).
    #[error("post not found: {0}")]
    PostNotFound(PostId),

    /// Comment content is empty after trimming.
    #[error("comment is empty")]
    EmptyComment,

    /// Comment content exceeds the maximum length.
    #[error("comment too long: {len} characters exceeds maximum {max}")]
    CommentTooLong {
        /// Length after trimming, in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Any other document store failure.
    #[error("document store error: {0}")]
    Store(String),
}

impl InteractionError {
    /// Create a post not found error.
    #[must_use]
    pub fn post_not_found(id: &PostId) -> Self {
        Self::PostNotFound(id.clone())
    }

    /// Create a document store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
