//! Post and comment types.

use chrono::{DateTime, Utc};
use inhamissa_shared::{CommentId, OwnerId, PostId};
use serde::{Deserialize, Serialize};

/// Author name stored when the author has none.
pub const DEFAULT_AUTHOR_NAME: &str = "Usuário";

/// Maximum comment length in characters, after trimming.
pub const MAX_COMMENT_LEN: usize = 500;

/// The interaction-relevant part of a post document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Document ID.
    pub id: PostId,
    /// Like counter.
    #[serde(default)]
    pub likes: u64,
    /// Users who liked the post.
    #[serde(default)]
    pub liked_by: Vec<OwnerId>,
    /// Comment counter.
    #[serde(default)]
    pub comments: u64,
}

impl Post {
    /// Create a post with no likes or comments.
    #[must_use]
    pub fn new(id: PostId) -> Self {
        Self {
            id,
            likes: 0,
            liked_by: Vec::new(),
            comments: 0,
        }
    }

    /// Whether `user` is in the post's `liked_by` list.
    #[must_use]
    pub fn is_liked_by(&self, user: &OwnerId) -> bool {
        self.liked_by.contains(user)
    }
}

/// A stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Document ID.
    pub id: CommentId,
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Trimmed content.
    pub content: String,
    /// Author user ID.
    pub author_id: OwnerId,
    /// Author display name.
    pub author_name: String,
    /// Author avatar.
    #[serde(rename = "authorPhotoURL")]
    pub author_photo_url: Option<String>,
    /// Server timestamp; `None` until the store has assigned it.
    pub created_at: Option<DateTime<Utc>>,
}

/// A comment about to be stored. The store assigns the ID and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Trimmed content.
    pub content: String,
    /// Author user ID.
    pub author_id: OwnerId,
    /// Author display name.
    pub author_name: String,
    /// Author avatar.
    pub author_photo_url: Option<String>,
}

/// The signed-in user acting on a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// User ID.
    pub id: OwnerId,
    /// Display name, if the profile has one.
    pub name: Option<String>,
    /// Avatar URL, if the profile has one.
    pub photo_url: Option<String>,
}

impl Author {
    /// An author known only by ID.
    #[must_use]
    pub fn new(id: OwnerId) -> Self {
        Self {
            id,
            name: None,
            photo_url: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Name stored on comments: the profile name, or the default when blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AUTHOR_NAME)
    }
}

/// A change to a post's like state, applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeUpdate {
    /// `+1` to like, `-1` to unlike.
    pub delta: i64,
    /// The full `liked_by` list after the change.
    pub liked_by: Vec<OwnerId>,
}

/// Like state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    /// Whether the user now likes the post.
    pub liked: bool,
    /// Like count after the toggle.
    pub likes: u64,
}
