//! Likes and comments on posts.
//!
//! Thin business rules over a [`DocumentStore`]: toggling a like keeps the
//! counter and the `liked_by` list in step, and adding a comment bumps the
//! post's comment counter.

mod error;
mod service;
mod types;

pub use error::InteractionError;
pub use service::{DocumentStore, InteractionService};
pub use types::{
    Author, Comment, DEFAULT_AUTHOR_NAME, LikeState, LikeUpdate, MAX_COMMENT_LEN, NewComment, Post,
};
