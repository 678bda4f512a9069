//! Shared identifiers and configuration for Inhamissa.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for users, posts and comments
//! - Layered configuration for the upload pipeline and object storage

pub mod config;
pub mod types;

pub use config::{AppConfig, ImgbbSettings, StorageProvider, StorageSettings, UploadSettings};
pub use types::{CommentId, IdError, OwnerId, PostId};
