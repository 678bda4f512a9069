//! Object storage for uploaded images using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.writer_with("key")      │ op.presign_read("key", duration)   │
//! │   .chunk(n) / write / close│ op.stat("key")                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are chunked so callers can observe bytes moving and cancel a transfer
//! between chunks. Without a public base URL, local filesystem objects resolve to
//! `file://` URLs.

mod config;
mod error;
mod service;

pub use config::StorageConfig;
pub use error::StorageError;
pub use inhamissa_shared::StorageProvider;
pub use service::{BlobStore, StorageService};
