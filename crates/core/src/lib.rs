//! Core logic for Inhamissa.
//!
//! This crate contains the image upload pipeline and the post interaction rules.
//! Durable state lives in external services reached through the traits defined here.
//!
//! # Modules
//!
//! - `upload` - Two-provider image upload with progress, stall detection and fallback
//! - `storage` - Object storage access through Apache OpenDAL
//! - `interaction` - Likes and comments on posts

pub mod interaction;
pub mod storage;
pub mod upload;
