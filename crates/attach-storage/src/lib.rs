//! Attach Storage Library
//!
//! Storage abstraction for attachment uploads, the local filesystem backend,
//! an uploader and a purge/description server built on top of it, and signing
//! of transport parameters.
//!
//! # Storage key format
//!
//! All backends use the layout shared with the form server:
//!
//! - **Single file**: `{prefix}/{usage_id}`
//! - **Several files**: `{prefix}/{usage_id}/1` .. `{prefix}/{usage_id}/N`
//!
//! The prefix is optional. Keys must not contain `..` or a leading `/`.

pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod server;
pub mod signing;
pub mod traits;
pub mod uploader;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use server::StorageAttachmentServer;
pub use signing::{sign_params, SignedParams};
pub use traits::{Storage, StorageError, StorageResult};
pub use uploader::{ContentSource, PathSource, StorageUploader, StorageUploaderFactory};
