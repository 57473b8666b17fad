//! Attach Core Library
//!
//! Domain models, error types, configuration, policy validation, and
//! destination naming shared by every attachment upload component.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;
pub mod naming;
pub mod validation;

// Re-export commonly used types
pub use config::{AttachConfig, SignatureDigest, TransportCredentials};
pub use error::{AttachError, ErrorMetadata, LogLevel};
pub use hooks::{
    AnalyticsSink, AttachmentServer, SessionUi, TracingAnalytics, TracingUi, TransportError,
    Uploader, UploaderFactory,
};
pub use naming::{assign, Assignment, Assignments};
pub use validation::{Admission, PolicyViolation, Validator};
