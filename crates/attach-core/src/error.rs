//! Error types module
//!
//! All failures an upload session can surface are unified under [`AttachError`].
//! The first six variants are the user-facing kinds a host form reacts to; the
//! rest are plumbing errors raised by collaborators.

use std::io;

use crate::validation::PolicyViolation;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like policy rejections
    Debug,
    /// Warning level - for recoverable issues the user has to act on
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "PURGE_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can recover by repeating an action in the same session
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("Policy violation: {0}")]
    PolicyViolation(#[from] PolicyViolation),

    #[error("Confirmation required before overwriting previous uploads")]
    ConfirmationRequired,

    #[error("Purge of previous uploads failed: {0}")]
    PurgeFailed(String),

    #[error("Missing description for: {}", files.join(", "))]
    MissingDescription { files: Vec<String> },

    #[error("Transport failure for {file}: {reason}")]
    TransportFailure { file: String, reason: String },

    #[error("Failed to load form fragment: {0}")]
    RenderLoadFailure(String),

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Attachment control is locked")]
    SessionLocked,

    #[error("Unknown file: {0}")]
    UnknownFile(String),

    #[error("Invalid destination name: {0}")]
    InvalidDestination(String),

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AttachError {
    fn from(err: anyhow::Error) -> Self {
        AttachError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AttachError {
    fn from(err: io::Error) -> Self {
        AttachError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AttachError {
    fn from(err: serde_json::Error) -> Self {
        AttachError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn attach_error_static_metadata(
    err: &AttachError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AttachError::PolicyViolation(_) => (
            "POLICY_VIOLATION",
            true,
            Some("Select different files"),
            LogLevel::Debug,
        ),
        AttachError::ConfirmationRequired => (
            "CONFIRMATION_REQUIRED",
            true,
            Some("Upload again to replace the previously uploaded files"),
            LogLevel::Debug,
        ),
        AttachError::PurgeFailed(_) => (
            "PURGE_FAILED",
            true,
            Some("Try the upload again"),
            LogLevel::Warn,
        ),
        AttachError::MissingDescription { .. } => (
            "MISSING_DESCRIPTION",
            true,
            Some("Enter a description for every file"),
            LogLevel::Debug,
        ),
        AttachError::TransportFailure { .. } => (
            "TRANSPORT_FAILURE",
            false,
            Some("Select your files again and restart the upload"),
            LogLevel::Error,
        ),
        AttachError::RenderLoadFailure(_) => (
            "RENDER_LOAD_FAILURE",
            false,
            Some("Reload the page"),
            LogLevel::Error,
        ),
        AttachError::InvalidTransition { .. } => (
            "INVALID_TRANSITION",
            false,
            None,
            LogLevel::Debug,
        ),
        AttachError::SessionLocked => (
            "SESSION_LOCKED",
            false,
            Some("Files have already been submitted"),
            LogLevel::Debug,
        ),
        AttachError::UnknownFile(_) => ("UNKNOWN_FILE", false, None, LogLevel::Debug),
        AttachError::InvalidDestination(_) => (
            "INVALID_DESTINATION",
            false,
            None,
            LogLevel::Error,
        ),
        AttachError::Remote(_) => (
            "REMOTE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        AttachError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AttachError::Config(_) => ("CONFIG_ERROR", false, None, LogLevel::Error),
        AttachError::Internal(_) | AttachError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AttachError {
    fn error_code(&self) -> &'static str {
        attach_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        attach_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        attach_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AttachError::PolicyViolation(violation) => violation.to_string(),
            AttachError::ConfirmationRequired => {
                "Uploading will replace the files you uploaded before. Upload again to continue."
                    .to_string()
            }
            AttachError::PurgeFailed(_) => {
                "Previously uploaded files could not be removed. Please try again.".to_string()
            }
            AttachError::MissingDescription { .. } => {
                "Every file needs a description before it can be uploaded.".to_string()
            }
            AttachError::TransportFailure { file, .. } => {
                format!("{} could not be uploaded.", file)
            }
            AttachError::RenderLoadFailure(_) => {
                "This section could not be loaded.".to_string()
            }
            AttachError::SessionLocked => "Your files have already been uploaded.".to_string(),
            AttachError::Internal(_) | AttachError::InternalWithSource { .. } => {
                "An unexpected error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        attach_error_static_metadata(self).3
    }
}
