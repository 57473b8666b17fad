//! Collaborator interfaces for the upload session
//!
//! The session core never talks to a page, a widget, or the network directly.
//! It drives these traits instead; hosts plug in HTTP clients, storage
//! backends, or UI bindings, and tests plug in recording mocks.

use async_trait::async_trait;

use crate::models::{
    AnalyticsEvent, CandidateFile, DescriptionMap, Notice, PurgeResponse, TransferReceipt,
    UploadRestrictions,
};
use crate::AttachError;

/// Error reported by the uploader for a single file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}: {reason}")]
pub struct TransportError {
    pub file: String,
    pub reason: String,
}

impl TransportError {
    pub fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for AttachError {
    fn from(err: TransportError) -> Self {
        AttachError::TransportFailure {
            file: err.file,
            reason: err.reason,
        }
    }
}

/// Server endpoints backing the attachment control.
#[async_trait]
pub trait AttachmentServer: Send + Sync {
    /// Render the markup for a form step.
    async fn render(&self, step: &str) -> Result<String, AttachError>;

    /// Delete every file previously uploaded for the control.
    async fn purge_previous_uploads(&self, usage_id: &str) -> Result<PurgeResponse, AttachError>;

    /// Persist the descriptions of the uploaded files.
    async fn save_descriptions(
        &self,
        usage_id: &str,
        descriptions: &DescriptionMap,
    ) -> Result<(), AttachError>;
}

/// Byte transport for one session.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Move `file` to storage under `destination`.
    async fn transfer(
        &self,
        file: &CandidateFile,
        destination: &str,
    ) -> Result<TransferReceipt, TransportError>;
}

/// Builds a fresh uploader for each session.
pub trait UploaderFactory: Send + Sync {
    fn create(&self, usage_id: &str, restrictions: &UploadRestrictions) -> Box<dyn Uploader>;
}

/// UI side effects owned by the session.
pub trait SessionUi: Send + Sync {
    /// Show a non-blocking notice.
    fn notify(&self, notice: &Notice);

    /// Enable or disable the trigger control.
    fn set_trigger_enabled(&self, enabled: bool);
}

/// Analytics back end. Calls must not block.
pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, event: &AnalyticsEvent);
}

/// Writes notices and trigger changes to the log
pub struct TracingUi;

impl SessionUi for TracingUi {
    fn notify(&self, notice: &Notice) {
        if notice.is_warning() {
            tracing::warn!(kind = ?notice.kind, "{}", notice.message);
        } else {
            tracing::info!(kind = ?notice.kind, "{}", notice.message);
        }
    }

    fn set_trigger_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "Trigger control toggled");
    }
}

/// Writes analytics events to the log
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn emit(&self, event: &AnalyticsEvent) {
        tracing::info!(
            event = event.name,
            usage_id = %event.usage_id,
            file_name = %event.file_name,
            file_size = event.file_size,
            file_type = %event.file_type,
            "Analytics event"
        );
    }
}
