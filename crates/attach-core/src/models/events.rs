use serde::Serialize;

use crate::constants::UPLOAD_FILE_EVENT;
use crate::models::CandidateFile;

/// Category of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    PolicyViolation,
    ConfirmationRequired,
    PurgeFailed,
    MissingDescription,
    TransportFailure,
    Uploaded,
}

/// Non-blocking message surfaced next to the attachment control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        !matches!(self.kind, NoticeKind::Uploaded)
    }
}

/// Fire-and-forget analytics record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub name: &'static str,
    pub usage_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
}

impl AnalyticsEvent {
    pub fn file_uploaded(usage_id: &str, file: &CandidateFile) -> Self {
        Self {
            name: UPLOAD_FILE_EVENT,
            usage_id: usage_id.to_string(),
            file_name: file.name.clone(),
            file_size: file.size_bytes,
            file_type: file.mime_type.clone(),
        }
    }
}
