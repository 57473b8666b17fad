use std::fmt;

use serde::Serialize;

/// Why a session ended up in [`SessionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// Purge of previous uploads failed; the user may retry the upload.
    PurgeFailed,
    /// A file failed to transfer; the user must restart the picker.
    TransportFailure,
}

/// Lifecycle of one attachment control's upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "cause")]
pub enum SessionState {
    Idle,
    AwaitingConfirmation,
    PurgingPrevious,
    Uploading,
    Complete,
    Failed(FailureCause),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::PurgingPrevious => "purging_previous",
            Self::Uploading => "uploading",
            Self::Complete => "complete",
            Self::Failed(FailureCause::PurgeFailed) => "failed_purge",
            Self::Failed(FailureCause::TransportFailure) => "failed_transport",
        }
    }

    /// A purge or transfer is running and must finish before anything else happens.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::PurgingPrevious | Self::Uploading)
    }

    /// The user may press upload again in this state.
    pub fn accepts_upload(&self) -> bool {
        matches!(
            self,
            Self::AwaitingConfirmation | Self::Failed(FailureCause::PurgeFailed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmation_and_purge_failure_accept_upload() {
        assert!(SessionState::AwaitingConfirmation.accepts_upload());
        assert!(SessionState::Failed(FailureCause::PurgeFailed).accepts_upload());
        assert!(!SessionState::Failed(FailureCause::TransportFailure).accepts_upload());
        assert!(!SessionState::Idle.accepts_upload());
        assert!(!SessionState::Complete.accepts_upload());
    }

    #[test]
    fn serializes_failure_cause() {
        let json = serde_json::to_string(&SessionState::Failed(FailureCause::PurgeFailed)).unwrap();
        assert_eq!(json, r#"{"state":"failed","cause":"purge_failed"}"#);
    }
}
