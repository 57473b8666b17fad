//! Overwrite guard
//!
//! Runs at the "before upload" interception point. When the control already
//! holds files from an earlier submission the user has to press upload twice:
//! the first press only warns, the second purges the previous files and lets
//! the batch through. No purge call is ever made on the first press.
//!
//! ```text
//! NoPriorUploads ──gate──▶ Cleared
//! NeedsFirstConfirmation ──gate──▶ NeedsPurge            (block, warn)
//! NeedsPurge ──gate, purge ok──▶ Cleared                 (proceed)
//! NeedsPurge ──gate, purge failed──▶ NeedsFirstConfirmation (block, warn)
//! ```

use attach_core::models::{CandidateFile, Notice, NoticeKind};
use attach_core::naming::{assign, Assignments};
use attach_core::{AttachError, AttachmentServer, ErrorMetadata, SessionUi};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    NoPriorUploads,
    NeedsFirstConfirmation,
    NeedsPurge,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    ConfirmationRequired,
    PurgeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Upload may start with these destination names.
    Proceed(Assignments),
    Block(BlockReason),
}

#[derive(Debug)]
pub struct OverwriteGuard {
    usage_id: String,
    state: GuardState,
}

impl OverwriteGuard {
    pub fn new(usage_id: impl Into<String>, has_prior_uploads: bool) -> Self {
        Self {
            usage_id: usage_id.into(),
            state: Self::initial_state(has_prior_uploads),
        }
    }

    fn initial_state(has_prior_uploads: bool) -> GuardState {
        if has_prior_uploads {
            GuardState::NeedsFirstConfirmation
        } else {
            GuardState::NoPriorUploads
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// The next [`gate`](Self::gate) call will issue the purge.
    pub fn purge_pending(&self) -> bool {
        self.state == GuardState::NeedsPurge
    }

    pub async fn gate(
        &mut self,
        batch: &[CandidateFile],
        server: &dyn AttachmentServer,
        ui: &dyn SessionUi,
    ) -> GateDecision {
        match self.state {
            GuardState::NoPriorUploads | GuardState::Cleared => {
                self.state = GuardState::Cleared;
                GateDecision::Proceed(assign(&self.usage_id, batch))
            }
            GuardState::NeedsFirstConfirmation => {
                self.state = GuardState::NeedsPurge;
                tracing::info!(usage_id = %self.usage_id, "Overwrite confirmation required");
                ui.notify(&Notice::new(
                    NoticeKind::ConfirmationRequired,
                    AttachError::ConfirmationRequired.client_message(),
                ));
                GateDecision::Block(BlockReason::ConfirmationRequired)
            }
            GuardState::NeedsPurge => self.purge(batch, server, ui).await,
        }
    }

    async fn purge(
        &mut self,
        batch: &[CandidateFile],
        server: &dyn AttachmentServer,
        ui: &dyn SessionUi,
    ) -> GateDecision {
        tracing::info!(usage_id = %self.usage_id, "Purging previous uploads");

        let failure = match server.purge_previous_uploads(&self.usage_id).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(
                response
                    .msg
                    .unwrap_or_else(|| "server rejected the purge".to_string()),
            ),
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => {
                self.state = GuardState::Cleared;
                GateDecision::Proceed(assign(&self.usage_id, batch))
            }
            Some(reason) => {
                self.state = GuardState::NeedsFirstConfirmation;
                tracing::warn!(usage_id = %self.usage_id, reason = %reason, "Purge failed");
                ui.notify(&Notice::new(
                    NoticeKind::PurgeFailed,
                    AttachError::PurgeFailed(reason.clone()).client_message(),
                ));
                GateDecision::Block(BlockReason::PurgeFailed(reason))
            }
        }
    }

    /// The user closed the widget before the purge ran.
    pub fn dismiss(&mut self) {
        if self.state == GuardState::NeedsPurge {
            self.state = GuardState::NeedsFirstConfirmation;
        }
    }

    /// A batch completed; the next round needs a fresh decision.
    pub fn reset(&mut self) {
        self.state = GuardState::NoPriorUploads;
    }

    /// Start over from server state (page reload, explicit reopen).
    pub fn rearm(&mut self, has_prior_uploads: bool) {
        self.state = Self::initial_state(has_prior_uploads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockServer, RecordingUi};
    use attach_core::models::PurgeResponse;

    fn batch(n: usize) -> Vec<CandidateFile> {
        (0..n)
            .map(|i| CandidateFile::new(format!("f{}.png", i), 1, "image/png"))
            .collect()
    }

    #[tokio::test]
    async fn no_prior_uploads_proceeds_without_purge() {
        let server = MockServer::new();
        let ui = RecordingUi::new();
        let mut guard = OverwriteGuard::new("block", false);

        let decision = guard.gate(&batch(1), &server, &ui).await;

        assert!(matches!(decision, GateDecision::Proceed(_)));
        assert_eq!(guard.state(), GuardState::Cleared);
        assert_eq!(server.purge_calls(), 0);
    }

    #[tokio::test]
    async fn first_gate_blocks_without_network_call() {
        let server = MockServer::new();
        let ui = RecordingUi::new();
        let mut guard = OverwriteGuard::new("block", true);

        let decision = guard.gate(&batch(2), &server, &ui).await;

        assert_eq!(
            decision,
            GateDecision::Block(BlockReason::ConfirmationRequired)
        );
        assert_eq!(guard.state(), GuardState::NeedsPurge);
        assert_eq!(server.purge_calls(), 0);
        assert_eq!(ui.notice_kinds(), vec![NoticeKind::ConfirmationRequired]);
    }

    #[tokio::test]
    async fn second_gate_purges_once_and_renames() {
        let server = MockServer::new();
        let ui = RecordingUi::new();
        let mut guard = OverwriteGuard::new("block", true);
        let files = batch(2);

        guard.gate(&files, &server, &ui).await;
        let decision = guard.gate(&files, &server, &ui).await;

        match decision {
            GateDecision::Proceed(assignments) => {
                assert_eq!(assignments.destinations(), vec!["1", "2"]);
            }
            other => panic!("expected proceed, got {:?}", other),
        }
        assert_eq!(server.purge_calls(), 1);
        assert_eq!(guard.state(), GuardState::Cleared);
    }

    #[tokio::test]
    async fn failed_purge_rearms_first_confirmation() {
        let server = MockServer::new();
        server.queue_purge(Ok(PurgeResponse::failed("locked")));
        let ui = RecordingUi::new();
        let mut guard = OverwriteGuard::new("block", true);
        let files = batch(1);

        guard.gate(&files, &server, &ui).await;
        let decision = guard.gate(&files, &server, &ui).await;

        assert_eq!(
            decision,
            GateDecision::Block(BlockReason::PurgeFailed("locked".to_string()))
        );
        assert_eq!(guard.state(), GuardState::NeedsFirstConfirmation);

        // a retry starts with a confirmation again, no automatic purge
        guard.gate(&files, &server, &ui).await;
        assert_eq!(server.purge_calls(), 1);
    }

    #[tokio::test]
    async fn purge_transport_error_is_a_failed_purge() {
        let server = MockServer::new();
        server.queue_purge(Err("connection reset".to_string()));
        let ui = RecordingUi::new();
        let mut guard = OverwriteGuard::new("block", true);

        guard.gate(&batch(1), &server, &ui).await;
        let decision = guard.gate(&batch(1), &server, &ui).await;

        assert!(matches!(
            decision,
            GateDecision::Block(BlockReason::PurgeFailed(_))
        ));
        assert!(ui.notice_kinds().contains(&NoticeKind::PurgeFailed));
    }

    #[test]
    fn dismiss_before_purge_requires_new_confirmation() {
        let mut guard = OverwriteGuard::new("block", true);
        guard.state = GuardState::NeedsPurge;
        guard.dismiss();
        assert_eq!(guard.state(), GuardState::NeedsFirstConfirmation);

        guard.reset();
        assert_eq!(guard.state(), GuardState::NoPriorUploads);
        guard.rearm(true);
        assert_eq!(guard.state(), GuardState::NeedsFirstConfirmation);
    }
}
