//! Test helpers for session unit and scenario tests
//!
//! Recording mocks for every collaborator plus [`SessionFixture`], which wires
//! them into a [`SessionCoordinator`] without any network or storage.

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use attach_core::models::{ControlState, TriggerAttributes, UploadLimits};

use crate::coordinator::{SessionCoordinator, SessionDeps};

pub const TEST_USAGE_ID: &str = "block-v1:course+type@attachment+block@1";

/// Shared mocks for one test.
pub struct SessionFixture {
    pub journal: Journal,
    pub server: Arc<MockServer>,
    pub uploaders: Arc<MockUploaderFactory>,
    pub ui: Arc<RecordingUi>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl SessionFixture {
    pub fn new() -> Self {
        let journal = Journal::new();
        Self {
            server: Arc::new(MockServer::with_journal(journal.clone())),
            uploaders: Arc::new(MockUploaderFactory::with_journal(journal.clone())),
            ui: Arc::new(RecordingUi::new()),
            analytics: Arc::new(RecordingAnalytics::new()),
            journal,
        }
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            server: self.server.clone(),
            uploaders: self.uploaders.clone(),
            ui: self.ui.clone(),
            analytics: self.analytics.clone(),
        }
    }

    /// Enabled `upload-type=image` control.
    pub fn image_control(has_prior_uploads: bool) -> ControlState {
        ControlState {
            attributes: TriggerAttributes::new("image"),
            has_prior_uploads,
            trigger_enabled: true,
        }
    }

    pub fn coordinator_for(&self, control: &ControlState) -> SessionCoordinator {
        self.coordinator_with_limits(control, UploadLimits::default())
    }

    pub fn coordinator_with_limits(
        &self,
        control: &ControlState,
        limits: UploadLimits,
    ) -> SessionCoordinator {
        SessionCoordinator::new(TEST_USAGE_ID, control, limits, self.deps())
            .expect("valid test limits")
    }

    pub fn image_session(&self, has_prior_uploads: bool) -> SessionCoordinator {
        self.coordinator_for(&Self::image_control(has_prior_uploads))
    }
}

impl Default for SessionFixture {
    fn default() -> Self {
        Self::new()
    }
}
