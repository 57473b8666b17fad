//! Response view for the attachment step of a form
//!
//! The host form supplies [`FormHost`]; [`ResponseView`] is the capability set
//! the form expects from any step view. [`AttachmentResponseView`] composes the
//! two and builds the [`SessionCoordinator`] once the fragment is in place.

use std::sync::Arc;

use async_trait::async_trait;

use attach_core::constants::{RESPONSE_LOAD_ERROR_STEP, RESPONSE_STEP};
use attach_core::models::{ControlState, UploadLimits};
use attach_core::AttachError;

use crate::coordinator::{SessionCoordinator, SessionDeps};

/// Page-side operations offered by the hosting form.
pub trait FormHost: Send + Sync {
    /// Swap the step's markup for `markup`.
    fn replace_step(&self, markup: &str);

    fn show_load_error(&self, step: &str);

    /// Screen-reader status message.
    fn announce_status(&self, message: &str);

    /// Trigger attributes and lock state as rendered by the server.
    fn control_state(&self, usage_id: &str) -> ControlState;
}

#[async_trait]
pub trait ResponseView: Send {
    /// Fetch and insert the step markup.
    async fn render(&mut self) -> Result<(), AttachError>;

    /// Wire the step's controls once the markup is in place.
    fn install_handlers(&mut self) -> Result<(), AttachError>;

    fn show_load_error(&self, step: &str);

    fn announce_status(&self, message: &str);

    /// Render, install handlers, announce. A render failure is shown on the
    /// host and ends the load.
    async fn load(&mut self) -> Result<(), AttachError> {
        if let Err(e) = self.render().await {
            tracing::error!(error = %e, "Response step failed to load");
            self.show_load_error(RESPONSE_LOAD_ERROR_STEP);
            return Err(e);
        }
        self.install_handlers()?;
        self.announce_status("Response form loaded");
        Ok(())
    }
}

pub struct AttachmentResponseView {
    usage_id: String,
    host: Arc<dyn FormHost>,
    deps: SessionDeps,
    limits: UploadLimits,
    coordinator: Option<SessionCoordinator>,
}

impl AttachmentResponseView {
    pub fn new(
        usage_id: impl Into<String>,
        host: Arc<dyn FormHost>,
        deps: SessionDeps,
        limits: UploadLimits,
    ) -> Self {
        Self {
            usage_id: usage_id.into(),
            host,
            deps,
            limits,
            coordinator: None,
        }
    }

    /// `None` until [`ResponseView::install_handlers`] ran.
    pub fn coordinator(&self) -> Option<&SessionCoordinator> {
        self.coordinator.as_ref()
    }

    pub fn coordinator_mut(&mut self) -> Option<&mut SessionCoordinator> {
        self.coordinator.as_mut()
    }
}

#[async_trait]
impl ResponseView for AttachmentResponseView {
    async fn render(&mut self) -> Result<(), AttachError> {
        let markup = self
            .deps
            .server
            .render(RESPONSE_STEP)
            .await
            .map_err(|e| match e {
                AttachError::RenderLoadFailure(_) => e,
                other => AttachError::RenderLoadFailure(other.to_string()),
            })?;
        self.host.replace_step(&markup);
        Ok(())
    }

    fn install_handlers(&mut self) -> Result<(), AttachError> {
        let control = self.host.control_state(&self.usage_id);
        let coordinator =
            SessionCoordinator::new(self.usage_id.clone(), &control, self.limits, self.deps.clone())?;
        self.coordinator = Some(coordinator);
        Ok(())
    }

    fn show_load_error(&self, step: &str) {
        self.host.show_load_error(step);
    }

    fn announce_status(&self, message: &str) {
        self.host.announce_status(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockFormHost, SessionFixture};
    use attach_core::models::SessionState;

    #[tokio::test]
    async fn load_replaces_markup_and_builds_coordinator() {
        let fixture = SessionFixture::new();
        let host = Arc::new(MockFormHost::new(SessionFixture::image_control(false)));
        let mut view =
            AttachmentResponseView::new("block-1", host.clone(), fixture.deps(), UploadLimits::default());

        view.load().await.unwrap();

        assert_eq!(host.replaced(), vec![fixture.server.markup()]);
        assert_eq!(host.announcements(), vec!["Response form loaded"]);
        assert!(host.load_errors().is_empty());
        let coordinator = view.coordinator().unwrap();
        assert_eq!(coordinator.state(), SessionState::Idle);
        assert_eq!(coordinator.usage_id(), "block-1");
    }

    #[tokio::test]
    async fn render_failure_is_reported_on_response_step() {
        let fixture = SessionFixture::new();
        fixture.server.fail_render("502 Bad Gateway");
        let host = Arc::new(MockFormHost::new(SessionFixture::image_control(false)));
        let mut view =
            AttachmentResponseView::new("block-1", host.clone(), fixture.deps(), UploadLimits::default());

        let err = view.load().await.unwrap_err();

        assert!(matches!(err, AttachError::RenderLoadFailure(_)));
        assert_eq!(host.load_errors(), vec!["response"]);
        assert!(host.replaced().is_empty());
        assert!(view.coordinator().is_none());
    }
}
