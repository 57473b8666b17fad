//! Upload session state machine
//!
//! [`SessionCoordinator`] is the single owner of one attachment control's
//! session. Every user action goes through a method here, and the current
//! [`SessionState`] decides whether the action is allowed. The coordinator
//! holds `&mut self` across each remote call, so a second transition can never
//! interleave with a purge or a transfer.

use std::sync::Arc;

use attach_core::models::{
    AnalyticsEvent, CandidateFile, ControlState, DescriptionKey, DescriptionMap, FailureCause,
    FileId, Notice, NoticeKind, SessionState, TransferReceipt, UploadBatch, UploadLimits,
    UploadPolicy, UploadRestrictions,
};
use attach_core::naming::Assignments;
use attach_core::{
    Admission, AnalyticsSink, AttachError, AttachmentServer, ErrorMetadata, SessionUi, Uploader,
    UploaderFactory, Validator,
};

use crate::guard::{BlockReason, GateDecision, GuardState, OverwriteGuard};

/// Collaborators shared by every session of a form.
#[derive(Clone)]
pub struct SessionDeps {
    pub server: Arc<dyn AttachmentServer>,
    pub uploaders: Arc<dyn UploaderFactory>,
    pub ui: Arc<dyn SessionUi>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

/// Result of a batch that reached [`SessionState::Complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub receipts: Vec<TransferReceipt>,
    /// `false` when persisting the descriptions failed. The upload itself stands.
    pub descriptions_saved: bool,
}

pub struct SessionCoordinator {
    usage_id: String,
    limits: UploadLimits,
    validator: Option<Validator>,
    state: SessionState,
    guard: OverwriteGuard,
    batch: UploadBatch,
    descriptions: DescriptionMap,
    uploader: Option<Box<dyn Uploader>>,
    trigger_enabled: bool,
    prior_uploads: bool,
    deps: SessionDeps,
}

impl SessionCoordinator {
    /// Build the coordinator for a control from its server-rendered state.
    ///
    /// A control whose trigger is already disabled had a batch submitted
    /// earlier and starts out locked in [`SessionState::Complete`].
    pub fn new(
        usage_id: impl Into<String>,
        control: &ControlState,
        limits: UploadLimits,
        deps: SessionDeps,
    ) -> Result<Self, AttachError> {
        let usage_id = usage_id.into();
        let validator = UploadPolicy::from_trigger(&control.attributes, &limits)?.map(Validator::new);

        let state = if control.trigger_enabled {
            SessionState::Idle
        } else {
            SessionState::Complete
        };

        tracing::debug!(
            usage_id = %usage_id,
            has_policy = validator.is_some(),
            has_prior_uploads = control.has_prior_uploads,
            state = %state,
            "Session coordinator created"
        );

        Ok(Self {
            guard: OverwriteGuard::new(usage_id.clone(), control.has_prior_uploads),
            usage_id,
            limits,
            validator,
            state,
            batch: UploadBatch::new(),
            descriptions: DescriptionMap::new(),
            uploader: None,
            trigger_enabled: control.trigger_enabled,
            prior_uploads: control.has_prior_uploads,
            deps,
        })
    }

    pub fn usage_id(&self) -> &str {
        &self.usage_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn guard_state(&self) -> GuardState {
        self.guard.state()
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub fn descriptions(&self) -> &DescriptionMap {
        &self.descriptions
    }

    pub fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    pub fn has_prior_uploads(&self) -> bool {
        self.prior_uploads
    }

    /// Restriction object for the upload widget, `None` without a policy.
    pub fn restrictions(&self) -> Option<UploadRestrictions> {
        self.validator.as_ref().map(|v| v.policy().restrictions())
    }

    /// Open the upload widget.
    ///
    /// Returns `Ok(false)` when the trigger declares no resolvable upload
    /// category; the session does not start and nothing is shown.
    pub fn open(&mut self) -> Result<bool, AttachError> {
        let Some(validator) = &self.validator else {
            tracing::debug!(usage_id = %self.usage_id, "No upload policy, ignoring open");
            return Ok(false);
        };

        if !self.trigger_enabled || self.state == SessionState::Complete {
            return Err(AttachError::SessionLocked);
        }

        match self.state {
            SessionState::Idle | SessionState::Failed(FailureCause::TransportFailure) => {}
            other => return Err(invalid(other, "open")),
        }

        let restrictions = validator.policy().restrictions();
        self.uploader = Some(self.deps.uploaders.create(&self.usage_id, &restrictions));
        self.batch.clear();
        self.descriptions.clear();
        self.transition(SessionState::Idle);

        tracing::info!(
            usage_id = %self.usage_id,
            max_file_count = restrictions.max_file_count,
            "Upload widget opened"
        );
        Ok(true)
    }

    /// "Before file added" hook.
    ///
    /// Rejections are reported through a notice and returned as
    /// `Ok(Admission::Reject(..))`; files admitted earlier stay queued.
    pub fn add_file(&mut self, candidate: CandidateFile) -> Result<Admission, AttachError> {
        self.ensure_selecting("add_file")?;
        let Some(validator) = &self.validator else {
            return Err(invalid(self.state, "add_file"));
        };

        let admission = validator.admit(&candidate, self.batch.files());
        match &admission {
            Admission::Accept => {
                tracing::debug!(
                    usage_id = %self.usage_id,
                    file = %candidate.name,
                    size_bytes = candidate.size_bytes,
                    "File admitted"
                );
                self.batch.push(candidate);
                self.selection_changed();
            }
            Admission::Reject(violation) => {
                self.deps
                    .ui
                    .notify(&Notice::new(NoticeKind::PolicyViolation, violation.to_string()));
            }
        }

        Ok(admission)
    }

    pub fn remove_file(&mut self, id: FileId) -> Result<CandidateFile, AttachError> {
        self.ensure_selecting("remove_file")?;
        let removed = self
            .batch
            .remove(id)
            .ok_or_else(|| AttachError::UnknownFile(id.to_string()))?;
        tracing::debug!(usage_id = %self.usage_id, file = %removed.name, "File removed");
        self.selection_changed();
        Ok(removed)
    }

    pub fn set_description(&mut self, id: FileId, description: &str) -> Result<(), AttachError> {
        if self.state == SessionState::Complete {
            return Err(AttachError::SessionLocked);
        }
        let file = self
            .batch
            .get_mut(id)
            .ok_or_else(|| AttachError::UnknownFile(id.to_string()))?;
        file.proposed_description = description.to_string();
        Ok(())
    }

    /// The user is done picking files. Count bounds are checked here.
    pub fn finalize_selection(&mut self) -> Result<(), AttachError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::AwaitingConfirmation => return Ok(()),
            other => return Err(invalid(other, "finalize_selection")),
        }
        let Some(validator) = &self.validator else {
            return Err(invalid(self.state, "finalize_selection"));
        };
        if self.uploader.is_none() {
            return Err(invalid(self.state, "finalize_selection"));
        }

        if let Err(violation) = validator.validate_count(self.batch.len()) {
            self.deps
                .ui
                .notify(&Notice::new(NoticeKind::PolicyViolation, violation.to_string()));
            return Err(violation.into());
        }

        self.transition(SessionState::AwaitingConfirmation);
        Ok(())
    }

    /// Whether the host form may enable its own submit control.
    pub fn confirm_submission(&self) -> bool {
        !self.batch.is_empty() && self.batch.undescribed().is_empty()
    }

    /// "Before upload" hook followed by the transfer of the whole batch.
    ///
    /// With prior uploads on the control the first call only warns
    /// ([`AttachError::ConfirmationRequired`]); the next call purges and
    /// uploads.
    pub async fn upload(&mut self) -> Result<UploadSummary, AttachError> {
        let state = self.state;
        match state {
            SessionState::Complete => return Err(AttachError::SessionLocked),
            _ if !state.accepts_upload() => return Err(invalid(state, "upload")),
            SessionState::Failed(FailureCause::PurgeFailed) => {
                self.transition(SessionState::AwaitingConfirmation);
            }
            _ => {}
        }
        if self.uploader.is_none() {
            return Err(AttachError::Internal(format!(
                "No uploader for session {}",
                self.usage_id
            )));
        }

        let undescribed = self.batch.undescribed();
        if !undescribed.is_empty() {
            let err = AttachError::MissingDescription { files: undescribed };
            tracing::debug!(usage_id = %self.usage_id, error = %err, "Upload blocked");
            self.deps
                .ui
                .notify(&Notice::new(NoticeKind::MissingDescription, err.client_message()));
            return Err(err);
        }

        if self.guard.purge_pending() {
            self.transition(SessionState::PurgingPrevious);
        }

        let decision = self
            .guard
            .gate(
                self.batch.files(),
                self.deps.server.as_ref(),
                self.deps.ui.as_ref(),
            )
            .await;

        let assignments = match decision {
            GateDecision::Proceed(assignments) => assignments,
            GateDecision::Block(BlockReason::ConfirmationRequired) => {
                self.transition(SessionState::AwaitingConfirmation);
                return Err(AttachError::ConfirmationRequired);
            }
            GateDecision::Block(BlockReason::PurgeFailed(reason)) => {
                self.transition(SessionState::Failed(FailureCause::PurgeFailed));
                return Err(AttachError::PurgeFailed(reason));
            }
        };

        let Some(uploader) = self.uploader.take() else {
            return Err(invalid(self.state, "upload"));
        };

        self.transition(SessionState::Uploading);
        self.set_trigger(false);

        let (receipts, failure) = self.transfer_batch(uploader.as_ref(), &assignments).await;
        drop(uploader);

        if let Some(err) = failure {
            self.fail_transport(&err, receipts.len());
            return Err(err);
        }

        Ok(self.complete(receipts).await)
    }

    /// Transfer every file in batch order, stopping at the first failure.
    async fn transfer_batch(
        &mut self,
        uploader: &dyn Uploader,
        assignments: &Assignments,
    ) -> (Vec<TransferReceipt>, Option<AttachError>) {
        let mut receipts = Vec::with_capacity(self.batch.len());

        if assignments.len() != self.batch.len() {
            let err = AttachError::Internal(format!(
                "{} destinations for {} files",
                assignments.len(),
                self.batch.len()
            ));
            return (receipts, Some(err));
        }

        for (file, assignment) in self.batch.files().iter().zip(assignments.iter()) {
            let destination = assignment.destination.as_str();
            let receipt = match uploader.transfer(file, destination).await {
                Ok(receipt) => receipt,
                Err(e) => return (receipts, Some(e.into())),
            };

            let recorded = DescriptionKey::from_destination(&self.usage_id, destination)
                .and_then(|key| self.descriptions.insert(key, &file.proposed_description));
            if let Err(e) = recorded {
                return (receipts, Some(e));
            }

            tracing::info!(
                usage_id = %self.usage_id,
                file = %file.name,
                destination = %destination,
                storage_key = %receipt.storage_key,
                "File uploaded"
            );
            self.deps
                .analytics
                .emit(&AnalyticsEvent::file_uploaded(&self.usage_id, file));
            receipts.push(receipt);
        }

        (receipts, None)
    }

    fn fail_transport(&mut self, err: &AttachError, transferred: usize) {
        tracing::error!(
            usage_id = %self.usage_id,
            error = %err,
            transferred,
            "Upload batch failed"
        );

        self.descriptions.clear();
        if transferred > 0 {
            // part of the batch is stored now; the next batch must confirm again
            self.prior_uploads = true;
            self.guard.rearm(true);
        }

        self.transition(SessionState::Failed(FailureCause::TransportFailure));
        self.deps
            .ui
            .notify(&Notice::new(NoticeKind::TransportFailure, err.client_message()));
        self.set_trigger(true);
    }

    async fn complete(&mut self, receipts: Vec<TransferReceipt>) -> UploadSummary {
        self.transition(SessionState::Complete);

        let descriptions_saved = match self
            .deps
            .server
            .save_descriptions(&self.usage_id, &self.descriptions)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    usage_id = %self.usage_id,
                    error = %e,
                    "Failed to save descriptions"
                );
                false
            }
        };

        self.guard.reset();
        self.prior_uploads = true;

        let count = receipts.len();
        self.deps.ui.notify(&Notice::new(
            NoticeKind::Uploaded,
            if count == 1 {
                "1 file uploaded.".to_string()
            } else {
                format!("{} files uploaded.", count)
            },
        ));

        UploadSummary {
            receipts,
            descriptions_saved,
        }
    }

    /// The user closed the widget.
    ///
    /// Not allowed while a purge or transfer is running. A completed session
    /// stays locked.
    pub fn dismiss(&mut self) -> Result<(), AttachError> {
        if self.state.is_in_flight() {
            return Err(invalid(self.state, "dismiss"));
        }

        self.uploader = None;
        if self.state == SessionState::Complete {
            return Ok(());
        }

        self.guard.dismiss();
        self.batch.clear();
        self.descriptions.clear();
        self.transition(SessionState::Idle);
        Ok(())
    }

    /// Re-read the control's server state, e.g. after a page reload.
    pub fn reopen(&mut self, control: &ControlState) -> Result<(), AttachError> {
        if self.state.is_in_flight() {
            return Err(invalid(self.state, "reopen"));
        }
        if !control.trigger_enabled {
            return Err(AttachError::SessionLocked);
        }

        self.validator =
            UploadPolicy::from_trigger(&control.attributes, &self.limits)?.map(Validator::new);
        self.prior_uploads = control.has_prior_uploads;
        self.guard.rearm(control.has_prior_uploads);
        self.uploader = None;
        self.batch.clear();
        self.descriptions.clear();
        self.transition(SessionState::Idle);
        self.set_trigger(true);
        Ok(())
    }

    fn ensure_selecting(&self, action: &'static str) -> Result<(), AttachError> {
        match self.state {
            SessionState::Complete => Err(AttachError::SessionLocked),
            SessionState::Idle
            | SessionState::AwaitingConfirmation
            | SessionState::Failed(FailureCause::PurgeFailed)
                if self.uploader.is_some() =>
            {
                Ok(())
            }
            other => Err(invalid(other, action)),
        }
    }

    /// A changed selection has to be finalized again.
    fn selection_changed(&mut self) {
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
    }

    fn set_trigger(&mut self, enabled: bool) {
        self.trigger_enabled = enabled;
        self.deps.ui.set_trigger_enabled(enabled);
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(
                usage_id = %self.usage_id,
                from = %self.state,
                to = %next,
                "Session transition"
            );
            self.state = next;
        }
    }
}

fn invalid(state: SessionState, action: &'static str) -> AttachError {
    AttachError::InvalidTransition {
        state: state.as_str(),
        action,
    }
}
