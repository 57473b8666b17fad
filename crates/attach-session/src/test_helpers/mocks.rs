//! In-memory collaborators that record every call
//!
//! All mocks can share one [`Journal`] so tests can assert on the order of
//! remote calls across collaborators (purge before transfer, and so on).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use attach_core::models::{
    AnalyticsEvent, CandidateFile, ControlState, DescriptionMap, Notice, NoticeKind,
    PurgeResponse, TransferReceipt, UploadRestrictions,
};
use attach_core::{
    AnalyticsSink, AttachError, AttachmentServer, SessionUi, TransportError, Uploader,
    UploaderFactory,
};

use crate::view::FormHost;

/// Ordered log of remote calls shared between mocks.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Attachment server answering from queued responses.
///
/// Purges succeed unless a response was queued with [`MockServer::queue_purge`].
pub struct MockServer {
    journal: Journal,
    purge_results: Mutex<VecDeque<Result<PurgeResponse, String>>>,
    purge_calls: AtomicUsize,
    render_failure: Mutex<Option<String>>,
    save_failure: Mutex<Option<String>>,
    saved: Mutex<Vec<(String, DescriptionMap)>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::with_journal(Journal::new())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            purge_results: Mutex::new(VecDeque::new()),
            purge_calls: AtomicUsize::new(0),
            render_failure: Mutex::new(None),
            save_failure: Mutex::new(None),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// `Err` simulates a transport error on the purge request.
    pub fn queue_purge(&self, result: Result<PurgeResponse, String>) {
        self.purge_results.lock().unwrap().push_back(result);
    }

    pub fn fail_render(&self, reason: &str) {
        *self.render_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_save(&self, reason: &str) {
        *self.save_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn purge_calls(&self) -> usize {
        self.purge_calls.load(Ordering::SeqCst)
    }

    pub fn saved_descriptions(&self) -> Vec<(String, DescriptionMap)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn markup(&self) -> String {
        "<div class=\"attachment-upload\"></div>".to_string()
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttachmentServer for MockServer {
    async fn render(&self, step: &str) -> Result<String, AttachError> {
        self.journal.record(format!("render:{}", step));
        match self.render_failure.lock().unwrap().clone() {
            Some(reason) => Err(AttachError::Remote(reason)),
            None => Ok(self.markup()),
        }
    }

    async fn purge_previous_uploads(&self, usage_id: &str) -> Result<PurgeResponse, AttachError> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("purge:{}", usage_id));
        let queued = self.purge_results.lock().unwrap().pop_front();
        match queued {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(AttachError::Remote(reason)),
            None => Ok(PurgeResponse::ok()),
        }
    }

    async fn save_descriptions(
        &self,
        usage_id: &str,
        descriptions: &DescriptionMap,
    ) -> Result<(), AttachError> {
        self.journal.record(format!("save:{}", usage_id));
        if let Some(reason) = self.save_failure.lock().unwrap().clone() {
            return Err(AttachError::Remote(reason));
        }
        self.saved
            .lock()
            .unwrap()
            .push((usage_id.to_string(), descriptions.clone()));
        Ok(())
    }
}

/// Uploader factory whose uploaders succeed unless a file name was marked
/// with [`MockUploaderFactory::fail_file`].
pub struct MockUploaderFactory {
    journal: Journal,
    created: AtomicUsize,
    restrictions: Mutex<Vec<UploadRestrictions>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    transfers: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockUploaderFactory {
    pub fn new() -> Self {
        Self::with_journal(Journal::new())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            created: AtomicUsize::new(0),
            restrictions: Mutex::new(Vec::new()),
            failures: Arc::new(Mutex::new(HashMap::new())),
            transfers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail_file(&self, name: &str, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(name.to_string(), reason.to_string());
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Restriction objects the uploaders were built with.
    pub fn restrictions(&self) -> Vec<UploadRestrictions> {
        self.restrictions.lock().unwrap().clone()
    }

    /// `(file name, destination)` of every attempted transfer.
    pub fn transfers(&self) -> Vec<(String, String)> {
        self.transfers.lock().unwrap().clone()
    }
}

impl Default for MockUploaderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl UploaderFactory for MockUploaderFactory {
    fn create(&self, usage_id: &str, restrictions: &UploadRestrictions) -> Box<dyn Uploader> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.restrictions.lock().unwrap().push(restrictions.clone());
        Box::new(MockUploader {
            usage_id: usage_id.to_string(),
            journal: self.journal.clone(),
            failures: self.failures.clone(),
            transfers: self.transfers.clone(),
        })
    }
}

struct MockUploader {
    usage_id: String,
    journal: Journal,
    failures: Arc<Mutex<HashMap<String, String>>>,
    transfers: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl Uploader for MockUploader {
    async fn transfer(
        &self,
        file: &CandidateFile,
        destination: &str,
    ) -> Result<TransferReceipt, TransportError> {
        self.journal
            .record(format!("transfer:{}->{}", file.name, destination));
        self.transfers
            .lock()
            .unwrap()
            .push((file.name.clone(), destination.to_string()));

        if let Some(reason) = self.failures.lock().unwrap().get(&file.name) {
            return Err(TransportError::new(file.name.clone(), reason.clone()));
        }

        let storage_key = if destination == self.usage_id {
            self.usage_id.clone()
        } else {
            format!("{}/{}", self.usage_id, destination)
        };
        Ok(TransferReceipt {
            destination: destination.to_string(),
            url: format!("memory://{}", storage_key),
            storage_key,
        })
    }
}

#[derive(Default)]
pub struct RecordingUi {
    notices: Mutex<Vec<Notice>>,
    trigger_changes: Mutex<Vec<bool>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn notice_kinds(&self) -> Vec<NoticeKind> {
        self.notices.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn trigger_changes(&self) -> Vec<bool> {
        self.trigger_changes.lock().unwrap().clone()
    }
}

impl SessionUi for RecordingUi {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn set_trigger_enabled(&self, enabled: bool) {
        self.trigger_changes.lock().unwrap().push(enabled);
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn emit(&self, event: &AnalyticsEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Host form that records what the view did to the page.
pub struct MockFormHost {
    control: ControlState,
    replaced: Mutex<Vec<String>>,
    load_errors: Mutex<Vec<String>>,
    announcements: Mutex<Vec<String>>,
}

impl MockFormHost {
    pub fn new(control: ControlState) -> Self {
        Self {
            control,
            replaced: Mutex::new(Vec::new()),
            load_errors: Mutex::new(Vec::new()),
            announcements: Mutex::new(Vec::new()),
        }
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn load_errors(&self) -> Vec<String> {
        self.load_errors.lock().unwrap().clone()
    }

    pub fn announcements(&self) -> Vec<String> {
        self.announcements.lock().unwrap().clone()
    }
}

impl FormHost for MockFormHost {
    fn replace_step(&self, markup: &str) {
        self.replaced.lock().unwrap().push(markup.to_string());
    }

    fn show_load_error(&self, step: &str) {
        self.load_errors.lock().unwrap().push(step.to_string());
    }

    fn announce_status(&self, message: &str) {
        self.announcements.lock().unwrap().push(message.to_string());
    }

    fn control_state(&self, _usage_id: &str) -> ControlState {
        self.control.clone()
    }
}
