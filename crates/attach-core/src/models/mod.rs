//! Data models for upload sessions
//!
//! Each sub-module covers one part of the session: the resolved policy, the
//! queued files, the session lifecycle, described uploads, and the payloads
//! exchanged with collaborators.

mod description;
mod events;
mod file;
mod policy;
mod remote;
mod session;

// Re-export all models for convenient imports
pub use description::{DescriptionKey, DescriptionMap};
pub use events::{AnalyticsEvent, Notice, NoticeKind};
pub use file::{CandidateFile, FileId, UploadBatch};
pub use policy::{TriggerAttributes, UploadCategory, UploadLimits, UploadPolicy, UploadRestrictions};
pub use remote::{ControlState, PurgeResponse, TransferReceipt};
pub use session::{FailureCause, SessionState};
