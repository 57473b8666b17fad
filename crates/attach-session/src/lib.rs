//! Attach Session Library
//!
//! Overwrite guard, upload session coordinator, and the response view that
//! hosts them in a form. Collaborators (server endpoints, uploader, UI,
//! analytics) are the traits from `attach_core::hooks`.

pub mod coordinator;
pub mod guard;
pub mod view;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use coordinator::{SessionCoordinator, SessionDeps, UploadSummary};
pub use guard::{BlockReason, GateDecision, GuardState, OverwriteGuard};
pub use view::{AttachmentResponseView, FormHost, ResponseView};
