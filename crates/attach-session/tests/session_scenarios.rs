//! End-to-end upload sessions against in-memory collaborators.

use attach_core::models::{
    CandidateFile, ControlState, DescriptionKey, FailureCause, NoticeKind, SessionState,
    TriggerAttributes, UploadLimits,
};
use attach_core::AttachError;
use attach_session::test_helpers::{SessionFixture, TEST_USAGE_ID};
use attach_session::GuardState;
use serde_json::json;

const MB: u64 = 1024 * 1024;

fn ten_mb_limits() -> UploadLimits {
    UploadLimits {
        max_total_bytes: 10 * MB,
        ..UploadLimits::default()
    }
}

#[tokio::test]
async fn single_file_without_prior_uploads_completes() {
    let fixture = SessionFixture::new();
    let mut session =
        fixture.coordinator_with_limits(&SessionFixture::image_control(false), ten_mb_limits());

    assert!(session.open().unwrap());
    let file = CandidateFile::new("diagram.png", 2 * MB, "image/png");
    let id = file.id;
    assert!(session.add_file(file).unwrap().is_accepted());
    session.set_description(id, "Lab diagram").unwrap();
    assert!(session.confirm_submission());

    session.finalize_selection().unwrap();
    let summary = session.upload().await.unwrap();

    assert_eq!(session.state(), SessionState::Complete);
    assert!(!session.trigger_enabled());
    assert_eq!(summary.receipts.len(), 1);
    assert_eq!(summary.receipts[0].destination, TEST_USAGE_ID);
    assert!(summary.descriptions_saved);
    assert_eq!(
        serde_json::to_value(session.descriptions()).unwrap(),
        json!({ TEST_USAGE_ID: "Lab diagram" })
    );

    let saved = fixture.server.saved_descriptions();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, TEST_USAGE_ID);
    assert_eq!(fixture.server.purge_calls(), 0);
    assert_eq!(fixture.ui.trigger_changes(), vec![false]);
    assert_eq!(fixture.ui.notice_kinds(), vec![NoticeKind::Uploaded]);

    let events = fixture.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].file_name, "diagram.png");
    assert_eq!(events[0].file_size, 2 * MB);
    assert_eq!(events[0].file_type, "image/png");

    // one successful submission per control
    assert!(matches!(session.open(), Err(AttachError::SessionLocked)));
}

#[tokio::test]
async fn prior_uploads_need_second_confirmation_then_purge() {
    let fixture = SessionFixture::new();
    let mut session = fixture.image_session(true);

    session.open().unwrap();
    session
        .add_file(CandidateFile::new("a.png", MB, "image/png").with_description("first"))
        .unwrap();
    session
        .add_file(CandidateFile::new("b.jpg", MB, "image/jpeg").with_description("second"))
        .unwrap();
    session.finalize_selection().unwrap();

    let first = session.upload().await.unwrap_err();
    assert!(matches!(first, AttachError::ConfirmationRequired));
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);
    assert_eq!(session.guard_state(), GuardState::NeedsPurge);
    assert_eq!(fixture.server.purge_calls(), 0);
    assert!(fixture.uploaders.transfers().is_empty());

    let summary = session.upload().await.unwrap();

    assert_eq!(fixture.server.purge_calls(), 1);
    assert_eq!(
        fixture.uploaders.transfers(),
        vec![
            ("a.png".to_string(), "1".to_string()),
            ("b.jpg".to_string(), "2".to_string()),
        ]
    );
    assert_eq!(summary.receipts.len(), 2);
    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(session.guard_state(), GuardState::NoPriorUploads);
    assert_eq!(
        session.descriptions().get(&DescriptionKey::Index(2)),
        Some("second")
    );
    assert_eq!(
        serde_json::to_value(session.descriptions()).unwrap(),
        json!({ "1": "first", "2": "second" })
    );
    assert_eq!(
        fixture.ui.notice_kinds(),
        vec![NoticeKind::ConfirmationRequired, NoticeKind::Uploaded]
    );
}

#[tokio::test]
async fn purge_completes_before_any_transfer() {
    let fixture = SessionFixture::new();
    let mut session = fixture.image_session(true);

    session.open().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        session
            .add_file(CandidateFile::new(name, 10, "image/png").with_description(name))
            .unwrap();
    }
    session.finalize_selection().unwrap();
    let _ = session.upload().await;
    session.upload().await.unwrap();

    let purge = format!("purge:{}", TEST_USAGE_ID);
    let save = format!("save:{}", TEST_USAGE_ID);
    assert_eq!(
        fixture.journal.entries(),
        vec![
            purge,
            "transfer:a.png->1".to_string(),
            "transfer:b.png->2".to_string(),
            "transfer:c.png->3".to_string(),
            save,
        ]
    );
}

#[tokio::test]
async fn oversized_second_file_is_rejected_and_first_stays_queued() {
    let fixture = SessionFixture::new();
    let mut session =
        fixture.coordinator_with_limits(&SessionFixture::image_control(false), ten_mb_limits());

    session.open().unwrap();
    let first = session
        .add_file(CandidateFile::new("a.png", 7 * MB, "image/png"))
        .unwrap();
    let second = session
        .add_file(CandidateFile::new("b.png", 5 * MB, "image/png"))
        .unwrap();

    assert!(first.is_accepted());
    assert!(!second.is_accepted());
    assert_eq!(session.batch().len(), 1);
    assert_eq!(session.batch().files()[0].name, "a.png");
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(fixture.ui.notice_kinds(), vec![NoticeKind::PolicyViolation]);
    assert!(fixture.uploaders.transfers().is_empty());
}

#[tokio::test]
async fn failed_purge_blocks_upload_and_rearms_confirmation() {
    let fixture = SessionFixture::new();
    fixture
        .server
        .queue_purge(Ok(attach_core::models::PurgeResponse::failed("storage busy")));
    let mut session = fixture.image_session(true);

    session.open().unwrap();
    session
        .add_file(CandidateFile::new("a.png", 10, "image/png").with_description("a"))
        .unwrap();
    session.finalize_selection().unwrap();

    let _ = session.upload().await;
    let err = session.upload().await.unwrap_err();

    assert!(matches!(err, AttachError::PurgeFailed(ref msg) if msg == "storage busy"));
    assert_eq!(
        session.state(),
        SessionState::Failed(FailureCause::PurgeFailed)
    );
    assert_eq!(session.guard_state(), GuardState::NeedsFirstConfirmation);
    assert!(fixture.uploaders.transfers().is_empty());
    assert!(fixture.ui.notice_kinds().contains(&NoticeKind::PurgeFailed));
    assert!(session.trigger_enabled());

    // retrying starts over with a confirmation, then purges and uploads
    let retry = session.upload().await.unwrap_err();
    assert!(matches!(retry, AttachError::ConfirmationRequired));
    assert_eq!(fixture.server.purge_calls(), 1);

    session.upload().await.unwrap();
    assert_eq!(fixture.server.purge_calls(), 2);
    assert_eq!(session.state(), SessionState::Complete);
}

#[tokio::test]
async fn custom_whitelist_admits_by_extension() {
    let fixture = SessionFixture::new();
    let control = ControlState {
        attributes: TriggerAttributes::new("custom").with_whitelist(&["docx", "csv"]),
        has_prior_uploads: false,
        trigger_enabled: true,
    };
    let mut session = fixture.coordinator_for(&control);
    session.open().unwrap();

    let restrictions = session.restrictions().unwrap();
    assert_eq!(restrictions.allowed_types, vec![".docx", ".csv"]);
    assert_eq!(fixture.uploaders.restrictions(), vec![restrictions]);

    let report = CandidateFile::new("report.DOCX", 10, "application/octet-stream");
    let image = CandidateFile::new("photo.png", 10, "image/png");
    assert!(session.add_file(report).unwrap().is_accepted());
    assert!(!session.add_file(image).unwrap().is_accepted());
}

#[tokio::test]
async fn completed_control_can_be_reopened_by_server_state() {
    let fixture = SessionFixture::new();
    let mut session = fixture.image_session(false);

    session.open().unwrap();
    session
        .add_file(CandidateFile::new("a.png", 10, "image/png").with_description("a"))
        .unwrap();
    session.finalize_selection().unwrap();
    session.upload().await.unwrap();
    assert!(session.has_prior_uploads());

    session.reopen(&SessionFixture::image_control(true)).unwrap();
    assert!(session.open().unwrap());
    session
        .add_file(CandidateFile::new("b.png", 10, "image/png").with_description("b"))
        .unwrap();
    session.finalize_selection().unwrap();

    // the new round has to confirm the overwrite again
    assert!(matches!(
        session.upload().await,
        Err(AttachError::ConfirmationRequired)
    ));
    session.upload().await.unwrap();
    assert_eq!(fixture.server.purge_calls(), 1);
    assert_eq!(fixture.uploaders.created_count(), 2);
}
