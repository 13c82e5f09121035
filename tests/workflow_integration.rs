// End-to-end workflow scenarios over the in-memory collaborators: the
// controller drives real sequencing against fake auth/storage/detection
// backends, and the assertions read the resulting view-state.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use integrify_client::auth::{AuthGateway, MemoryAuthGateway};
use integrify_client::detect::{Accent, Detector};
use integrify_client::history::{Bucket, HistoryPane, GUEST_PLACEHOLDER};
use integrify_client::models::{AuthUser, SelectedFile, UploadRecord};
use integrify_client::notify::NullNotifier;
use integrify_client::player::MediaSource;
use integrify_client::storage::{object_key, MemoryObjectStore, MemoryRecordStore, RecordStore};
use integrify_client::workflow::{
    spawn_auth_bridge, CountingUrlAllocator, RecordingNavigator,
};
use integrify_client::{ClientConfig, ClientEvent, Page, WorkflowController};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Detector double that replays a scripted response and records what it was
/// asked to analyze.
struct ScriptedDetector {
    response: Mutex<std::result::Result<Value, String>>,
    analyzed: Mutex<Vec<String>>,
}

impl ScriptedDetector {
    fn responding(response: Value) -> Self {
        Self {
            response: Mutex::new(Ok(response)),
            analyzed: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(message.to_string())),
            analyzed: Mutex::new(Vec::new()),
        }
    }

    fn analyzed(&self) -> Vec<String> {
        self.analyzed.lock().clone()
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn analyze(&self, file: &SelectedFile) -> Result<Value> {
        self.analyzed.lock().push(file.name.clone());
        match &*self.response.lock() {
            Ok(value) => Ok(value.clone()),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}

struct Harness {
    controller: WorkflowController,
    gateway: Arc<MemoryAuthGateway>,
    objects: Arc<MemoryObjectStore>,
    records: Arc<MemoryRecordStore>,
    detector: Arc<ScriptedDetector>,
    notifier: NullNotifier,
    navigator: Arc<RecordingNavigator>,
    urls: Arc<CountingUrlAllocator>,
}

fn harness(gateway: MemoryAuthGateway, detector: ScriptedDetector) -> Harness {
    let gateway = Arc::new(gateway);
    let objects = Arc::new(MemoryObjectStore::new());
    let records = Arc::new(MemoryRecordStore::new());
    let detector = Arc::new(detector);
    let notifier = NullNotifier::confirming();
    let navigator = Arc::new(RecordingNavigator::new());
    let urls = Arc::new(CountingUrlAllocator::new());

    let controller = WorkflowController::new(
        ClientConfig::default(),
        gateway.clone(),
        objects.clone(),
        records.clone(),
        detector.clone(),
        Arc::new(notifier.clone()),
        navigator.clone(),
        urls.clone(),
    );

    Harness {
        controller,
        gateway,
        objects,
        records,
        detector,
        notifier,
        navigator,
        urls,
    }
}

fn media_file(name: &str) -> SelectedFile {
    SelectedFile::new(name, vec![0u8; 2048])
}

fn fake_mp4_response() -> Value {
    json!({
        "label": "FAKE",
        "average_probability": 0.87,
        "top_frames": ["frameA", "frameB"],
    })
}

fn stored_record(id: &str, user: &str, name: &str, age_days: i64) -> UploadRecord {
    UploadRecord {
        id: id.to_string(),
        file_name: name.to_string(),
        file_url: format!("memory://uploads/{user}/{name}"),
        uploaded_at: Utc::now() - Duration::days(age_days),
        user_id: user.to_string(),
        heatmaps: Vec::new(),
        analysis_type: "mp4".to_string(),
        heatmaps_updated_at: None,
    }
}

#[tokio::test]
async fn authenticated_mp4_upload_analyzes_and_persists() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    // Blob written under the per-user key, metadata record committed.
    assert!(h.objects.contains("uploads/u1/clip.mp4"));
    assert_eq!(h.records.len(), 1);

    let entry = h.controller.last_saved().expect("entry displayed");
    let doc_id = entry.doc_id.clone().expect("doc id recorded");
    let record = h.records.get(&doc_id).await.unwrap().unwrap();
    assert_eq!(record.analysis_type, "mp4");
    assert_eq!(record.heatmaps, vec!["frameA", "frameB"]);
    assert!(record.heatmaps_updated_at.is_some());

    let verdict = h.controller.verdict().expect("verdict rendered");
    assert_eq!(verdict.label, "FAKE");
    assert_eq!(verdict.confidence_percent, Some(87));
    assert_eq!(verdict.accent, Accent::Warning);
    assert_eq!(h.controller.gallery().frames().len(), 2);

    assert_eq!(h.detector.analyzed(), vec!["clip.mp4"]);
    assert!(h.controller.selection().is_none());
    assert_eq!(h.navigator.last(), Some(Page::Result));

    // The upload refreshed the history pane into a Today group.
    let HistoryPane::Groups(groups) = h.controller.history() else {
        panic!("expected history groups");
    };
    assert_eq!(groups[0].bucket, Bucket::Today);
    assert_eq!(groups[0].rows[0].file_name, "clip.mp4");
}

#[tokio::test]
async fn guest_analysis_never_touches_storage() {
    let mut h = harness(
        MemoryAuthGateway::new(),
        ScriptedDetector::responding(json!({ "label": "REAL", "confidence": 0.99 })),
    );

    h.controller.handle(ClientEvent::GuestEntered).await;
    assert_eq!(
        h.controller.history(),
        &HistoryPane::Placeholder(GUEST_PLACEHOLDER)
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("voice.wav")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    assert!(h.objects.is_empty());
    assert!(h.records.is_empty());
    assert_eq!(h.detector.analyzed(), vec!["voice.wav"]);

    let verdict = h.controller.verdict().expect("verdict rendered");
    assert_eq!(verdict.label, "REAL");
    assert_eq!(verdict.accent, Accent::Affirmative);
    assert!(h.controller.last_saved().is_none());

    // Nothing was saved, so the affordances say so.
    h.controller.handle(ClientEvent::SaveRequested).await;
    h.controller.handle(ClientEvent::DeleteRequested).await;
    let titles = h.notifier.alert_titles();
    assert!(titles.contains(&"Nothing to save".to_string()));
    assert!(titles.contains(&"Nothing to delete".to_string()));
}

#[tokio::test(start_paused = true)]
async fn unresolved_identity_aborts_before_any_storage_call() {
    let mut h = harness(
        MemoryAuthGateway::new(),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    assert!(h.objects.is_empty());
    assert!(h.records.is_empty());
    assert!(h.detector.analyzed().is_empty());
    assert!(h.controller.verdict().is_none());
    assert_eq!(
        h.notifier.alert_titles(),
        vec!["Authentication required".to_string()]
    );
}

#[tokio::test]
async fn delete_converges_when_blob_is_already_absent() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;
    assert_eq!(h.records.len(), 1);

    // The blob vanished behind the client's back; delete must still succeed.
    h.objects.evict(&object_key("u1", "clip.mp4"));
    h.controller.handle(ClientEvent::DeleteRequested).await;

    assert!(h.records.is_empty());
    assert!(h.controller.last_saved().is_none());
    assert!(h.controller.verdict().is_none());
    assert!(h.controller.player().source().is_none());
    assert!(h.controller.gallery().is_empty());
    assert_eq!(h.controller.filename_label(), "No file selected");
    assert_eq!(h.navigator.last(), Some(Page::Upload));
    assert_eq!(h.urls.live_count(), 0);
    assert!(h.notifier.alert_titles().contains(&"Deleted".to_string()));
}

#[tokio::test]
async fn delete_backend_error_leaves_metadata_untouched() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    h.objects.fail_deletes(true);
    h.controller.handle(ClientEvent::DeleteRequested).await;

    assert_eq!(h.records.len(), 1);
    assert!(h.controller.last_saved().is_some());
    assert!(h
        .notifier
        .alert_titles()
        .contains(&"Delete failed".to_string()));
}

#[tokio::test]
async fn declined_confirmation_deletes_nothing() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    h.notifier.set_confirm_response(false);
    h.controller.handle(ClientEvent::DeleteRequested).await;

    assert_eq!(h.records.len(), 1);
    assert!(h.controller.last_saved().is_some());
}

#[tokio::test]
async fn new_selection_supersedes_displayed_result() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;
    assert!(h.controller.last_saved().is_some());

    h.controller
        .handle(ClientEvent::FileChosen(media_file("next.mov")))
        .await;
    assert!(h.controller.last_saved().is_none());

    h.controller.handle(ClientEvent::SaveRequested).await;
    assert!(h
        .notifier
        .alert_titles()
        .contains(&"Pending upload".to_string()));
}

#[tokio::test]
async fn upload_failure_aborts_with_no_metadata_and_no_analysis() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );
    h.objects.fail_puts(true);

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    assert!(h.records.is_empty());
    assert!(h.detector.analyzed().is_empty());
    assert!(h.controller.verdict().is_none());
    assert!(h
        .notifier
        .alert_titles()
        .contains(&"Upload failed".to_string()));
}

#[tokio::test]
async fn detection_error_message_is_surfaced_verbatim() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::failing("Unsupported codec"),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    assert!(h.controller.verdict().is_none());
    let notices = h.notifier.notices();
    let surfaced = notices.iter().any(|n| {
        matches!(n, integrify_client::notify::Notice::Alert { title, text, .. }
            if title == "Processing error" && text == "Unsupported codec")
    });
    assert!(surfaced, "expected verbatim error alert, got {notices:?}");
}

#[tokio::test]
async fn failed_heatmap_persistence_never_blocks_the_result() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );
    h.records.fail_updates(true);

    h.controller
        .handle(ClientEvent::FileChosen(media_file("clip.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;

    // Result shown, record kept, but no error alert reached the user.
    assert!(h.controller.verdict().is_some());
    assert_eq!(h.navigator.last(), Some(Page::Result));
    assert!(!h
        .notifier
        .alert_titles()
        .iter()
        .any(|t| t.contains("error") || t.contains("failed")));

    let doc_id = h
        .controller
        .last_saved()
        .and_then(|e| e.doc_id.clone())
        .unwrap();
    let record = h.records.get(&doc_id).await.unwrap().unwrap();
    assert!(record.heatmaps.is_empty());
}

#[tokio::test]
async fn login_notification_renders_two_history_buckets() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );
    h.records.insert(stored_record("today", "u1", "fresh.mp4", 0));
    h.records.insert(stored_record("older", "u1", "stale.mp4", 3));

    h.controller
        .handle(ClientEvent::AuthChanged(Some(AuthUser::new("u1"))))
        .await;

    assert_eq!(h.navigator.last(), Some(Page::Home));
    let HistoryPane::Groups(groups) = h.controller.history() else {
        panic!("expected history groups");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].bucket, Bucket::Today);
    assert_eq!(groups[0].rows.len(), 1);
    assert_eq!(groups[1].bucket, Bucket::Older);
    assert_eq!(groups[1].rows.len(), 1);
}

#[tokio::test]
async fn opening_a_saved_record_rehydrates_the_result_view() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );
    let mut record = stored_record("doc1", "u1", "old.mp4", 1);
    record.heatmaps = vec!["x".to_string(), "y".to_string()];
    h.records.insert(record);

    h.controller
        .handle(ClientEvent::HistoryItemOpened("doc1".to_string()))
        .await;

    let entry = h.controller.last_saved().expect("entry rehydrated");
    assert_eq!(entry.name, "old.mp4");
    assert_eq!(entry.doc_id.as_deref(), Some("doc1"));
    assert_eq!(entry.heatmaps.as_ref().map(Vec::len), Some(2));
    assert_eq!(
        h.controller.player().source(),
        Some(&MediaSource::Remote("memory://uploads/u1/old.mp4".into()))
    );
    assert_eq!(h.controller.gallery().frames().len(), 2);
    assert_eq!(h.controller.filename_label(), "old.mp4");
    assert_eq!(h.navigator.last(), Some(Page::Result));
}

#[tokio::test]
async fn foreign_record_is_rejected_as_access_denied() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );
    h.records
        .insert(stored_record("doc1", "someone-else", "their.mp4", 1));

    h.controller
        .handle(ClientEvent::HistoryItemOpened("doc1".to_string()))
        .await;

    assert!(h.controller.last_saved().is_none());
    assert_eq!(h.notifier.alert_titles(), vec!["Access denied".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn user_initiated_sign_out_routes_to_login() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller.handle(ClientEvent::LogoutRequested).await;
    h.controller.handle(ClientEvent::AuthChanged(None)).await;

    assert_eq!(h.navigator.last(), Some(Page::Login));
    assert!(h
        .notifier
        .alert_titles()
        .contains(&"Signed out".to_string()));
}

#[tokio::test(start_paused = true)]
async fn detected_sign_out_falls_back_to_register() {
    let mut h = harness(
        MemoryAuthGateway::new(),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller.handle(ClientEvent::AuthChanged(None)).await;

    assert_eq!(h.navigator.last(), Some(Page::Register));
}

#[tokio::test]
async fn register_writes_profile_and_returns_to_login() {
    let mut h = harness(
        MemoryAuthGateway::new(),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::RegisterSubmitted {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await;

    assert_eq!(h.navigator.last(), Some(Page::Login));
    assert!(h
        .notifier
        .alert_titles()
        .contains(&"Registration successful".to_string()));

    let user = h
        .gateway
        .sign_in("ada@example.com", "hunter2")
        .await
        .unwrap();
    let profile = h.records.get_profile(&user.uid).await.unwrap().unwrap();
    assert_eq!(profile.username, "ada");
}

#[tokio::test]
async fn register_without_username_is_rejected() {
    let mut h = harness(
        MemoryAuthGateway::new(),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::RegisterSubmitted {
            username: "  ".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await;

    assert_eq!(
        h.notifier.alert_titles(),
        vec!["Missing information".to_string()]
    );
}

#[tokio::test]
async fn auth_bridge_forwards_login_notifications() {
    let gateway: Arc<MemoryAuthGateway> = Arc::new(MemoryAuthGateway::new());
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let bridge = spawn_auth_bridge(gateway.clone(), tx);

    gateway.emit(Some(AuthUser::new("u9")));
    let event = rx.recv().await.expect("bridged event");
    match event {
        ClientEvent::AuthChanged(Some(user)) => assert_eq!(user.uid, "u9"),
        other => panic!("unexpected event {other:?}"),
    }

    drop(rx);
    gateway.emit(None);
    let _ = bridge.await;
}

#[tokio::test]
async fn switching_local_previews_revokes_the_old_url() {
    let mut h = harness(
        MemoryAuthGateway::signed_in("u1"),
        ScriptedDetector::responding(fake_mp4_response()),
    );

    h.controller
        .handle(ClientEvent::FileChosen(media_file("first.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;
    assert_eq!(h.urls.live_count(), 1);

    h.controller
        .handle(ClientEvent::FileChosen(media_file("second.mp4")))
        .await;
    h.controller.handle(ClientEvent::Continue).await;
    assert_eq!(h.urls.live_count(), 1);
}
