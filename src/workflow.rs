// The upload-analyze-persist workflow controller. Owns every piece of
// client view-state (selection, displayed record, player, gallery, history,
// verdict) and mutates it only through event handling, so the whole flow
// runs against trait seams with no DOM attached.
//
// One continue invocation walks: Idle → Resolving Identity → Uploading →
// Analyzing → Rendering → Persisting Evidence → Done. Guest mode skips both
// persistence stages entirely. Completions carry a request token; a stale
// completion (superseded by a newer continue) is discarded silently.

use crate::auth::{AuthGateway, AuthSession};
use crate::config::ClientConfig;
use crate::detect::{Detector, Verdict};
use crate::error::{StorageError, WorkflowError};
use crate::gallery::HeatmapGallery;
use crate::history::{HistoryPane, GUEST_PLACEHOLDER, SIGNED_OUT_PLACEHOLDER};
use crate::models::{
    analysis_type_for, AuthUser, LastSavedEntry, NewUploadRecord, SelectedFile, UserProfile,
};
use crate::notify::{Notifier, Severity};
use crate::player::{MediaSource, PlayerState};
use crate::storage::{object_key, ObjectStore, RecordStore};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Views the client can navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Register,
    Login,
    Home,
    Result,
    Upload,
}

/// Page navigation seam; the frontend swaps visible views on these.
pub trait Navigator: Send + Sync {
    fn navigate(&self, page: Page);
}

/// Object-URL lifecycle seam: local previews of selected files. Every URL
/// handed out by `create` is revoked exactly once when the player lets go
/// of it.
pub trait ObjectUrlAllocator: Send + Sync {
    fn create(&self, file: &SelectedFile) -> String;

    fn revoke(&self, url: &str);
}

/// Everything the outside world can tell the controller, delivered over a
/// single inbound channel.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    FileChosen(SelectedFile),
    Continue,
    SaveRequested,
    DeleteRequested,
    HistoryItemOpened(String),
    AuthChanged(Option<AuthUser>),
    GuestEntered,
    LoginSubmitted {
        email: String,
        password: String,
    },
    RegisterSubmitted {
        username: String,
        email: String,
        password: String,
    },
    LogoutRequested,
    PlaybackTick {
        current_time: f64,
        duration: f64,
        paused: bool,
    },
    SeekBack,
    SeekForward,
    PlayPauseToggled,
    HeatmapOpened(usize),
    HeatmapClosed,
    UploadPageShown,
}

pub struct WorkflowController {
    config: ClientConfig,
    session: AuthSession,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    detector: Arc<dyn Detector>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    urls: Arc<dyn ObjectUrlAllocator>,

    selection: Option<SelectedFile>,
    last_saved: Option<LastSavedEntry>,
    player: PlayerState,
    gallery: HeatmapGallery,
    history: HistoryPane,
    verdict: Option<Verdict>,
    filename_label: String,
    continue_token: u64,
}

/// What a continue invocation produced, held until the token check passes.
struct ContinueOutcome {
    entry: Option<LastSavedEntry>,
    verdict: Verdict,
}

impl WorkflowController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ClientConfig,
        gateway: Arc<dyn AuthGateway>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        detector: Arc<dyn Detector>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        urls: Arc<dyn ObjectUrlAllocator>,
    ) -> Self {
        Self {
            config,
            session: AuthSession::new(gateway),
            objects,
            records,
            detector,
            notifier,
            navigator,
            urls,
            selection: None,
            last_saved: None,
            player: PlayerState::new(),
            gallery: HeatmapGallery::new(),
            history: HistoryPane::Placeholder(SIGNED_OUT_PLACEHOLDER),
            verdict: None,
            filename_label: "No file selected".to_string(),
            continue_token: 0,
        }
    }

    // View-state accessors. The frontend (and the tests) read these after
    // each handled event.

    pub fn selection(&self) -> Option<&SelectedFile> {
        self.selection.as_ref()
    }

    pub fn last_saved(&self) -> Option<&LastSavedEntry> {
        self.last_saved.as_ref()
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn gallery(&self) -> &HeatmapGallery {
        &self.gallery
    }

    pub fn history(&self) -> &HistoryPane {
        &self.history
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn filename_label(&self) -> &str {
        &self.filename_label
    }

    pub fn is_guest(&self) -> bool {
        self.session.is_guest()
    }

    /// Drains the inbound channel until every sender is dropped.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ClientEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
    }

    pub async fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::FileChosen(file) => self.select_file(file),
            ClientEvent::Continue => self.continue_analysis().await,
            ClientEvent::SaveRequested => self.save_requested().await,
            ClientEvent::DeleteRequested => self.delete_current().await,
            ClientEvent::HistoryItemOpened(doc_id) => self.open_saved(&doc_id).await,
            ClientEvent::AuthChanged(user) => self.auth_changed(user).await,
            ClientEvent::GuestEntered => {
                self.session.enter_guest_mode();
                self.navigator.navigate(Page::Home);
                self.refresh_history().await;
            }
            ClientEvent::LoginSubmitted { email, password } => {
                self.login(&email, &password).await;
            }
            ClientEvent::RegisterSubmitted {
                username,
                email,
                password,
            } => {
                self.register(&username, &email, &password).await;
            }
            ClientEvent::LogoutRequested => self.logout().await,
            ClientEvent::PlaybackTick {
                current_time,
                duration,
                paused,
            } => self.player.apply_timing(current_time, duration, paused),
            ClientEvent::SeekBack => {
                self.player.seek_offset(-self.config.seek_interval_secs);
            }
            ClientEvent::SeekForward => {
                self.player.seek_offset(self.config.seek_interval_secs);
            }
            ClientEvent::PlayPauseToggled => {
                self.player.toggle();
            }
            ClientEvent::HeatmapOpened(index) => {
                self.gallery.open(index);
            }
            ClientEvent::HeatmapClosed => {
                self.gallery.close();
            }
            ClientEvent::UploadPageShown => {
                self.clear_selection();
                self.last_saved = None;
                self.navigator.navigate(Page::Upload);
            }
        }
    }

    /// A new selection supersedes whatever result was on display: the saved
    /// entry is dropped so the save/delete affordances reflect only this
    /// file.
    fn select_file(&mut self, file: SelectedFile) {
        self.selection = Some(file);
        self.last_saved = None;
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    async fn continue_analysis(&mut self) {
        let Some(file) = self.selection.clone() else {
            self.notifier
                .alert(
                    "No file selected",
                    "Add a file to the dropzone first!",
                    Severity::Warning,
                )
                .await;
            return;
        };

        self.continue_token += 1;
        let token = self.continue_token;
        let guest = self.session.is_guest();

        match self.run_continue(&file, guest).await {
            Ok(outcome) => {
                if token != self.continue_token {
                    debug!("discarding superseded analysis of {}", file.name);
                    return;
                }
                self.apply_outcome(file, outcome, guest).await;
            }
            Err(err) => {
                self.notifier.hide().await;
                self.notifier
                    .alert(err.title(), &err.user_text(), err.severity())
                    .await;
            }
        }
    }

    /// Resolve identity, upload, analyze. No view-state is touched here, so
    /// an aborted or superseded run leaves the client exactly as it was.
    async fn run_continue(
        &mut self,
        file: &SelectedFile,
        guest: bool,
    ) -> crate::Result<ContinueOutcome> {
        let entry = if guest {
            self.notifier.loading("Analyzing file...").await;
            None
        } else {
            self.notifier.loading("Uploading file...").await;

            let user = self
                .session
                .await_identity(self.config.auth_wait())
                .await
                .ok_or(WorkflowError::AuthRequired)?;

            let key = object_key(&user.uid, &file.name);
            let url = self
                .objects
                .put(&key, file.raw_bytes.clone())
                .await
                .map_err(|e| WorkflowError::UploadFailed(e.to_string()))?;

            // Commit point: the metadata record only exists once the blob
            // write has succeeded.
            let doc_id = self
                .records
                .add(NewUploadRecord {
                    file_name: file.name.clone(),
                    file_url: url.clone(),
                    uploaded_at: Utc::now(),
                    user_id: user.uid.clone(),
                    analysis_type: analysis_type_for(&file.name),
                })
                .await
                .map_err(|e| WorkflowError::UploadFailed(e.to_string()))?;

            self.refresh_history().await;
            self.notifier.update_loading("Analyzing file...").await;

            Some(LastSavedEntry {
                name: file.name.clone(),
                url,
                doc_id: Some(doc_id),
                heatmaps: None,
            })
        };

        let payload = self
            .detector
            .analyze(file)
            .await
            .map_err(|e| WorkflowError::AnalysisFailed(e.to_string()))?;

        Ok(ContinueOutcome {
            entry,
            verdict: Verdict::from_payload(&payload),
        })
    }

    async fn apply_outcome(&mut self, file: SelectedFile, outcome: ContinueOutcome, guest: bool) {
        let ContinueOutcome { mut entry, verdict } = outcome;

        self.filename_label = file.name.clone();
        self.gallery.set_frames(verdict.frames.clone());

        let local_url = self.urls.create(&file);
        if let Some(released) = self.player.set_source(MediaSource::Local(local_url)) {
            self.urls.revoke(&released);
        }

        if !guest {
            if let Some(entry) = entry.as_mut() {
                if let Some(doc_id) = entry.doc_id.clone() {
                    if verdict.frames.is_empty() {
                        entry.heatmaps = None;
                    } else {
                        let persisted: Vec<String> = verdict
                            .frames
                            .iter()
                            .take(self.config.max_heatmap_frames)
                            .cloned()
                            .collect();
                        entry.heatmaps = Some(persisted.clone());
                        // Best effort: a failed evidence write never blocks
                        // the result from being shown.
                        if let Err(e) = self.records.attach_heatmaps(&doc_id, &persisted).await {
                            warn!("unable to persist heatmaps for {doc_id}: {e}");
                        }
                    }
                }
            }
        }

        self.verdict = Some(verdict);
        self.last_saved = entry;

        self.notifier.hide().await;
        self.navigator.navigate(Page::Result);
        self.clear_selection();
    }

    async fn save_requested(&self) {
        if let Some(entry) = &self.last_saved {
            self.notifier
                .alert(
                    "Saved",
                    &format!("{} is already stored in your history.", entry.name),
                    Severity::Success,
                )
                .await;
        } else if self.selection.is_some() {
            self.notifier
                .alert(
                    "Pending upload",
                    "Run the analysis first so the file is saved automatically.",
                    Severity::Info,
                )
                .await;
        } else {
            self.notifier
                .alert("Nothing to save", "Upload or open a file first.", Severity::Info)
                .await;
        }
    }

    async fn delete_current(&mut self) {
        let Some(entry) = self.last_saved.clone() else {
            self.notifier
                .alert("Nothing to delete", "Open a saved file first.", Severity::Info)
                .await;
            return;
        };

        let confirmed = self
            .notifier
            .confirm(
                "Delete this file?",
                &format!("This will remove {} from your library.", entry.name),
            )
            .await;
        if !confirmed {
            return;
        }

        let Some(user) = self.session.await_identity(self.config.auth_wait()).await else {
            let err = WorkflowError::AuthRequired;
            self.notifier
                .alert(err.title(), &err.user_text(), err.severity())
                .await;
            return;
        };

        self.notifier.loading("Deleting file...").await;
        match self.delete_from_storage_and_history(&user, &entry).await {
            Ok(()) => {
                self.notifier.hide().await;
                self.notifier
                    .alert(
                        "Deleted",
                        &format!("{} has been removed.", entry.name),
                        Severity::Success,
                    )
                    .await;

                self.last_saved = None;
                self.clear_selection();
                if let Some(released) = self.player.clear() {
                    self.urls.revoke(&released);
                }
                self.gallery.clear();
                self.verdict = None;
                self.filename_label = "No file selected".to_string();
                self.refresh_history().await;
                self.navigator.navigate(Page::Upload);
            }
            Err(err) => {
                self.notifier.hide().await;
                self.notifier
                    .alert(err.title(), &err.user_text(), err.severity())
                    .await;
            }
        }
    }

    /// Blob first, tolerating an already-absent object; the metadata record
    /// only goes once the blob is known gone.
    async fn delete_from_storage_and_history(
        &self,
        user: &AuthUser,
        entry: &LastSavedEntry,
    ) -> crate::Result<()> {
        let key = object_key(&user.uid, &entry.name);
        match self.objects.delete(&key).await {
            Ok(()) | Err(StorageError::NotFound) => {}
            Err(StorageError::Backend(msg)) => return Err(WorkflowError::DeleteFailed(msg)),
        }

        match &entry.doc_id {
            Some(doc_id) => self
                .records
                .delete(doc_id)
                .await
                .map_err(|e| WorkflowError::DeleteFailed(e.to_string()))?,
            None => {
                self.records
                    .delete_matching(&user.uid, &entry.name)
                    .await
                    .map_err(|e| WorkflowError::DeleteFailed(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn open_saved(&mut self, doc_id: &str) {
        match self.try_open_saved(doc_id).await {
            Ok(()) => {}
            Err(err) => {
                self.notifier
                    .alert(err.title(), &err.user_text(), err.severity())
                    .await;
            }
        }
    }

    async fn try_open_saved(&mut self, doc_id: &str) -> crate::Result<()> {
        let user = self
            .session
            .await_identity(self.config.auth_wait())
            .await
            .ok_or(WorkflowError::AuthRequired)?;

        let record = self
            .records
            .get(doc_id)
            .await
            .map_err(|_| WorkflowError::NotFound)?
            .ok_or(WorkflowError::NotFound)?;

        if record.user_id != user.uid {
            return Err(WorkflowError::AccessDenied);
        }

        self.filename_label = record.file_name.clone();
        self.last_saved = Some(LastSavedEntry {
            name: record.file_name.clone(),
            url: record.file_url.clone(),
            doc_id: Some(record.id.clone()),
            heatmaps: (!record.heatmaps.is_empty()).then(|| record.heatmaps.clone()),
        });
        if let Some(released) = self
            .player
            .set_source(MediaSource::Remote(record.file_url.clone()))
        {
            self.urls.revoke(&released);
        }
        self.gallery.set_frames(record.heatmaps);
        self.verdict = None;
        self.clear_selection();
        self.navigator.navigate(Page::Result);
        Ok(())
    }

    /// Re-renders the history pane for the current identity. Side-effect
    /// only; fires after login, successful upload, and delete.
    pub async fn refresh_history(&mut self) {
        match self.session.await_identity(self.config.auth_wait()).await {
            Some(user) => match self.records.list_for_user(&user.uid).await {
                Ok(records) => {
                    self.history = HistoryPane::build(&records, HistoryPane::today());
                }
                Err(e) => {
                    warn!("unable to load history for {}: {e}", user.uid);
                }
            },
            None => {
                self.history = HistoryPane::Placeholder(if self.session.is_guest() {
                    GUEST_PLACEHOLDER
                } else {
                    SIGNED_OUT_PLACEHOLDER
                });
            }
        }
    }

    async fn auth_changed(&mut self, user: Option<AuthUser>) {
        match user {
            Some(user) => {
                self.session.disable_guest_mode();
                self.navigator.navigate(Page::Home);
                self.refresh_history().await;

                match self.records.get_profile(&user.uid).await {
                    Ok(Some(profile)) => info!("welcome, {}", profile.username),
                    Ok(None) => {}
                    Err(e) => warn!("unable to load user profile: {e}"),
                }
            }
            None => {
                if self.session.take_signing_out() {
                    self.navigator.navigate(Page::Login);
                } else if self.session.is_guest() {
                    self.navigator.navigate(Page::Home);
                } else {
                    self.navigator.navigate(Page::Register);
                }
                self.refresh_history().await;
            }
        }
    }

    async fn login(&mut self, email: &str, password: &str) {
        self.session.disable_guest_mode();
        match self.session.gateway().clone().sign_in(email, password).await {
            Ok(_) => {
                self.notifier
                    .alert("Welcome back", "Login successful!", Severity::Success)
                    .await;
                self.navigator.navigate(Page::Home);
            }
            Err(e) => {
                self.notifier
                    .alert("Login failed", &e.to_string(), Severity::Error)
                    .await;
            }
        }
    }

    async fn register(&mut self, username: &str, email: &str, password: &str) {
        self.session.disable_guest_mode();

        if username.trim().is_empty() {
            self.notifier
                .alert(
                    "Missing information",
                    "Please enter a username!",
                    Severity::Warning,
                )
                .await;
            return;
        }

        let user = match self.session.gateway().clone().register(email, password).await {
            Ok(user) => user,
            Err(e) => {
                self.notifier
                    .alert("Registration failed", &e.to_string(), Severity::Error)
                    .await;
                return;
            }
        };

        let profile = UserProfile {
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        match self.records.put_profile(&user.uid, profile).await {
            Ok(()) => {
                self.notifier
                    .alert(
                        "Registration successful",
                        "Your account is ready.",
                        Severity::Success,
                    )
                    .await;
                self.navigator.navigate(Page::Login);
            }
            Err(e) => {
                self.notifier
                    .alert("Registration failed", &e.to_string(), Severity::Error)
                    .await;
            }
        }
    }

    async fn logout(&mut self) {
        if self.session.is_guest() {
            self.session.disable_guest_mode();
            self.navigator.navigate(Page::Login);
            return;
        }

        self.session.begin_sign_out();
        match self.session.gateway().clone().sign_out().await {
            Ok(()) => {
                self.notifier
                    .alert("Signed out", "See you next time!", Severity::Info)
                    .await;
            }
            Err(e) => {
                self.session.cancel_sign_out();
                self.notifier
                    .alert("Sign-out failed", &e.to_string(), Severity::Error)
                    .await;
            }
        }
    }
}

/// Forwards the auth backend's login-state notifications into the
/// controller's inbound channel. Stops when either side goes away.
pub fn spawn_auth_bridge(
    gateway: Arc<dyn AuthGateway>,
    events: mpsc::Sender<ClientEvent>,
) -> JoinHandle<()> {
    let mut watch = gateway.watch();
    tokio::spawn(async move {
        while let Some(user) = watch.recv().await {
            if events.send(ClientEvent::AuthChanged(user)).await.is_err() {
                break;
            }
        }
    })
}

/// Counting allocator standing in for `URL.createObjectURL` /
/// `revokeObjectURL`. Tracks live URLs so tests can assert nothing leaks.
#[derive(Default)]
pub struct CountingUrlAllocator {
    next: AtomicU64,
    live: Mutex<HashSet<String>>,
}

impl CountingUrlAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl ObjectUrlAllocator for CountingUrlAllocator {
    fn create(&self, file: &SelectedFile) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:{}#{n}", file.name);
        self.live.lock().insert(url.clone());
        url
    }

    fn revoke(&self, url: &str) {
        self.live.lock().remove(url);
    }
}

/// Recording navigator for the test suite.
#[derive(Default)]
pub struct RecordingNavigator {
    pages: Mutex<Vec<Page>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.pages.lock().clone()
    }

    pub fn last(&self) -> Option<Page> {
        self.pages.lock().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, page: Page) {
        self.pages.lock().push(page);
    }
}
