// Notification facade: the four modal/toast operations the rest of the
// client uses, plus the confirmation dialog the delete flow needs. Real
// frontends bind this to their modal library; tests use `NullNotifier`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Modal alert with a short title and supporting text.
    async fn alert(&self, title: &str, text: &str, severity: Severity);

    /// Transient corner toast.
    async fn toast(&self, title: &str, severity: Severity);

    /// Blocking loading spinner. Stays up until `hide`.
    async fn loading(&self, title: &str);

    /// Retitle an already-visible spinner; no-op otherwise.
    async fn update_loading(&self, title: &str);

    /// Yes/no confirmation dialog. Returns whether the user confirmed.
    async fn confirm(&self, title: &str, text: &str) -> bool;

    /// Dismiss whatever is currently visible.
    async fn hide(&self);
}

/// Everything the facade was asked to show, in order. Lets tests assert on
/// the exact alert sequence a workflow produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert {
        title: String,
        text: String,
        severity: Severity,
    },
    Toast {
        title: String,
        severity: Severity,
    },
    Loading(String),
    UpdateLoading(String),
    Confirm {
        title: String,
        text: String,
    },
    Hide,
}

/// Recording notifier. Confirmation dialogs answer with a preset response.
#[derive(Clone, Default)]
pub struct NullNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
    confirm_response: Arc<Mutex<bool>>,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming() -> Self {
        let notifier = Self::default();
        *notifier.confirm_response.lock() = true;
        notifier
    }

    pub fn set_confirm_response(&self, response: bool) {
        *self.confirm_response.lock() = response;
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Titles of modal alerts only, in order shown.
    pub fn alert_titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Alert { title, .. } => Some(title.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn alert(&self, title: &str, text: &str, severity: Severity) {
        self.notices.lock().push(Notice::Alert {
            title: title.to_string(),
            text: text.to_string(),
            severity,
        });
    }

    async fn toast(&self, title: &str, severity: Severity) {
        self.notices.lock().push(Notice::Toast {
            title: title.to_string(),
            severity,
        });
    }

    async fn loading(&self, title: &str) {
        self.notices.lock().push(Notice::Loading(title.to_string()));
    }

    async fn update_loading(&self, title: &str) {
        self.notices
            .lock()
            .push(Notice::UpdateLoading(title.to_string()));
    }

    async fn confirm(&self, title: &str, text: &str) -> bool {
        self.notices.lock().push(Notice::Confirm {
            title: title.to_string(),
            text: text.to_string(),
        });
        *self.confirm_response.lock()
    }

    async fn hide(&self) {
        self.notices.lock().push(Notice::Hide);
    }
}
