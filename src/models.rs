use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Profile document written at registration time (`users/{uid}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One persisted upload: metadata row plus evidence frames. Owned by
/// `user_id`; never shared across users. Heatmaps are attached at most once,
/// after a successful detection call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub heatmaps: Vec<String>,
    pub analysis_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmaps_updated_at: Option<DateTime<Utc>>,
}

/// Fields for a record about to be created; the store mints the id.
#[derive(Debug, Clone)]
pub struct NewUploadRecord {
    pub file_name: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub user_id: String,
    pub analysis_type: String,
}

/// File extension lowercased, "unknown" when the name has none.
pub fn analysis_type_for(file_name: &str) -> String {
    file_extension(file_name).unwrap_or_else(|| "unknown".to_string())
}

pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// The file currently sitting in the dropzone. Client-side only; cleared on
/// new selection, successful completion, delete, or page re-entry.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
    pub raw_bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, raw_bytes: impl Into<Bytes>) -> Self {
        let raw_bytes = raw_bytes.into();
        Self {
            name: name.into(),
            size_bytes: raw_bytes.len() as u64,
            raw_bytes,
        }
    }

    /// Human-readable size: whole bytes, one decimal above that.
    pub fn size_label(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.size_bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", size as u64, UNITS[unit])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// The record currently shown in the result view. At most one is active; it
/// is `None` whenever no result is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSavedEntry {
    pub name: String,
    pub url: String,
    pub doc_id: Option<String>,
    pub heatmaps: Option<Vec<String>>,
}
