// Storage seams: the object store holding raw media blobs and the document
// store holding per-user upload records and profiles. Both are external
// collaborators; only their contracts live here.

mod memory;

pub use memory::{MemoryObjectStore, MemoryRecordStore};

use crate::error::StorageError;
use crate::models::{NewUploadRecord, UploadRecord, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Storage key for a user's uploaded file.
pub fn object_key(uid: &str, file_name: &str) -> String {
    format!("uploads/{uid}/{file_name}")
}

/// Blob storage. `put` returns a retrievable download URL; `delete` reports
/// an already-absent object as [`StorageError::NotFound`] so callers can
/// treat it as convergence rather than failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<String>;

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError>;
}

/// Per-user upload records and profile documents. Listing is ordered by
/// upload time descending; `attach_heatmaps` is a single-field partial
/// update that also stamps the update time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn add(&self, record: NewUploadRecord) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<UploadRecord>>;

    async fn attach_heatmaps(&self, id: &str, frames: &[String]) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Deletes every record owned by `user_id` with this file name. Returns
    /// how many were removed.
    async fn delete_matching(&self, user_id: &str, file_name: &str) -> Result<usize>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UploadRecord>>;

    async fn put_profile(&self, uid: &str, profile: UserProfile) -> Result<()>;

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;
}
