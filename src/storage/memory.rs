// In-memory store implementations backing the test suite. Both support
// fault injection so workflow error paths can be exercised.

use super::{ObjectStore, RecordStore};
use crate::error::StorageError;
use crate::models::{NewUploadRecord, UploadRecord, UserProfile};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    fail_puts: Mutex<bool>,
    fail_deletes: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        *self.fail_puts.lock() = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock() = fail;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Drops a blob behind the store's back, simulating an out-of-band
    /// deletion that the idempotent-delete path must tolerate.
    pub fn evict(&self, key: &str) {
        self.blobs.lock().remove(key);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<String> {
        if *self.fail_puts.lock() {
            return Err(anyhow!("object store unavailable"));
        }
        self.blobs.lock().insert(key.to_string(), bytes);
        Ok(format!("memory://{key}"))
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), StorageError> {
        if *self.fail_deletes.lock() {
            return Err(StorageError::Backend("object store unavailable".into()));
        }
        match self.blobs.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, UploadRecord>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    fail_updates: Mutex<bool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `attach_heatmaps` fail, for the best-effort persistence path.
    pub fn fail_updates(&self, fail: bool) {
        *self.fail_updates.lock() = fail;
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn insert(&self, record: UploadRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn add(&self, record: NewUploadRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.records.lock().insert(
            id.clone(),
            UploadRecord {
                id: id.clone(),
                file_name: record.file_name,
                file_url: record.file_url,
                uploaded_at: record.uploaded_at,
                user_id: record.user_id,
                heatmaps: Vec::new(),
                analysis_type: record.analysis_type,
                heatmaps_updated_at: None,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<UploadRecord>> {
        Ok(self.records.lock().get(id).cloned())
    }

    async fn attach_heatmaps(&self, id: &str, frames: &[String]) -> Result<()> {
        if *self.fail_updates.lock() {
            return Err(anyhow!("record store unavailable"));
        }
        let mut records = self.records.lock();
        let record = records
            .get_mut(id)
            .ok_or_else(|| anyhow!("no record with id {id}"))?;
        record.heatmaps = frames.to_vec();
        record.heatmaps_updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.lock().remove(id);
        Ok(())
    }

    async fn delete_matching(&self, user_id: &str, file_name: &str) -> Result<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| !(r.user_id == user_id && r.file_name == file_name));
        Ok(before - records.len())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UploadRecord>> {
        let mut owned: Vec<_> = self
            .records
            .lock()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(owned)
    }

    async fn put_profile(&self, uid: &str, profile: UserProfile) -> Result<()> {
        self.profiles.lock().insert(uid.to_string(), profile);
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.lock().get(uid).cloned())
    }
}
