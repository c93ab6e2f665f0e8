//! # Object Storage
//!
//! Uploaded images live in named buckets of an object store.  Each upload gets a fresh
//! key of the form `<YYYY-MM-DD>/<uuid>-<filename>` derived from the upload date, so
//! uploads never overwrite one another and are grouped by day.
//!
//! Two backends implement [`ObjectStore`]: [`LocalObjectStore`] keeps one directory per
//! bucket under a media root, [`InMemoryObjectStore`] keeps everything in a map for tests
//! and demo mode.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use regex::Regex;
use uuid::Uuid;

/// Errors raised by an object store backend.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// The bucket does not exist.
    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),

    /// The key is empty or escapes its bucket.
    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    /// No object is stored under the key.
    #[error("object {0} not found")]
    NotFound(String),

    /// The backend failed to read or write.
    #[error("object store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Internal state is unusable.
    #[error("object store failed: {0}")]
    Internal(String),
}

/// Storage for uploaded objects.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Creates `bucket` when it does not exist yet.
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    /// Stores `data` under `key` inside `bucket`, replacing any previous object.
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), ObjectStoreError>;

    /// Reads the object stored under `key` inside `bucket`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

////////////////////////////////////////////// object keys /////////////////////////////////////////////

fn unsafe_filename_chars() -> &'static Regex {
    static UNSAFE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("filename pattern is valid"))
}

/// Reduces `filename` to its final component with every unsafe run replaced by `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');
    let cleaned = unsafe_filename_chars().replace_all(base, "_");
    let cleaned = cleaned.trim_matches('_').trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Builds a fresh key for an upload made on `date`.
pub fn object_key_for(date: NaiveDate, filename: &str) -> String {
    format!(
        "{}/{}-{}",
        date.format("%Y-%m-%d"),
        Uuid::new_v4(),
        sanitize_filename(filename)
    )
}

/// Builds a fresh key for an upload made today (UTC).
pub fn object_key(filename: &str) -> String {
    object_key_for(Utc::now().date_naive(), filename)
}

/// Fails unless `key` is a relative path made of normal components.
pub fn check_key(key: &str) -> Result<(), ObjectStoreError> {
    let path = Path::new(key);
    if key.is_empty()
        || key.contains('\\')
        || !path.components().all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn check_bucket(bucket: &str) -> Result<(), ObjectStoreError> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket.starts_with('.') {
        return Err(ObjectStoreError::NoSuchBucket(bucket.to_string()));
    }
    Ok(())
}

/////////////////////////////////////////// LocalObjectStore ///////////////////////////////////////////

/// Filesystem object store: one directory per bucket under a media root.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Creates a store rooted at `root`; nothing is touched until first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, ObjectStoreError> {
        check_bucket(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, ObjectStoreError> {
        check_key(key)?;
        Ok(self.bucket_path(bucket)?.join(key))
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let path = self.bucket_path(bucket)?;
        tokio::fs::create_dir_all(&path).await?;
        tracing::debug!(bucket, path = %path.display(), "bucket ready");
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), ObjectStoreError> {
        let bucket_path = self.bucket_path(bucket)?;
        if !tokio::fs::try_exists(&bucket_path).await? {
            return Err(ObjectStoreError::NoSuchBucket(bucket.to_string()));
        }
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

////////////////////////////////////////// InMemoryObjectStore /////////////////////////////////////////

/// Object store that keeps every object in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    buckets: Arc<Mutex<HashSet<String>>>,
    objects: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store without buckets.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ObjectStoreError {
    ObjectStoreError::Internal("object store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        check_bucket(bucket)?;
        self.buckets
            .lock()
            .map_err(poisoned)?
            .insert(bucket.to_string());
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), ObjectStoreError> {
        check_key(key)?;
        if !self.buckets.lock().map_err(poisoned)?.contains(bucket) {
            return Err(ObjectStoreError::NoSuchBucket(bucket.to_string()));
        }
        self.objects
            .lock()
            .map_err(poisoned)?
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        check_key(key)?;
        self.objects
            .lock()
            .map_err(poisoned)?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }
}

/// Guesses a content type from the extension of `key`.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
