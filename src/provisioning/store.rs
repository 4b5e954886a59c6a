//! Per-user document storage.
//!
//! # Responsibilities
//! - Read and write string fields on a user's record
//! - Provide an atomic compare-and-set used to write the wallet address once
//!
//! # Design Decisions
//! - The store is consumed through `DocumentStore`; the hosted database of a
//!   deployment plugs in behind the same trait
//! - `MemoryStore` locks one record at a time through its `DashMap` shard
//! - `JsonFileStore` keeps the whole document in memory and rewrites it with a
//!   temp file plus rename, so a crash never leaves a half-written file

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::chain::UserId;

/// Document store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store document: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value fields on per-user records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_field(&self, user: &UserId, field: &str) -> Result<Option<String>, StoreError>;

    async fn set_field(&self, user: &UserId, field: &str, value: &str) -> Result<(), StoreError>;

    /// Write `value` only if the field currently equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    async fn compare_and_set(
        &self,
        user: &UserId,
        field: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError>;
}

/// In-process store, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<UserId, HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_field(&self, user: &UserId, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.get(user).and_then(|record| record.get(field).cloned()))
    }

    async fn set_field(&self, user: &UserId, field: &str, value: &str) -> Result<(), StoreError> {
        self.records
            .entry(user.clone())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        user: &UserId,
        field: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut record = self.records.entry(user.clone()).or_default();
        if record.get(field).map(String::as_str) != expected {
            return Ok(false);
        }
        record.insert(field.to_string(), value.to_string());
        Ok(true)
    }
}

type Document = BTreeMap<String, BTreeMap<String, String>>;

/// Store backed by a single JSON document on disk.
///
/// Layout: `{ "<user id>": { "<field>": "<value>" } }`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let document = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Document::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), users = document.len(), "JSON store opened");
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &Document) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_field(&self, user: &UserId, field: &str) -> Result<Option<String>, StoreError> {
        let document = self.document.lock().await;
        Ok(document
            .get(user.as_str())
            .and_then(|record| record.get(field).cloned()))
    }

    async fn set_field(&self, user: &UserId, field: &str, value: &str) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        next.entry(user.as_str().to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        self.persist(&next).await?;
        *document = next;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        user: &UserId,
        field: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut document = self.document.lock().await;
        let current = document
            .get(user.as_str())
            .and_then(|record| record.get(field))
            .map(String::as_str);
        if current != expected {
            return Ok(false);
        }

        let mut next = document.clone();
        next.entry(user.as_str().to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        self.persist(&next).await?;
        *document = next;
        Ok(true)
    }
}
