//! Cache storage persisted to the local filesystem.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<cache-name>/.pantry-store         empty marker, written by `open`
//! <root>/<cache-name>/<sha256-of-key>.json   status, headers, key, body digest, stored_at
//! <root>/<cache-name>/<sha256-of-key>.body   raw body bytes
//! ```
//!
//! Both files are written to a temporary name and renamed into place, body
//! first. The metadata records the SHA-256 of its body; a lookup that finds a
//! body from a different write (an overwrite in progress, or a crash between
//! the two renames) reports a miss rather than mixing two entries.
//!
//! Only directories carrying the marker file are listed or deleted, so a
//! root shared with unrelated data is left alone.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::{CacheKey, CacheStorage, CacheStore, StorageError};
use crate::http::Headers;
use crate::{Response, StatusCode};

/// Metadata written beside each body file.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body_sha256: String,
    stored_at: DateTime<Utc>,
}

const STORE_MARKER: &str = ".pantry-store";

fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

async fn is_store(dir: &Path) -> Result<bool, StorageError> {
    fs::try_exists(dir.join(STORE_MARKER))
        .await
        .map_err(|e| io_error(dir, e))
}

/// Named caches as directories under `root`.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StorageError::InvalidName(name.to_owned()));
        }
        Ok(self.root.join(name))
    }
}

/// One cache directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
    // Distinguishes temp files of concurrent writers.
    seq: Arc<AtomicU64>,
}

impl DiskStore {
    fn paths(&self, key: &CacheKey) -> (PathBuf, PathBuf) {
        let digest = key.digest();
        (
            self.dir.join(format!("{digest}.json")),
            self.dir.join(format!("{digest}.body")),
        )
    }

    fn temp_path(&self, target: &Path) -> PathBuf {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.{n}.tmp", std::process::id()));
        target.with_file_name(name)
    }

    async fn write_atomic(&self, target: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let tmp = self.temp_path(target);
        fs::write(&tmp, contents).await.map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_error(target, e));
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_owned(),
        source,
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, StorageError> {
        let (meta_path, body_path) = self.paths(key);

        let raw = match fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&meta_path, e)),
        };
        let meta: EntryMeta = serde_json::from_slice(&raw)?;

        // Digest collisions are not expected; a mismatch means a foreign file.
        if meta.method != key.method().as_str() || meta.url != key.url() {
            warn!(path = %meta_path.display(), %key, "cache entry key mismatch, ignoring");
            return Ok(None);
        }
        let Some(status) = StatusCode::from_u16(meta.status) else {
            warn!(path = %meta_path.display(), status = meta.status, "unknown status in cache entry");
            return Ok(None);
        };

        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %body_path.display(), "cache entry body missing");
                return Ok(None);
            }
            Err(e) => return Err(io_error(&body_path, e)),
        };
        if body_digest(&body) != meta.body_sha256 {
            debug!(%key, path = %body_path.display(), "cache entry body belongs to another write");
            return Ok(None);
        }

        let headers: Headers = meta.headers.into_iter().collect();
        Ok(Some(Response::from_parts(status, headers, body)))
    }

    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), StorageError> {
        let (meta_path, body_path) = self.paths(key);
        let meta = EntryMeta {
            method: key.method().as_str().to_owned(),
            url: key.url().to_owned(),
            status: response.status().as_u16(),
            headers: response
                .headers()
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            body_sha256: body_digest(response.bytes()),
            stored_at: Utc::now(),
        };
        let meta = serde_json::to_vec(&meta)?;

        self.write_atomic(&body_path, response.bytes()).await?;
        self.write_atomic(&meta_path, &meta).await?;
        debug!(%key, dir = %self.dir.display(), "cache entry written");
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    type Store = DiskStore;

    async fn open(&self, name: &str) -> Result<DiskStore, StorageError> {
        let dir = self.store_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        if !is_store(&dir).await? {
            let marker = dir.join(STORE_MARKER);
            fs::write(&marker, b"")
                .await
                .map_err(|e| io_error(&marker, e))?;
        }
        Ok(DiskStore {
            dir,
            seq: Arc::new(AtomicU64::new(0)),
        })
    }

    async fn names(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| io_error(&entry.path(), e))?
                .is_dir();
            if !is_dir || !is_store(&entry.path()).await? {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let dir = self.store_dir(name)?;
        if !is_store(&dir).await? {
            if fs::try_exists(&dir).await.unwrap_or(false) {
                warn!(dir = %dir.display(), "refusing to delete a directory that is not a cache store");
            }
            return Ok(false);
        }
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&dir, e)),
        }
    }
}
