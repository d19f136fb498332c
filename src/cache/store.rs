//! Cache keys and the storage capabilities the router runs on.

use std::fmt;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::StorageError;
use crate::{Method, Request, Response};

/// Request identity: method plus URL (path and query).
///
/// # Examples
///
/// ```
/// use pantry::cache::CacheKey;
/// use pantry::{Method, Request};
///
/// let key = CacheKey::from_request(&Request::new(Method::Get, "/api/recipes?page=2"));
/// assert_eq!(key.to_string(), "GET /api/recipes?page=2");
/// assert_eq!(key.digest().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method().clone(), request.url())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hex SHA-256 of the key, usable as a file name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// One named cache: request identity → stored response.
///
/// `put` overwrites; concurrent writers to the same key are last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored response for `key`, if any.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, StorageError>;

    /// Stores a copy of `response` under `key`.
    async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), StorageError>;
}

/// The set of named caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    type Store: CacheStore + 'static;

    /// Opens `name`, creating it when missing.
    async fn open(&self, name: &str) -> Result<Self::Store, StorageError>;

    /// Names of every existing cache.
    async fn names(&self) -> Result<Vec<String>, StorageError>;

    /// Deletes `name` and its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;
}
