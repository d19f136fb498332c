use std::path::PathBuf;

use thiserror::Error;

/// The network capability could not produce a response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// For [`Fetch`](super::Fetch) implementations that decline a request
    /// without attempting transport, e.g. while an outage is known or a
    /// circuit breaker is open. Treated like any other network failure.
    #[error("upstream unavailable for {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("method {0} cannot be forwarded upstream")]
    InvalidMethod(String),
}

/// A cache store could not be read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid cache name `{0}`")]
    InvalidName(String),
}

/// Errors surfaced by the [`CacheRouter`](super::CacheRouter).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("precaching {url} returned status {status}")]
    PrecacheStatus { url: String, status: u16 },

    #[error("install of cache `{cache}` aborted: {source}")]
    InstallAborted {
        cache: String,
        #[source]
        source: Box<CacheError>,
    },

    #[error("cache `{0}` must be installed before it is activated")]
    NotInstalled(String),
}

impl CacheError {
    /// `true` when the failure is the network's, not the store's.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::PrecacheStatus { .. } => true,
            Self::InstallAborted { source, .. } => source.is_network(),
            Self::Storage(_) | Self::NotInstalled(_) => false,
        }
    }
}
