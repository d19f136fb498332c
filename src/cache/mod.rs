//! Offline cache routing.
//!
//! A [`CacheRouter`] sits between the pipeline and the origin. On startup it
//! is installed (static assets fetched into a store named after the cache
//! version) and activated (stores of every other version deleted). After
//! that each request is classified by a [`CachePolicy`] and served with one
//! of three [`Strategy`]s:
//!
//! - **cache-first**: static assets and recipe reads. A stored copy is
//!   returned without touching the network.
//! - **network-first-write**: chat. Always fetched; every successful
//!   response replaces the stored copy.
//! - **network-first-fallback**: everything else. Fetched without storing;
//!   when the network fails a previously stored copy is served instead.
//!
//! Storage is pluggable through [`CacheStorage`]/[`CacheStore`]
//! ([`MemoryStorage`], [`DiskStorage`]); the network through [`Fetch`]
//! ([`UpstreamFetcher`]).

mod disk;
mod error;
mod fetch;
mod memory;
mod middleware;
mod router;
mod store;
mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use disk::{DiskStorage, DiskStore};
pub use error::{CacheError, FetchError, StorageError};
pub use fetch::{Fetch, UpstreamFetcher};
pub use memory::{MemoryStorage, MemoryStore};
pub use middleware::{CACHE_STATUS_HEADER, OfflineMiddleware};
pub use router::{CacheRouter, Phase, Served, Source};
pub use store::{CacheKey, CacheStorage, CacheStore};
pub use strategy::{CachePolicy, CachePolicyBuilder, Strategy};
