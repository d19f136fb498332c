//! The offline cache router: lifecycle plus per-request strategy execution.

use tracing::{debug, info, warn};

use super::{
    CacheError, CacheKey, CachePolicy, CacheStorage, CacheStore, Fetch, FetchError, Strategy,
};
use crate::{Method, Request, Response};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
}

/// A response plus its origin.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: Source::Network,
        }
    }

    fn cache(response: Response) -> Self {
        Self {
            response,
            source: Source::Cache,
        }
    }
}

/// Lifecycle position of a [`CacheRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing installed; requests go straight to the network.
    Idle,
    /// The current store is populated but older versions may still exist.
    Installed,
    /// Stale versions are purged and requests are served by strategy.
    Active,
}

/// Routes requests through a versioned cache store.
///
/// The router is driven through [`install`](Self::install) and
/// [`activate`](Self::activate) once at startup, then shared (usually in an
/// `Arc`) and asked to [`handle`](Self::handle) requests concurrently. The
/// store is the only state requests share.
///
/// # Examples
///
/// ```rust,no_run
/// use pantry::cache::{CachePolicy, CacheRouter, MemoryStorage, UpstreamFetcher};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let assets = vec!["/".to_string(), "/manifest.json".to_string()];
/// let policy = CachePolicy::standard(&assets, "/api/recipes", "/api/chat");
/// let fetcher = UpstreamFetcher::new("http://127.0.0.1:3000", None)?;
///
/// let mut router = CacheRouter::new(MemoryStorage::new(), fetcher, "pantry-v1", assets, policy);
/// router.install().await?;
/// let purged = router.activate().await?;
/// # Ok(())
/// # }
/// ```
pub struct CacheRouter<S: CacheStorage, F: Fetch> {
    storage: S,
    fetcher: F,
    version: String,
    static_assets: Vec<String>,
    policy: CachePolicy,
    store: Option<S::Store>,
    phase: Phase,
}

impl<S: CacheStorage, F: Fetch> CacheRouter<S, F> {
    pub fn new(
        storage: S,
        fetcher: F,
        version: impl Into<String>,
        static_assets: Vec<String>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            storage,
            fetcher,
            version: version.into(),
            static_assets,
            policy,
            store: None,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Fetches every static asset, then writes them into the current store.
    ///
    /// Nothing is written until every asset has been fetched, so a network
    /// failure leaves storage as it was. A failed write deletes the store,
    /// which can only be partially populated at that point. Any failure
    /// aborts the install and the router stays [`Phase::Idle`].
    pub async fn install(&mut self) -> Result<(), CacheError> {
        let abort = |source: CacheError| CacheError::InstallAborted {
            cache: self.version.clone(),
            source: Box::new(source),
        };

        let mut fetched = Vec::with_capacity(self.static_assets.len());
        for asset in &self.static_assets {
            let request = Request::new(Method::Get, asset);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| abort(e.into()))?;
            if !response.is_success() {
                return Err(abort(CacheError::PrecacheStatus {
                    url: asset.clone(),
                    status: response.status().as_u16(),
                }));
            }
            fetched.push((CacheKey::from_request(&request), response));
        }

        let store = self
            .storage
            .open(&self.version)
            .await
            .map_err(|e| abort(e.into()))?;

        for (key, response) in &fetched {
            if let Err(e) = store.put(key, response).await {
                if let Err(cleanup) = self.storage.delete(&self.version).await {
                    warn!(cache = %self.version, error = %cleanup, "failed to delete partial cache");
                }
                return Err(abort(e.into()));
            }
        }

        info!(cache = %self.version, assets = fetched.len(), "cache installed");
        self.store = Some(store);
        self.phase = Phase::Installed;
        Ok(())
    }

    /// Adopts an existing store for the current version without precaching.
    ///
    /// Used when installing is impossible (the origin is down at startup)
    /// but an earlier run left a populated store behind. Returns `false` when
    /// there is no such store.
    pub async fn resume(&mut self) -> Result<bool, CacheError> {
        let names = self.storage.names().await?;
        if !names.iter().any(|n| *n == self.version) {
            return Ok(false);
        }
        self.store = Some(self.storage.open(&self.version).await?);
        self.phase = Phase::Installed;
        info!(cache = %self.version, "resumed existing cache");
        Ok(true)
    }

    /// Deletes every store whose name is not the current version and starts
    /// serving by strategy. Returns the deleted names.
    pub async fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        if self.phase == Phase::Idle {
            return Err(CacheError::NotInstalled(self.version.clone()));
        }

        let mut deleted = Vec::new();
        for name in self.storage.names().await? {
            if name == self.version {
                continue;
            }
            if self.storage.delete(&name).await? {
                info!(cache = %name, "deleted stale cache");
                deleted.push(name);
            }
        }

        self.phase = Phase::Active;
        info!(cache = %self.version, purged = deleted.len(), "cache active");
        Ok(deleted)
    }

    /// Serves one request.
    ///
    /// Before activation every request goes to the network untouched.
    pub async fn handle(&self, request: &Request) -> Result<Served, CacheError> {
        let store = match (&self.store, self.phase) {
            (Some(store), Phase::Active) => store,
            _ => return Ok(Served::network(self.fetcher.fetch(request).await?)),
        };

        let strategy = self.policy.classify(request);
        let key = CacheKey::from_request(request);
        debug!(%key, %strategy, "routing request");

        match strategy {
            Strategy::CacheFirst => self.cache_first(store, &key, request).await,
            Strategy::NetworkFirstWrite => self.network_first_write(store, &key, request).await,
            Strategy::NetworkFirstFallback => {
                self.network_first_fallback(store, &key, request).await
            }
        }
    }

    async fn cache_first(
        &self,
        store: &S::Store,
        key: &CacheKey,
        request: &Request,
    ) -> Result<Served, CacheError> {
        if let Some(hit) = lookup(store, key).await {
            return Ok(Served::cache(hit));
        }
        let response = self.fetcher.fetch(request).await?;
        store_copy(store, key, &response).await;
        Ok(Served::network(response))
    }

    async fn network_first_write(
        &self,
        store: &S::Store,
        key: &CacheKey,
        request: &Request,
    ) -> Result<Served, CacheError> {
        let response = self.fetcher.fetch(request).await?;
        store_copy(store, key, &response).await;
        Ok(Served::network(response))
    }

    async fn network_first_fallback(
        &self,
        store: &S::Store,
        key: &CacheKey,
        request: &Request,
    ) -> Result<Served, CacheError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(Served::network(response)),
            Err(e) => fallback(store, key, e).await,
        }
    }
}

async fn fallback<T: CacheStore>(
    store: &T,
    key: &CacheKey,
    error: FetchError,
) -> Result<Served, CacheError> {
    match lookup(store, key).await {
        Some(hit) => {
            info!(%key, error = %error, "network failed, serving cached copy");
            Ok(Served::cache(hit))
        }
        None => Err(error.into()),
    }
}

// Store reads never fail a request; an unreadable entry is a miss.
async fn lookup<T: CacheStore>(store: &T, key: &CacheKey) -> Option<Response> {
    match store.lookup(key).await {
        Ok(hit) => hit,
        Err(e) => {
            warn!(%key, error = %e, "cache read failed, treating as miss");
            None
        }
    }
}

// Only 2xx responses are stored. A failed write is logged and the network
// response is still returned.
async fn store_copy<T: CacheStore>(store: &T, key: &CacheKey, response: &Response) {
    if !response.is_success() {
        debug!(%key, status = response.status().as_u16(), "not caching non-success response");
        return;
    }
    if let Err(e) = store.put(key, response).await {
        warn!(%key, error = %e, "cache write failed");
    }
}
