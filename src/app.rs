//! Wiring: configuration to a ready router, router to a request pipeline.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{
    CacheError, CachePolicy, CacheRouter, CacheStorage, Fetch, OfflineMiddleware, UpstreamFetcher,
};
use crate::config::Config;
use crate::middleware::{LoggerMiddleware, Pipeline};
use crate::schema::SchemaMiddleware;

/// Builds an idle router for `config` on top of `storage`.
pub fn router<S: CacheStorage>(
    config: &Config,
    storage: S,
) -> Result<CacheRouter<S, UpstreamFetcher>, reqwest::Error> {
    let fetcher = UpstreamFetcher::new(config.upstream.clone(), config.upstream_timeout)?;
    let policy = CachePolicy::standard(
        &config.static_assets,
        &config.recipes_prefix,
        &config.chat_prefix,
    );
    Ok(CacheRouter::new(
        storage,
        fetcher,
        config.cache_version.clone(),
        config.static_assets.clone(),
        policy,
    ))
}

/// Installs and activates `router`.
///
/// When the install fails (typically because the origin is unreachable at
/// startup) an existing store for the same version is adopted instead, so a
/// restart while offline still serves what was cached before. Returns the
/// names of the purged stale caches.
pub async fn bring_up<S: CacheStorage, F: Fetch>(
    router: &mut CacheRouter<S, F>,
) -> Result<Vec<String>, CacheError> {
    if let Err(e) = router.install().await {
        warn!(error = %e, "install failed, trying to resume existing cache");
        if !router.resume().await? {
            return Err(e);
        }
    }
    let purged = router.activate().await?;
    info!(cache = router.version(), purged = purged.len(), "offline cache ready");
    Ok(purged)
}

/// The request stack: logging, then record validation, then the cache.
pub fn pipeline<S, F>(router: Arc<CacheRouter<S, F>>) -> Pipeline
where
    S: CacheStorage + 'static,
    F: Fetch + 'static,
{
    Pipeline::builder()
        .layer(LoggerMiddleware)
        .layer(SchemaMiddleware::default())
        .layer(OfflineMiddleware::new(router))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeNetwork;
    use crate::cache::{CACHE_STATUS_HEADER, MemoryStorage, Phase};
    use crate::server::Server;
    use crate::{Method, Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn site() -> FakeNetwork {
        FakeNetwork::new()
            .with("/", "<html></html>")
            .with("/manifest.json", "{}")
            .with("/offline.html", "offline")
            .with("/api/recipes", r#"{"ok":true}"#)
            .with("/api/recipes/1", r#"{"title":"Soup"}"#)
    }

    async fn ready(net: FakeNetwork) -> Arc<CacheRouter<MemoryStorage, FakeNetwork>> {
        let cfg = config();
        let policy = CachePolicy::standard(&cfg.static_assets, &cfg.recipes_prefix, &cfg.chat_prefix);
        let mut router = CacheRouter::new(
            MemoryStorage::new(),
            net,
            cfg.cache_version,
            cfg.static_assets,
            policy,
        );
        bring_up(&mut router).await.unwrap();
        Arc::new(router)
    }

    #[test]
    fn router_from_default_config() {
        let router = router(&config(), MemoryStorage::new()).unwrap();
        assert_eq!(router.version(), "pantry-v1");
        assert_eq!(router.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn bring_up_fails_offline_without_previous_cache() {
        let net = site();
        net.set_online(false);
        let mut router = CacheRouter::new(
            MemoryStorage::new(),
            net,
            "v1",
            vec!["/".into()],
            CachePolicy::builder().build(),
        );
        let err = bring_up(&mut router).await.unwrap_err();
        assert!(matches!(err, CacheError::InstallAborted { .. }));
    }

    #[tokio::test]
    async fn invalid_write_never_reaches_origin() {
        let net = site();
        let pipeline = pipeline(ready(net.clone()).await);
        let before = net.calls();

        let req = Request::new(Method::Post, "/api/recipes").with_body(r#"{"title":"Soup"}"#);
        let resp = pipeline.handle(req).await;

        assert_eq!(resp.status(), StatusCode::UnprocessableEntity);
        assert_eq!(net.calls(), before);
    }

    #[tokio::test]
    async fn valid_write_is_forwarded() {
        let net = site();
        let pipeline = pipeline(ready(net.clone()).await);
        let before = net.calls();

        let req = Request::new(Method::Post, "/api/recipes").with_body(
            r#"{"userId":"u1","title":"Soup","ingredients":["water"],"instructions":["boil"]}"#,
        );
        let resp = pipeline.handle(req).await;

        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.headers().get(CACHE_STATUS_HEADER), Some("miss"));
        assert_eq!(net.calls(), before + 1);
    }

    #[tokio::test]
    async fn recipe_reads_survive_going_offline() {
        let net = site();
        let pipeline = pipeline(ready(net.clone()).await);

        let online = pipeline.handle(Request::new(Method::Get, "/api/recipes/1")).await;
        assert_eq!(online.headers().get(CACHE_STATUS_HEADER), Some("miss"));

        net.set_online(false);
        let offline = pipeline.handle(Request::new(Method::Get, "/api/recipes/1")).await;
        assert_eq!(offline.status(), StatusCode::Ok);
        assert_eq!(offline.headers().get(CACHE_STATUS_HEADER), Some("hit"));
        assert_eq!(offline.bytes().as_ref(), br#"{"title":"Soup"}"#);
    }

    #[tokio::test]
    async fn serves_pipeline_over_tcp() {
        let pipeline = pipeline(ready(site()).await);
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(server.run_until(
            move |req| {
                let pipeline = pipeline.clone();
                async move { pipeline.handle(req).await }
            },
            async move {
                let _ = rx.await;
            },
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /manifest.json HTTP/1.1\r\nHost: pantry\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let text = String::from_utf8(raw).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("X-Pantry-Cache: hit\r\n"));
        assert!(text.ends_with("{}"));

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
