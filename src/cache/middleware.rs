//! The terminal pipeline stage: serve every request through the cache router.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::{CacheRouter, CacheStorage, Fetch, Source};
use crate::{
    Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

/// Header naming whether the response came from the store.
pub const CACHE_STATUS_HEADER: &str = "X-Pantry-Cache";

/// Answers requests through a shared [`CacheRouter`].
///
/// Never calls `next`. Network failures with nothing cached answer `504`,
/// any other router error `502`.
pub struct OfflineMiddleware<S: CacheStorage, F: Fetch> {
    router: Arc<CacheRouter<S, F>>,
}

impl<S: CacheStorage, F: Fetch> OfflineMiddleware<S, F> {
    pub fn new(router: Arc<CacheRouter<S, F>>) -> Self {
        Self { router }
    }
}

impl<S, F> Middleware for OfflineMiddleware<S, F>
where
    S: CacheStorage + 'static,
    F: Fetch + 'static,
{
    fn handle(&self, ctx: Context, _next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let router = Arc::clone(&self.router);

        Box::pin(async move {
            let request = ctx.into_request();
            match router.handle(&request).await {
                Ok(served) => {
                    let marker = match served.source {
                        Source::Cache => "hit",
                        Source::Network => "miss",
                    };
                    let mut response = served.response;
                    response.set_header(CACHE_STATUS_HEADER, marker);
                    response
                }
                Err(e) => {
                    let status = if e.is_network() {
                        StatusCode::GatewayTimeout
                    } else {
                        StatusCode::BadGateway
                    };
                    warn!(url = %request.url(), error = %e, status = status.as_u16(), "request failed");
                    Response::json(status, &json!({ "error": e.to_string() }))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeNetwork;
    use crate::cache::{CachePolicy, MemoryStorage};
    use crate::middleware::Pipeline;
    use crate::{Method, Request};

    async fn pipeline(net: FakeNetwork) -> Pipeline {
        let assets = vec!["/".to_string()];
        let policy = CachePolicy::standard(&assets, "/api/recipes", "/api/chat");
        let mut router = CacheRouter::new(MemoryStorage::new(), net, "v1", assets, policy);
        router.install().await.unwrap();
        router.activate().await.unwrap();
        Pipeline::builder()
            .layer(OfflineMiddleware::new(Arc::new(router)))
            .build()
    }

    #[tokio::test]
    async fn marks_hits_and_misses() {
        let net = FakeNetwork::new().with("/", "home").with("/api/recipes", "[]");
        let pipeline = pipeline(net).await;

        let hit = pipeline.handle(Request::new(Method::Get, "/")).await;
        assert_eq!(hit.headers().get(CACHE_STATUS_HEADER), Some("hit"));

        let miss = pipeline.handle(Request::new(Method::Get, "/api/recipes")).await;
        assert_eq!(miss.status(), StatusCode::Ok);
        assert_eq!(miss.headers().get(CACHE_STATUS_HEADER), Some("miss"));
    }

    #[tokio::test]
    async fn upstream_marker_is_replaced() {
        struct Spoofing;

        #[async_trait::async_trait]
        impl Fetch for Spoofing {
            async fn fetch(&self, _request: &Request) -> Result<Response, crate::cache::FetchError> {
                Ok(Response::new(StatusCode::Ok)
                    .header("x-pantry-cache", "hit")
                    .body("fresh"))
            }
        }

        let policy = CachePolicy::builder().build();
        let mut router = CacheRouter::new(MemoryStorage::new(), Spoofing, "v1", Vec::new(), policy);
        router.install().await.unwrap();
        router.activate().await.unwrap();
        let pipeline = Pipeline::builder()
            .layer(OfflineMiddleware::new(Arc::new(router)))
            .build();

        let resp = pipeline.handle(Request::new(Method::Get, "/api/preferences")).await;
        let markers: Vec<_> = resp.headers().get_all(CACHE_STATUS_HEADER).collect();
        assert_eq!(markers, vec!["miss"]);
    }

    #[tokio::test]
    async fn offline_without_copy_is_gateway_timeout() {
        let net = FakeNetwork::new().with("/", "home");
        let pipeline = pipeline(net.clone()).await;
        net.set_online(false);

        let resp = pipeline.handle(Request::new(Method::Get, "/api/preferences")).await;
        assert_eq!(resp.status(), StatusCode::GatewayTimeout);
        let body: serde_json::Value = serde_json::from_slice(resp.bytes()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("/api/preferences"));
    }
}
