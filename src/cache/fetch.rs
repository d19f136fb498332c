//! The network capability.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::FetchError;
use crate::http::Headers;
use crate::{Request, Response, StatusCode};

/// Performs a request against the network.
///
/// An `Ok` response of any status is a successful fetch; only transport
/// failures are errors.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

// Connection-scoped headers that must not be relayed by a proxy, plus the
// framing headers the server rewrites itself.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "host",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Forwards requests to the application's origin server.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use pantry::cache::UpstreamFetcher;
///
/// let fetcher = UpstreamFetcher::new("http://127.0.0.1:3000", Some(Duration::from_secs(10)))?;
/// # Ok::<(), reqwest::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
    base: String,
}

impl UpstreamFetcher {
    /// `base` is the origin, e.g. `http://127.0.0.1:3000`. Without a
    /// `timeout` requests wait as long as the transport does.
    pub fn new(base: impl Into<String>, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let base = base.into().trim_end_matches('/').to_owned();
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl Fetch for UpstreamFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = format!("{}{}", self.base, request.url());
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(request.method().to_string()))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in request.headers().iter() {
            if !is_hop_by_hop(name) {
                builder = builder.header(name, value);
            }
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().clone());
        }

        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };
        let upstream = builder.send().await.map_err(transport)?;

        let code = upstream.status().as_u16();
        let status = StatusCode::from_u16(code).unwrap_or_else(|| {
            warn!(%url, status = code, "unmodelled upstream status, relaying as 502");
            StatusCode::BadGateway
        });

        let mut headers = Headers::with_capacity(upstream.headers().len());
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name.as_str()) {
                continue;
            }
            match value.to_str() {
                Ok(value) => headers.insert(name.as_str(), value),
                Err(_) => debug!(%url, header = %name, "dropping non-ASCII upstream header"),
            }
        }

        let body = upstream.bytes().await.map_err(transport)?;
        debug!(%url, status = code, bytes = body.len(), "upstream responded");
        Ok(Response::from_parts(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn hop_by_hop_is_case_insensitive() {
        assert!(is_hop_by_hop("Transfer-Encoding"));
        assert!(is_hop_by_hop("HOST"));
        assert!(!is_hop_by_hop("Content-Type"));
    }

    #[test]
    fn base_trailing_slash_trimmed() {
        let fetcher = UpstreamFetcher::new("http://origin.test/", None).unwrap();
        assert_eq!(fetcher.base(), "http://origin.test");
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n[]",
            )
            .await
            .unwrap();
        });

        let fetcher = UpstreamFetcher::new(format!("http://{addr}"), None).unwrap();
        let resp = fetcher.fetch(&Request::new(Method::Get, "/api/recipes")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.headers().get("content-type"), Some("application/json"));
        assert!(!resp.headers().contains("content-length"));
        assert!(!resp.headers().contains("connection"));
        assert_eq!(resp.bytes().as_ref(), b"[]");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = UpstreamFetcher::new(format!("http://{addr}"), None).unwrap();
        let err = fetcher.fetch(&Request::new(Method::Get, "/")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
