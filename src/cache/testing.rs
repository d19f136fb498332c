//! A scripted network for exercising the router without sockets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Fetch, FetchError};
use crate::{Request, Response, StatusCode};

/// Answers `200` with the scripted body for known URLs and `404` otherwise.
/// Clones share the script, the call counter and the online switch.
#[derive(Clone)]
pub(crate) struct FakeNetwork {
    inner: Arc<Inner>,
}

struct Inner {
    calls: AtomicUsize,
    online: AtomicBool,
    bodies: Mutex<HashMap<String, String>>,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                calls: AtomicUsize::new(0),
                online: AtomicBool::new(true),
                bodies: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn with(self, url: &str, body: &str) -> Self {
        self.set(url, body);
        self
    }

    pub(crate) fn set(&self, url: &str, body: &str) {
        self.inner
            .bodies
            .lock()
            .unwrap()
            .insert(url.to_owned(), body.to_owned());
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url();
        if !self.inner.online.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable {
                url,
                reason: "offline".into(),
            });
        }
        let body = self.inner.bodies.lock().unwrap().get(&url).cloned();
        Ok(match body {
            Some(body) => Response::new(StatusCode::Ok).body(body),
            None => Response::new(StatusCode::NotFound),
        })
    }
}
