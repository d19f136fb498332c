//! Per-request context handed through the middleware pipeline.
//!
//! A [`Context`] owns the [`Request`] while it travels down the stack and
//! carries any path parameters captured by a [`RouteTable`](crate::router::RouteTable)
//! lookup. The terminal stage takes the request back out with
//! [`Context::into_request`] to forward it upstream.

use std::collections::HashMap;

use bytes::Bytes;

use crate::Request;

/// Path parameters extracted from a matched pattern.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    /// Create a new empty parameters map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value into the parameters map
    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    /// Get a value from the parameters map
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Per-request state: the request itself plus captured path parameters.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Swaps the request body, e.g. after a middleware has rewritten a record.
    pub fn replace_body(&mut self, body: impl Into<Bytes>) {
        self.request.set_body(body);
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }

    pub fn into_request(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use serde_json::Value;

    #[test]
    fn json_body_round_trip() {
        let req = Request::new(Method::Post, "/api/recipes").with_body(r#"{"title":"Dal"}"#);
        let ctx = Context::new(req);
        let value: Value = ctx.json().unwrap();
        assert_eq!(value["title"], "Dal");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let req = Request::new(Method::Post, "/api/recipes").with_body("{title:");
        assert!(Context::new(req).json::<Value>().is_err());
    }

    #[test]
    fn replace_body_reaches_request() {
        let req = Request::new(Method::Put, "/api/preferences").with_body("{}");
        let mut ctx = Context::new(req);
        ctx.replace_body(r#"{"servings":2}"#);
        let req = ctx.into_request();
        assert_eq!(req.body().as_ref(), br#"{"servings":2}"#);
        assert_eq!(req.content_length(), Some(14));
    }

    #[test]
    fn params_are_carried() {
        let mut params = PathParams::new();
        params.insert("id".into(), "42".into());
        let ctx = Context::with_params(Request::new(Method::Get, "/api/recipes/42"), params);
        assert_eq!(ctx.params().get("id"), Some("42"));
        assert!(!ctx.params().is_empty());
    }
}
