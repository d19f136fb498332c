//! Request classification: which caching strategy serves which URL.

use std::fmt;

use crate::router::{Pattern, RouteTable};
use crate::{Method, Request};

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Serve from the store; fetch and store on a miss.
    CacheFirst,
    /// Always fetch; store every successful response.
    NetworkFirstWrite,
    /// Fetch without storing; fall back to the store when the network fails.
    NetworkFirstFallback,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirstWrite => "network-first-write",
            Self::NetworkFirstFallback => "network-first-fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered strategy table with a fallback for unmatched requests.
///
/// Static assets are matched exactly and checked first; prefix rules follow,
/// longest prefix first. Cache-first rules only apply to `GET`, so writes
/// under a read prefix are never answered from the store.
///
/// # Examples
///
/// ```
/// use pantry::cache::{CachePolicy, Strategy};
/// use pantry::{Method, Request};
///
/// let policy = CachePolicy::standard(&["/", "/manifest.json"], "/api/recipes", "/api/chat");
///
/// let classify = |m, url| policy.classify(&Request::new(m, url));
/// assert_eq!(classify(Method::Get, "/manifest.json"), Strategy::CacheFirst);
/// assert_eq!(classify(Method::Get, "/api/recipes/42"), Strategy::CacheFirst);
/// assert_eq!(classify(Method::Post, "/api/chat/messages"), Strategy::NetworkFirstWrite);
/// assert_eq!(classify(Method::Get, "/api/preferences"), Strategy::NetworkFirstFallback);
/// ```
#[derive(Debug, Clone)]
pub struct CachePolicy {
    table: RouteTable<Strategy>,
    fallback: Strategy,
}

impl CachePolicy {
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// The app's table: static assets and recipe reads cache-first, chat
    /// network-first with cache writes, everything else network-first with
    /// cache fallback.
    pub fn standard<S: AsRef<str>>(static_assets: &[S], recipes_prefix: &str, chat_prefix: &str) -> Self {
        Self::builder()
            .static_assets(static_assets)
            .prefix(recipes_prefix, Strategy::CacheFirst)
            .prefix(chat_prefix, Strategy::NetworkFirstWrite)
            .build()
    }

    pub fn classify(&self, request: &Request) -> Strategy {
        self.table
            .find(request.method(), request.path())
            .map_or(self.fallback, |(strategy, _)| *strategy)
    }
}

/// Collects rules for a [`CachePolicy`].
#[derive(Debug)]
pub struct CachePolicyBuilder {
    assets: Vec<String>,
    prefixes: Vec<(String, Strategy)>,
    fallback: Strategy,
}

impl Default for CachePolicyBuilder {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            prefixes: Vec::new(),
            fallback: Strategy::NetworkFirstFallback,
        }
    }
}

impl CachePolicyBuilder {
    #[must_use]
    pub fn static_assets<S: AsRef<str>>(mut self, assets: &[S]) -> Self {
        self.assets
            .extend(assets.iter().map(|a| a.as_ref().to_owned()));
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>, strategy: Strategy) -> Self {
        self.prefixes.push((prefix.into(), strategy));
        self
    }

    #[must_use]
    pub fn fallback(mut self, strategy: Strategy) -> Self {
        self.fallback = strategy;
        self
    }

    pub fn build(mut self) -> CachePolicy {
        let mut table = RouteTable::new();
        for asset in &self.assets {
            table.push(Some(Method::Get), Pattern::exact(asset), Strategy::CacheFirst);
        }

        // Stable sort keeps insertion order among equal lengths.
        self.prefixes
            .sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
        for (prefix, strategy) in self.prefixes {
            let method = (strategy == Strategy::CacheFirst).then_some(Method::Get);
            table.push(method, Pattern::prefix(&prefix), strategy);
        }

        CachePolicy {
            table,
            fallback: self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CachePolicy {
        CachePolicy::standard(&["/", "/offline.html"], "/api/recipes", "/api/chat")
    }

    fn classify(method: Method, url: &str) -> Strategy {
        policy().classify(&Request::new(method, url))
    }

    #[test]
    fn static_assets_are_exact() {
        assert_eq!(classify(Method::Get, "/"), Strategy::CacheFirst);
        assert_eq!(classify(Method::Get, "/offline.html"), Strategy::CacheFirst);
        assert_eq!(classify(Method::Get, "/about"), Strategy::NetworkFirstFallback);
    }

    #[test]
    fn query_does_not_affect_classification() {
        assert_eq!(classify(Method::Get, "/api/recipes?page=3"), Strategy::CacheFirst);
    }

    #[test]
    fn chat_is_live_for_any_method() {
        assert_eq!(classify(Method::Post, "/api/chat"), Strategy::NetworkFirstWrite);
        assert_eq!(classify(Method::Get, "/api/chat/history"), Strategy::NetworkFirstWrite);
    }

    #[test]
    fn recipe_writes_are_not_cache_first() {
        assert_eq!(classify(Method::Post, "/api/recipes"), Strategy::NetworkFirstFallback);
        assert_eq!(classify(Method::Put, "/api/recipes/1"), Strategy::NetworkFirstFallback);
    }

    #[test]
    fn prefix_respects_segments() {
        assert_eq!(classify(Method::Get, "/api/recipesearch"), Strategy::NetworkFirstFallback);
    }

    #[test]
    fn longer_prefix_wins_regardless_of_order() {
        let policy = CachePolicy::builder()
            .prefix("/api", Strategy::NetworkFirstWrite)
            .prefix("/api/recipes", Strategy::CacheFirst)
            .build();
        let strategy = policy.classify(&Request::new(Method::Get, "/api/recipes/9"));
        assert_eq!(strategy, Strategy::CacheFirst);
        let strategy = policy.classify(&Request::new(Method::Get, "/api/plans"));
        assert_eq!(strategy, Strategy::NetworkFirstWrite);
    }

    #[test]
    fn fallback_is_configurable() {
        let policy = CachePolicy::builder().fallback(Strategy::CacheFirst).build();
        let strategy = policy.classify(&Request::new(Method::Delete, "/x"));
        assert_eq!(strategy, Strategy::CacheFirst);
        assert_eq!(strategy.to_string(), "cache-first");
    }
}
