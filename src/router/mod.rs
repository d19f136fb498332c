//! Route tables — map URL patterns (and optionally methods) to values.
//!
//! Both request-facing layers of the proxy are table driven: the schema
//! layer maps write routes to the record schema that guards them, and the
//! offline cache maps paths to a caching strategy. [`RouteTable`] is the
//! shared shape. Three pattern styles are supported:
//!
//! | Pattern                 | Example match               | Captured params        |
//! |-------------------------|-----------------------------|------------------------|
//! | `/manifest.json`        | `/manifest.json`            | *(none)*               |
//! | `/api/recipes/:id`      | `/api/recipes/42`           | `id → "42"`            |
//! | `/api/recipes/*`        | `/api/recipes/42/notes`     | `wildcard → "/42/notes"` |
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so
//! `/api/recipes/` and `/api/recipes` are treated as equivalent.
//!
//! Entries are matched in insertion order; the first entry whose method and
//! pattern both match wins, so more specific entries go first.

use crate::Method;
use crate::context::PathParams;

/// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
pub enum Segment {
    Static(String),
    Parameter(String),
}

/// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches one exact path string, e.g. `/manifest.json`.
    Exact(String),
    /// Matches a fixed number of segments where some may be named captures.
    Parameterized { segments: Vec<Segment> },
    /// Matches the prefix itself and any path below it, e.g. `/api/chat/*`.
    Wildcard(String),
}

impl Pattern {
    /// Parse a route pattern string into a `Pattern`.
    ///
    /// The pattern is classified as follows (checked in order):
    ///
    /// 1. Ends with `/*` → [`Pattern::Wildcard`].
    /// 2. Contains `:` → [`Pattern::Parameterized`].
    /// 3. Otherwise → [`Pattern::Exact`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pantry::router::Pattern;
    ///
    /// let p = Pattern::parse("/api/recipes/:id");
    /// assert_eq!(p.matches("/api/recipes/42").unwrap().get("id"), Some("42"));
    /// ```
    pub fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Pattern::Wildcard(prefix.to_string());
        }

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(p) => Segment::Parameter(p.to_string()),
                    None => Segment::Static(s.to_string()),
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    /// An exact pattern, taken literally even if it contains `:` or `*`.
    pub fn exact(path: &str) -> Self {
        Pattern::Exact(trim_trailing_slash(path).to_string())
    }

    /// A prefix pattern matching `prefix` and everything below it.
    ///
    /// Matching is segment aware: `/api/chat` covers `/api/chat/send` but
    /// not `/api/chatter`.
    pub fn prefix(prefix: &str) -> Self {
        Pattern::Wildcard(trim_trailing_slash(prefix).to_string())
    }

    /// Try to match `path`, returning the extracted [`PathParams`] on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let mut params = PathParams::new();
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

                if segments.len() != path_segments.len() {
                    return None;
                }

                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) => {
                            if s != path_seg {
                                return None;
                            }
                        }
                        Segment::Parameter(name) => {
                            params.insert(name.clone(), path_seg.to_string());
                        }
                    }
                }

                Some(params)
            }
            Pattern::Wildcard(prefix) => {
                let suffix = path.strip_prefix(prefix.as_str())?;
                // A root prefix covers everything; otherwise stop at a segment boundary.
                let covers_all = prefix.is_empty() || prefix == "/";
                if !covers_all && !suffix.is_empty() && !suffix.starts_with('/') {
                    return None;
                }
                let mut params = PathParams::new();
                params.insert("wildcard".to_string(), suffix.to_string());
                Some(params)
            }
        }
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

// A single table entry binding an optional method + pattern to a value.
#[derive(Debug, Clone)]
struct Entry<T> {
    method: Option<Method>,
    pattern: Pattern,
    value: T,
}

/// An ordered table of patterns, evaluated top to bottom.
///
/// # Examples
///
/// ```
/// use pantry::Method;
/// use pantry::router::RouteTable;
///
/// let mut table = RouteTable::new();
/// table.insert(Some(Method::Post), "/api/recipes", "recipe");
/// table.insert(None, "/api/recipes/*", "recipe-read");
///
/// let (value, _) = table.find(&Method::Post, "/api/recipes").unwrap();
/// assert_eq!(*value, "recipe");
/// let (value, params) = table.find(&Method::Get, "/api/recipes/7").unwrap();
/// assert_eq!(*value, "recipe-read");
/// assert_eq!(params.get("wildcard"), Some("/7"));
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. `None` for `method` matches any method.
    pub fn insert(&mut self, method: Option<Method>, pattern: &str, value: T) {
        self.push(method, Pattern::parse(pattern), value);
    }

    /// Append an entry with an already compiled pattern.
    pub fn push(&mut self, method: Option<Method>, pattern: Pattern, value: T) {
        self.entries.push(Entry {
            method,
            pattern,
            value,
        });
    }

    /// Return the first entry matching `method` and `path`, with its captured params.
    pub fn find(&self, method: &Method, path: &str) -> Option<(&T, PathParams)> {
        self.entries.iter().find_map(|entry| {
            if entry.method.as_ref().is_some_and(|m| m != method) {
                return None;
            }
            entry.pattern.matches(path).map(|params| (&entry.value, params))
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
