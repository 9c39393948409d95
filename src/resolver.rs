//! Base-URL resolution for generated resource links.

use axum::http::request::Parts;

/// Strategy for the base URL prefixed onto generated `links` values.
///
/// The inbound request head is handed over explicitly (when one exists) so
/// implementations stay stateless and can be shared across concurrent
/// requests without synchronization.
pub trait UrlResolver: Send + Sync {
    fn base_url(&self, request: Option<&Parts>) -> String;
}

/// Always answers with the URL given at construction.
pub struct StaticResolver {
    base_url: String,
}

impl StaticResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl UrlResolver for StaticResolver {
    fn base_url(&self, _request: Option<&Parts>) -> String {
        self.base_url.clone()
    }
}

/// Computes the base URL from the inbound request via a user callback, e.g.
/// to vary links by Host header or tenant. Answers with an empty base URL
/// when no request is in flight.
pub struct CallbackResolver {
    callback: Box<dyn Fn(&Parts) -> String + Send + Sync>,
}

impl CallbackResolver {
    pub fn new(callback: impl Fn(&Parts) -> String + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl UrlResolver for CallbackResolver {
    fn base_url(&self, request: Option<&Parts>) -> String {
        request
            .map(|r| (self.callback)(r))
            .unwrap_or_default()
    }
}
