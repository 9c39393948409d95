//! Per-request context threaded through middleware and data sources.

use axum::body::Bytes;
use axum::http::{request::Parts, Method, Uri};
use serde_json::Value;
use std::collections::HashMap;

/// Everything a middleware or data source may need from the in-flight
/// request: the request head, decoded path parameters, parsed query pairs,
/// the raw body, and a scratch map middlewares use to hand values down the
/// chain (auth principals, trace ids, and the like).
///
/// One context is created per request and dropped with it; it is never
/// shared between requests.
pub struct RequestContext {
    parts: Parts,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Bytes,
    values: HashMap<String, Value>,
}

impl RequestContext {
    pub(crate) fn new(parts: Parts, params: HashMap<String, String>, body: Bytes) -> Self {
        let query = parse_query(parts.uri.query());
        Self {
            parts,
            params,
            query,
            body,
            values: HashMap::new(),
        }
    }

    /// The request head (method, uri, headers, extensions).
    pub fn request(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// A decoded path parameter, e.g. `id` on `/posts/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Query string pairs. Pagination and sorting parameters for data-source
    /// extensions travel here untouched.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Raw request body. Empty for bodyless methods.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// A value a middleware stored earlier in the chain.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Store a value for later middlewares and the data source.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(query) = query else {
        return out;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((k, v)) => out.insert(k.to_string(), v.to_string()),
            None => out.insert(pair.to_string(), String::new()),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn context_for(uri: &str) -> RequestContext {
        let (parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        RequestContext::new(parts, HashMap::new(), Bytes::new())
    }

    #[test]
    fn query_pairs_are_parsed() {
        let ctx = context_for("/posts?page=2&sort=title&archived");
        assert_eq!(ctx.query().get("page").map(String::as_str), Some("2"));
        assert_eq!(ctx.query().get("sort").map(String::as_str), Some("title"));
        assert_eq!(ctx.query().get("archived").map(String::as_str), Some(""));
    }

    #[test]
    fn no_query_string_means_no_pairs() {
        let ctx = context_for("/posts");
        assert!(ctx.query().is_empty());
    }

    #[test]
    fn values_round_trip_through_the_scratch_map() {
        let mut ctx = context_for("/posts");
        assert!(ctx.get("user").is_none());
        ctx.set("user", json!({"id": "u1"}));
        assert_eq!(ctx.get("user"), Some(&json!({"id": "u1"})));
    }
}
