//! Default [`Routeable`] implementation on top of axum.

use super::{RouteHandler, Routeable};
use axum::extract::{Path, Request};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodFilter;
use std::collections::HashMap;
use std::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::HttpError;

/// Request bodies beyond this are rejected before dispatch.
const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Accumulates generated routes into an `axum::Router`. Routes registered
/// through several API versions land in the same router, so one listener can
/// serve all of them.
pub struct AxumRouter {
    // Option so route() can consume and replace the builder-style Router.
    inner: Mutex<Option<axum::Router>>,
}

impl AxumRouter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Some(axum::Router::new())),
        }
    }
}

impl Default for AxumRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Routeable for AxumRouter {
    fn register_route(&self, method: Method, path: &str, handler: RouteHandler) {
        let filter = match method.as_str() {
            "GET" => MethodFilter::GET,
            "POST" => MethodFilter::POST,
            "PATCH" => MethodFilter::PATCH,
            "PUT" => MethodFilter::PUT,
            "DELETE" => MethodFilter::DELETE,
            "HEAD" => MethodFilter::HEAD,
            "OPTIONS" => MethodFilter::OPTIONS,
            other => {
                tracing::warn!(method = %other, path = %path, "unsupported method, route not registered");
                return;
            }
        };

        let service = axum::routing::on(
            filter,
            move |params: Option<Path<HashMap<String, String>>>, request: Request| {
                let handler = handler.clone();
                async move {
                    let params = params.map(|Path(p)| p).unwrap_or_default();
                    handler(request, params).await
                }
            },
        );

        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let router = guard.take().unwrap_or_default();
        *guard = Some(router.route(path, service));
    }

    fn handler(&self) -> axum::Router {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .clone()
            .unwrap_or_default()
            .fallback(not_found)
            .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
    }
}

async fn not_found() -> Response {
    HttpError::not_found("no route matches this URL").into_response()
}
