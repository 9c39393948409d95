//! Router collaborator. The dispatcher registers generated routes against
//! [`Routeable`] and never depends on a concrete router implementation;
//! [`axum_router::AxumRouter`] is the built-in one.

pub mod axum_router;

use axum::extract::Request;
use axum::http::Method;
use axum::response::Response;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed response future produced by a route handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Type-erased route handler: the raw request plus decoded path parameters.
pub type RouteHandler =
    Arc<dyn Fn(Request, HashMap<String, String>) -> HandlerFuture + Send + Sync>;

/// Minimal capability set the dispatcher needs from a router.
pub trait Routeable: Send + Sync {
    /// Bind `handler` to `method` on `path`. Paths use `:name` placeholders
    /// for parameters, e.g. `/v1/posts/:id`.
    fn register_route(&self, method: Method, path: &str, handler: RouteHandler);

    /// The finished handler for serving everything registered so far.
    fn handler(&self) -> axum::Router;
}
