//! Before/after handler chains wrapping every generated route.

use crate::context::RequestContext;
use crate::error::HttpError;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs before the resource operation. Returning an error short-circuits the
/// remaining before-handlers and the operation itself; the after chain still
/// runs and receives that error.
#[async_trait]
pub trait BeforeMiddleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), HttpError>;
}

/// Runs after the resource operation, in registration order, whether the
/// request succeeded or failed. Observes the outcome but cannot suppress it
/// from the final response.
#[async_trait]
pub trait AfterMiddleware: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext, error: Option<&HttpError>);
}

/// Adapter so a plain closure can serve as a before-middleware.
pub struct BeforeFn<F>(pub F);

#[async_trait]
impl<F> BeforeMiddleware for BeforeFn<F>
where
    F: Fn(&mut RequestContext) -> Result<(), HttpError> + Send + Sync,
{
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), HttpError> {
        (self.0)(ctx)
    }
}

/// Adapter so a plain closure can serve as an after-middleware.
pub struct AfterFn<F>(pub F);

#[async_trait]
impl<F> AfterMiddleware for AfterFn<F>
where
    F: Fn(&mut RequestContext, Option<&HttpError>) + Send + Sync,
{
    async fn handle(&self, ctx: &mut RequestContext, error: Option<&HttpError>) {
        (self.0)(ctx, error)
    }
}

/// The two ordered chains. Route closures read it per request; registration
/// appends to it during startup.
#[derive(Default)]
pub struct MiddlewarePipeline {
    pub(crate) before: Vec<Arc<dyn BeforeMiddleware>>,
    pub(crate) after: Vec<Arc<dyn AfterMiddleware>>,
}

impl MiddlewarePipeline {
    pub(crate) fn chains(&self) -> (Vec<Arc<dyn BeforeMiddleware>>, Vec<Arc<dyn AfterMiddleware>>) {
        (self.before.clone(), self.after.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::Request;
    use serde_json::json;
    use std::collections::HashMap;

    fn context() -> RequestContext {
        let (parts, _) = Request::builder()
            .uri("/posts")
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::new(parts, HashMap::new(), Bytes::new())
    }

    #[tokio::test]
    async fn before_handlers_run_in_registration_order() {
        let first = BeforeFn(|ctx: &mut RequestContext| -> Result<(), HttpError> {
            ctx.set("order", json!(["first"]));
            Ok(())
        });
        let second = BeforeFn(|ctx: &mut RequestContext| -> Result<(), HttpError> {
            let mut seen = ctx.get("order").cloned().unwrap_or(json!([]));
            seen.as_array_mut().unwrap().push(json!("second"));
            ctx.set("order", seen);
            Ok(())
        });

        let mut ctx = context();
        first.handle(&mut ctx).await.unwrap();
        second.handle(&mut ctx).await.unwrap();
        assert_eq!(ctx.get("order"), Some(&json!(["first", "second"])));
    }

    #[tokio::test]
    async fn after_handler_observes_the_error() {
        let after = AfterFn(|ctx: &mut RequestContext, error: Option<&HttpError>| {
            ctx.set("saw_error", json!(error.is_some()));
        });

        let mut ctx = context();
        let err = HttpError::forbidden("nope");
        after.handle(&mut ctx, Some(&err)).await;
        assert_eq!(ctx.get("saw_error"), Some(&json!(true)));
    }
}
