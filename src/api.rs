//! The dispatcher: owns the registry, middleware pipeline, URL resolver and
//! router, generates the route set for every registered resource, and runs
//! each request through the before chain, the data source, and the after
//! chain.

use crate::context::RequestContext;
use crate::document::{LinkContext, Marshaler, SerdeCodec, Unmarshaler, MEDIA_TYPE};
use crate::endpoint::{OperationOutput, ResourceOps, TypedEndpoint};
use crate::error::{marshal_http_error, ConfigError, HttpError};
use crate::middleware::{AfterMiddleware, BeforeMiddleware, MiddlewarePipeline};
use crate::registry::{ResourceRecord, ResourceRegistry};
use crate::resolver::{StaticResolver, UrlResolver};
use crate::resource::{Resource, TypeDescriptor};
use crate::routing::{axum_router::AxumRouter, RouteHandler, Routeable};
use crate::source::DataSource;
use axum::extract::Request;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// State a generated route closure needs at request time. The pipeline sits
/// behind a lock because middleware registration may still happen after the
/// closures were built; everything else is fixed at construction.
struct RouteContext {
    content_type: String,
    prefix: String,
    resolver: Arc<dyn UrlResolver>,
    pipeline: RwLock<MiddlewarePipeline>,
}

/// A REST JSON:API for one path prefix.
///
/// Registration (`add_resource`, `use_before_middleware`,
/// `use_after_middleware`, `new_api_version`) is a single-threaded startup
/// phase; it takes `&mut self` and must finish before [`Api::handler`] starts
/// serving. After startup the registry and resolver are only ever read.
pub struct Api {
    context: Arc<RouteContext>,
    registry: ResourceRegistry,
    router: Arc<dyn Routeable>,
}

impl Api {
    /// An API with no base URL and the default axum-backed router.
    /// `prefix` is put in front of all endpoints, e.g. `"v1"`.
    pub fn new(prefix: &str) -> Self {
        Self::with_routing(prefix, StaticResolver::new(""), AxumRouter::new())
    }

    /// Like [`Api::new`], with `base_url` prepended to all generated links:
    /// `http://localhost/v1/posts/1` instead of `/v1/posts/1`.
    pub fn with_base_url(prefix: &str, base_url: &str) -> Self {
        Self::with_routing(prefix, StaticResolver::new(base_url), AxumRouter::new())
    }

    /// Like [`Api::new`], with a custom URL resolution strategy.
    pub fn with_resolver(prefix: &str, resolver: impl UrlResolver + 'static) -> Self {
        Self::with_routing(prefix, resolver, AxumRouter::new())
    }

    /// Everything custom: resolver and router.
    pub fn with_routing(
        prefix: &str,
        resolver: impl UrlResolver + 'static,
        router: impl Routeable + 'static,
    ) -> Self {
        Self::build(prefix, Arc::new(resolver), Arc::new(router))
    }

    fn build(prefix: &str, resolver: Arc<dyn UrlResolver>, router: Arc<dyn Routeable>) -> Self {
        Self {
            context: Arc::new(RouteContext {
                content_type: MEDIA_TYPE.to_string(),
                prefix: normalize_prefix(prefix),
                resolver,
                pipeline: RwLock::new(MiddlewarePipeline::default()),
            }),
            registry: ResourceRegistry::default(),
            router,
        }
    }

    /// Chain another API version behind the same listener. The new API shares
    /// this one's resolver and router but starts with an empty resource
    /// registry and empty middleware chains.
    pub fn new_api_version(&self, prefix: &str) -> Api {
        Self::build(prefix, self.context.resolver.clone(), self.router.clone())
    }

    /// Register a data source for the resource type `T`. Generates the CRUD
    /// route set for `T::resource_name()` immediately. Registering a name
    /// twice on the same API version is a configuration error.
    pub fn add_resource<T, S>(&mut self, source: S) -> Result<(), ConfigError>
    where
        T: Resource,
        S: DataSource<T> + 'static,
    {
        self.add_resource_with_codec::<T, S, SerdeCodec>(source, SerdeCodec)
    }

    /// Like [`Api::add_resource`] with a custom document codec for this
    /// resource.
    pub fn add_resource_with_codec<T, S, C>(&mut self, source: S, codec: C) -> Result<(), ConfigError>
    where
        T: Resource,
        S: DataSource<T> + 'static,
        C: Marshaler<T> + Unmarshaler<T> + 'static,
    {
        let name = T::resource_name();
        if name.is_empty() || name.contains('/') {
            return Err(ConfigError::InvalidResourceName(name.to_string()));
        }

        let ops: Arc<dyn ResourceOps> = Arc::new(TypedEndpoint::<T, S, C>::new(source, codec));
        // Reject duplicates before touching the router, which would otherwise
        // see overlapping paths.
        self.registry.insert(ResourceRecord {
            name: name.to_string(),
            descriptor: TypeDescriptor::of::<T>(),
            ops: ops.clone(),
        })?;

        let collection = format!("{}{}", self.context.prefix, name);
        let single = format!("{}/:id", collection);
        self.register_operation(Method::GET, &collection, &ops, Operation::FindAll);
        self.register_operation(Method::POST, &collection, &ops, Operation::Create);
        self.register_operation(Method::GET, &single, &ops, Operation::FindOne);
        self.register_operation(Method::PATCH, &single, &ops, Operation::Update);
        self.register_operation(Method::DELETE, &single, &ops, Operation::Delete);
        self.register_operation(
            Method::GET,
            &format!("{}/relationships/:relation", single),
            &ops,
            Operation::Relationship { related: false },
        );
        self.register_operation(
            Method::GET,
            &format!("{}/:relation", single),
            &ops,
            Operation::Relationship { related: true },
        );

        tracing::debug!(resource = %name, prefix = %self.context.prefix, "registered resource routes");
        Ok(())
    }

    /// Append a before-middleware. Runs in registration order in front of
    /// every generated route, including ones registered earlier.
    pub fn use_before_middleware(&mut self, middleware: impl BeforeMiddleware + 'static) {
        self.context
            .pipeline
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .before
            .push(Arc::new(middleware));
    }

    /// Append an after-middleware. Runs after every generated route,
    /// regardless of outcome.
    pub fn use_after_middleware(&mut self, middleware: impl AfterMiddleware + 'static) {
        self.context
            .pipeline
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .after
            .push(Arc::new(middleware));
    }

    /// The registered type for a resource name, `None` when unregistered.
    pub fn lookup_resource_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.registry.lookup_resource_type(name)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn router(&self) -> &Arc<dyn Routeable> {
        &self.router
    }

    pub fn resolver(&self) -> &Arc<dyn UrlResolver> {
        &self.context.resolver
    }

    /// Content type set on every generated response.
    pub fn content_type(&self) -> &str {
        &self.context.content_type
    }

    /// The normalized path prefix, with exactly one leading and trailing `/`.
    pub fn prefix(&self) -> &str {
        &self.context.prefix
    }

    /// The serving handler for everything registered so far, across all API
    /// versions sharing this router.
    pub fn handler(&self) -> axum::Router {
        self.router.handler()
    }

    fn register_operation(
        &self,
        method: Method,
        path: &str,
        ops: &Arc<dyn ResourceOps>,
        operation: Operation,
    ) {
        let context = self.context.clone();
        let ops = ops.clone();
        let handler: RouteHandler = Arc::new(move |request, params| {
            Box::pin(dispatch(
                context.clone(),
                ops.clone(),
                operation,
                request,
                params,
            ))
        });
        self.router.register_route(method, path, handler);
    }
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    FindAll,
    FindOne,
    Create,
    Update,
    Delete,
    Relationship { related: bool },
}

async fn dispatch(
    context: Arc<RouteContext>,
    ops: Arc<dyn ResourceOps>,
    operation: Operation,
    request: Request,
    params: HashMap<String, String>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = HttpError::new(Some(Box::new(e)), "failed to read request body", 400);
            return render_error(&context.content_type, &err);
        }
    };
    tracing::debug!(method = %parts.method, uri = %parts.uri, op = ?operation, "dispatch");
    let mut ctx = RequestContext::new(parts, params, body);

    let (before, after) = context
        .pipeline
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .chains();

    let mut aborted: Option<HttpError> = None;
    for middleware in &before {
        if let Err(e) = middleware.handle(&mut ctx).await {
            aborted = Some(e);
            break;
        }
    }

    let result = match aborted {
        Some(err) => Err(err),
        None => {
            let base_url = context.resolver.base_url(Some(ctx.request()));
            let links = LinkContext {
                base_url: &base_url,
                prefix: &context.prefix,
            };
            run_operation(ops.as_ref(), operation, &mut ctx, &links).await
        }
    };

    // The after chain runs in full even when a before-handler or the
    // operation failed, so cross-cutting concerns observe every outcome.
    for middleware in &after {
        middleware.handle(&mut ctx, result.as_ref().err()).await;
    }

    match result {
        Ok(output) => render_output(&context.content_type, output),
        Err(err) => render_error(&context.content_type, &err),
    }
}

async fn run_operation(
    ops: &dyn ResourceOps,
    operation: Operation,
    ctx: &mut RequestContext,
    links: &LinkContext<'_>,
) -> Result<OperationOutput, HttpError> {
    match operation {
        Operation::FindAll => ops.find_all(ctx, links).await,
        Operation::FindOne => {
            let id = required_param(ctx, "id")?;
            ops.find_one(&id, ctx, links).await
        }
        Operation::Create => ops.create(ctx, links).await,
        Operation::Update => {
            let id = required_param(ctx, "id")?;
            ops.update(&id, ctx, links).await
        }
        Operation::Delete => {
            let id = required_param(ctx, "id")?;
            ops.delete(&id, ctx, links).await
        }
        Operation::Relationship { related } => {
            let id = required_param(ctx, "id")?;
            let relation = required_param(ctx, "relation")?;
            ops.relationship(&id, &relation, related, ctx, links).await
        }
    }
}

fn required_param(ctx: &RequestContext, name: &str) -> Result<String, HttpError> {
    ctx.param(name)
        .map(str::to_string)
        .ok_or_else(|| HttpError::bad_request(format!("missing '{}' path parameter", name)))
}

fn render_output(content_type: &str, output: OperationOutput) -> Response {
    match output.document {
        Some(document) => match serde_json::to_string(&document) {
            Ok(body) => (
                output.status,
                [(header::CONTENT_TYPE, content_type.to_string())],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response document");
                render_error(
                    content_type,
                    &HttpError::internal("failed to encode response document"),
                )
            }
        },
        None => output.status.into_response(),
    }
}

fn render_error(content_type: &str, err: &HttpError) -> Response {
    if err.status() >= 500 {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, "request rejected");
    }
    (
        err.status_code(),
        [(header::CONTENT_TYPE, content_type.to_string())],
        marshal_http_error(err),
    )
        .into_response()
}

/// `"v1"`, `"/v1"`, `"/v1/"` all become `"/v1/"`; an empty or root prefix
/// collapses to `"/"`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
