//! jsonapi-kit: expose application data types as JSON:API HTTP resources.
//!
//! Registering a type and a [`DataSource`] on an [`Api`] generates the full
//! CRUD route set, wraps it in the before/after middleware pipeline, and
//! renders success and error payloads in the JSON:API envelope.

pub mod api;
pub mod context;
pub mod document;
mod endpoint;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod routing;
pub mod source;

pub use api::Api;
pub use context::RequestContext;
pub use document::{LinkContext, Marshaler, SerdeCodec, Unmarshaler, MEDIA_TYPE};
pub use error::{
    marshal_http_error, ConfigError, ErrorLinks, ErrorObject, ErrorSource, HttpError,
};
pub use middleware::{AfterFn, AfterMiddleware, BeforeFn, BeforeMiddleware};
pub use registry::{ResourceRecord, ResourceRegistry};
pub use resolver::{CallbackResolver, StaticResolver, UrlResolver};
pub use resource::{Resource, ResourceIdentifier, TypeDescriptor};
pub use routing::axum_router::AxumRouter;
pub use routing::{RouteHandler, Routeable};
pub use source::DataSource;
