//! Persistence collaborator, implemented once per resource type.

use crate::context::RequestContext;
use crate::error::HttpError;
use crate::resource::Resource;
use async_trait::async_trait;
use std::sync::Arc;

/// CRUD operations backing one registered resource. The dispatcher never
/// looks past this trait; storage, caching and cancellation are entirely the
/// implementation's concern.
///
/// Errors carry the status the response should use via [`HttpError`];
/// anything unrepresentable is served as a 500. Pagination, sorting and
/// filter extensions read their parameters from [`RequestContext::query`].
#[async_trait]
pub trait DataSource<T: Resource>: Send + Sync {
    async fn find_all(&self, ctx: &RequestContext) -> Result<Vec<T>, HttpError>;

    async fn find_one(&self, id: &str, ctx: &RequestContext) -> Result<T, HttpError>;

    /// Persist a new object and return it as stored (ids and server-side
    /// defaults filled in).
    async fn create(&self, obj: T, ctx: &RequestContext) -> Result<T, HttpError>;

    /// Persist changes to an existing object and return the stored result.
    async fn update(&self, obj: T, ctx: &RequestContext) -> Result<T, HttpError>;

    async fn delete(&self, id: &str, ctx: &RequestContext) -> Result<(), HttpError>;
}

#[async_trait]
impl<T, S> DataSource<T> for Arc<S>
where
    T: Resource,
    S: DataSource<T> + ?Sized,
{
    async fn find_all(&self, ctx: &RequestContext) -> Result<Vec<T>, HttpError> {
        (**self).find_all(ctx).await
    }

    async fn find_one(&self, id: &str, ctx: &RequestContext) -> Result<T, HttpError> {
        (**self).find_one(id, ctx).await
    }

    async fn create(&self, obj: T, ctx: &RequestContext) -> Result<T, HttpError> {
        (**self).create(obj, ctx).await
    }

    async fn update(&self, obj: T, ctx: &RequestContext) -> Result<T, HttpError> {
        (**self).update(obj, ctx).await
    }

    async fn delete(&self, id: &str, ctx: &RequestContext) -> Result<(), HttpError> {
        (**self).delete(id, ctx).await
    }
}
