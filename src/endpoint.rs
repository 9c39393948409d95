//! Type-erased bridge between generated routes and a typed data source.
//!
//! `add_resource` monomorphizes a [`TypedEndpoint`] for the concrete resource
//! type and codec, then stores it behind [`ResourceOps`] so the dispatcher
//! and registry stay object-typed.

use crate::context::RequestContext;
use crate::document::{LinkContext, Marshaler, Unmarshaler};
use crate::error::HttpError;
use crate::resource::Resource;
use crate::source::DataSource;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::marker::PhantomData;

/// Outcome of a successful resource operation.
pub(crate) struct OperationOutput {
    pub status: StatusCode,
    pub document: Option<Value>,
}

impl OperationOutput {
    fn with_document(status: StatusCode, document: Value) -> Self {
        Self {
            status,
            document: Some(document),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            document: None,
        }
    }
}

/// The five CRUD operations plus relationship reads, type-erased.
#[async_trait]
pub(crate) trait ResourceOps: Send + Sync {
    async fn find_all(
        &self,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;

    async fn find_one(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;

    async fn create(
        &self,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;

    async fn update(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;

    async fn delete(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;

    async fn relationship(
        &self,
        id: &str,
        name: &str,
        related: bool,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError>;
}

pub(crate) struct TypedEndpoint<T, S, C> {
    source: S,
    codec: C,
    _resource: PhantomData<fn() -> T>,
}

impl<T, S, C> TypedEndpoint<T, S, C> {
    pub(crate) fn new(source: S, codec: C) -> Self {
        Self {
            source,
            codec,
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<T, S, C> ResourceOps for TypedEndpoint<T, S, C>
where
    T: Resource,
    S: DataSource<T> + 'static,
    C: Marshaler<T> + Unmarshaler<T> + 'static,
{
    async fn find_all(
        &self,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        let objs = self.source.find_all(ctx).await?;
        let document = self.codec.marshal_many(&objs, links)?;
        Ok(OperationOutput::with_document(StatusCode::OK, document))
    }

    async fn find_one(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        let obj = self.source.find_one(id, ctx).await?;
        let document = self.codec.marshal_one(&obj, links)?;
        Ok(OperationOutput::with_document(StatusCode::OK, document))
    }

    async fn create(
        &self,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        let obj: T = self.codec.unmarshal(ctx.body())?;
        let created = self.source.create(obj, ctx).await?;
        let document = self.codec.marshal_one(&created, links)?;
        Ok(OperationOutput::with_document(StatusCode::CREATED, document))
    }

    async fn update(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        let mut obj: T = self.codec.unmarshal(ctx.body())?;
        let document_id = obj.id();
        if !document_id.is_empty() && document_id != id {
            return Err(HttpError::conflict(format!(
                "document id '{}' does not match URL id '{}'",
                document_id, id
            )));
        }
        obj.set_id(id.to_string());
        let updated = self.source.update(obj, ctx).await?;
        let document = self.codec.marshal_one(&updated, links)?;
        Ok(OperationOutput::with_document(StatusCode::OK, document))
    }

    async fn delete(
        &self,
        id: &str,
        ctx: &mut RequestContext,
        _links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        self.source.delete(id, ctx).await?;
        Ok(OperationOutput::empty(StatusCode::NO_CONTENT))
    }

    async fn relationship(
        &self,
        id: &str,
        name: &str,
        related: bool,
        ctx: &mut RequestContext,
        links: &LinkContext<'_>,
    ) -> Result<OperationOutput, HttpError> {
        if !T::relationship_names().iter().any(|rel| *rel == name) {
            return Err(HttpError::not_found(format!(
                "resource '{}' has no relationship '{}'",
                T::resource_name(),
                name
            )));
        }
        let obj = self.source.find_one(id, ctx).await?;
        let identifiers = obj.relationship_identifiers(name);
        let self_url = links.resource_url(T::resource_name(), id);

        // The related variant answers under the related link; the
        // relationships variant exposes the linkage itself.
        let document = if related {
            json!({
                "links": { "self": format!("{}/{}", self_url, name) },
                "data": identifiers,
            })
        } else {
            json!({
                "links": {
                    "self": format!("{}/relationships/{}", self_url, name),
                    "related": format!("{}/{}", self_url, name),
                },
                "data": identifiers,
            })
        };
        Ok(OperationOutput::with_document(StatusCode::OK, document))
    }
}
