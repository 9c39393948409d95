//! Example consumer: a blog API with in-memory storage.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Then e.g.:
//!   curl http://127.0.0.1:3000/v1/posts
//!   curl -X POST http://127.0.0.1:3000/v1/posts \
//!     -d '{"data":{"type":"posts","attributes":{"title":"hello"}}}'

use async_trait::async_trait;
use jsonapi_kit::{
    AfterFn, Api, DataSource, HttpError, RequestContext, Resource, ResourceIdentifier,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
struct Post {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    comment_ids: Vec<String>,
}

impl Resource for Post {
    fn resource_name() -> &'static str {
        "posts"
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn relationship_names() -> &'static [&'static str] {
        &["comments"]
    }

    fn relationship_identifiers(&self, name: &str) -> Vec<ResourceIdentifier> {
        match name {
            "comments" => self
                .comment_ids
                .iter()
                .map(|id| ResourceIdentifier::new("comments", id.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
struct Comment {
    #[serde(default)]
    id: String,
    text: String,
}

impl Resource for Comment {
    fn resource_name() -> &'static str {
        "comments"
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// In-memory store usable for any resource type.
struct MemorySource<T> {
    items: RwLock<HashMap<String, T>>,
}

impl<T> MemorySource<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            items: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl<T: Resource + Clone> DataSource<T> for MemorySource<T> {
    async fn find_all(&self, _ctx: &RequestContext) -> Result<Vec<T>, HttpError> {
        let mut items: Vec<T> = self.items.read().unwrap().values().cloned().collect();
        items.sort_by_key(|item| item.id());
        Ok(items)
    }

    async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<T, HttpError> {
        self.items
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| {
                HttpError::not_found(format!("{} '{}' not found", T::resource_name(), id))
            })
    }

    async fn create(&self, mut obj: T, _ctx: &RequestContext) -> Result<T, HttpError> {
        if obj.id().is_empty() {
            obj.set_id(uuid::Uuid::new_v4().to_string());
        }
        self.items
            .write()
            .unwrap()
            .insert(obj.id(), obj.clone());
        Ok(obj)
    }

    async fn update(&self, obj: T, _ctx: &RequestContext) -> Result<T, HttpError> {
        let mut items = self.items.write().unwrap();
        if !items.contains_key(&obj.id()) {
            return Err(HttpError::not_found(format!(
                "{} '{}' not found",
                T::resource_name(),
                obj.id()
            )));
        }
        items.insert(obj.id(), obj.clone());
        Ok(obj)
    }

    async fn delete(&self, id: &str, _ctx: &RequestContext) -> Result<(), HttpError> {
        self.items
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| {
                HttpError::not_found(format!("{} '{}' not found", T::resource_name(), id))
            })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("example_consumer=info")),
        )
        .init();

    let mut api = Api::with_base_url("v1", "http://127.0.0.1:3000");
    api.add_resource::<Post, _>(MemorySource::<Post>::new())?;
    api.add_resource::<Comment, _>(MemorySource::<Comment>::new())?;

    api.use_after_middleware(AfterFn(
        |ctx: &mut RequestContext, error: Option<&HttpError>| match error {
            Some(err) => tracing::warn!(
                method = %ctx.method(),
                path = %ctx.uri().path(),
                status = err.status(),
                "request failed"
            ),
            None => tracing::info!(
                method = %ctx.method(),
                path = %ctx.uri().path(),
                "request handled"
            ),
        },
    ));

    let app = api.handler();
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
