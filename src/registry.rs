//! Per-API registry of resource records.

use crate::endpoint::ResourceOps;
use crate::error::ConfigError;
use crate::resource::TypeDescriptor;
use std::sync::Arc;

/// One registered resource: its name, the runtime descriptor of its concrete
/// type, and the type-erased endpoint bound to its data source. Created at
/// registration, immutable afterwards.
pub struct ResourceRecord {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub(crate) ops: Arc<dyn ResourceOps>,
}

/// Ordered record list, owned by one API version. Lookup is a linear scan;
/// registries are small and read-mostly.
#[derive(Default)]
pub struct ResourceRegistry {
    records: Vec<ResourceRecord>,
}

impl ResourceRegistry {
    /// Registering the same name twice is a configuration error, surfaced at
    /// startup rather than overwritten silently.
    pub(crate) fn insert(&mut self, record: ResourceRecord) -> Result<(), ConfigError> {
        if self.records.iter().any(|r| r.name == record.name) {
            return Err(ConfigError::DuplicateResource(record.name));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// The registered type for `name`, for reflective construction of
    /// concrete instances. `None` for unregistered names.
    pub fn lookup_resource_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.lookup(name).map(|r| &r.descriptor)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::document::LinkContext;
    use crate::endpoint::OperationOutput;
    use crate::error::HttpError;
    use crate::resource::Resource;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Default)]
    struct Article {
        #[serde(default)]
        id: String,
    }

    impl Resource for Article {
        fn resource_name() -> &'static str {
            "articles"
        }

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    struct NoOps;

    #[async_trait]
    impl ResourceOps for NoOps {
        async fn find_all(
            &self,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }

        async fn find_one(
            &self,
            _id: &str,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }

        async fn create(
            &self,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }

        async fn update(
            &self,
            _id: &str,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }

        async fn delete(
            &self,
            _id: &str,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }

        async fn relationship(
            &self,
            _id: &str,
            _name: &str,
            _related: bool,
            _ctx: &mut RequestContext,
            _links: &LinkContext<'_>,
        ) -> Result<OperationOutput, HttpError> {
            Err(HttpError::internal("unreachable in this test"))
        }
    }

    fn record(name: &str) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            descriptor: TypeDescriptor::of::<Article>(),
            ops: Arc::new(NoOps),
        }
    }

    #[test]
    fn lookup_finds_registered_names_only() {
        let mut registry = ResourceRegistry::default();
        registry.insert(record("articles")).unwrap();

        assert!(registry.lookup_resource_type("articles").is_some());
        assert!(registry
            .lookup_resource_type("articles")
            .unwrap()
            .is::<Article>());
        assert!(registry.lookup_resource_type("users").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ResourceRegistry::default();
        registry.insert(record("articles")).unwrap();
        let err = registry.insert(record("articles")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateResource(name) if name == "articles"));
        assert_eq!(registry.len(), 1);
    }
}
