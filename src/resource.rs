//! Resource identity and runtime type descriptors.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;

/// A domain type exposed as a named JSON:API resource.
///
/// The serde representation of the type becomes the document `attributes`,
/// minus the id. Fields that are not part of inbound `attributes` (typically
/// the id itself) should carry `#[serde(default)]` so partial documents
/// decode.
pub trait Resource: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Collection name used in route paths and as the document `type`.
    fn resource_name() -> &'static str;

    fn id(&self) -> String;

    fn set_id(&mut self, id: String);

    /// Relationship names rendered under `relationships` with their links.
    fn relationship_names() -> &'static [&'static str] {
        &[]
    }

    /// Identifiers the named relationship currently points at.
    fn relationship_identifiers(&self, _name: &str) -> Vec<ResourceIdentifier> {
        Vec::new()
    }
}

/// A `{type, id}` pair referencing a resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Runtime descriptor of a registered resource type. Carries the factory
/// registered alongside the resource so callers can produce blank instances
/// of the right concrete type, e.g. to decode a request body into.
pub struct TypeDescriptor {
    type_name: &'static str,
    type_id: TypeId,
    factory: Box<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>,
}

impl TypeDescriptor {
    pub fn of<T: Resource>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            factory: Box::new(|| Box::new(T::default())),
        }
    }

    /// Fully qualified Rust name of the underlying type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// A blank instance of the underlying concrete type.
    pub fn new_instance(&self) -> Box<dyn Any + Send> {
        (self.factory)()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
    struct Article {
        #[serde(default)]
        id: String,
        title: String,
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

    #[test]
    fn descriptor_identifies_the_type() {
        let descriptor = TypeDescriptor::of::<Article>();
        assert!(descriptor.is::<Article>());
        assert!(!descriptor.is::<String>());
        assert!(descriptor.type_name().ends_with("Article"));
    }

    #[test]
    fn descriptor_builds_blank_instances() {
        let descriptor = TypeDescriptor::of::<Article>();
        let instance = descriptor.new_instance();
        let article = instance.downcast::<Article>().unwrap();
        assert_eq!(*article, Article::default());
    }
}
