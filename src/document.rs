//! JSON:API document codec.
//!
//! The dispatcher only talks to the [`Marshaler`]/[`Unmarshaler`] traits at
//! the request/response boundary; [`SerdeCodec`] is the serde-backed default
//! and can be swapped per resource via
//! [`crate::Api::add_resource_with_codec`].

use crate::error::HttpError;
use crate::resource::{Resource, ResourceIdentifier};
use serde_json::{json, Map, Value};

/// Media type for JSON:API documents.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Everything link construction needs: the resolved base URL and the
/// normalized route prefix.
pub struct LinkContext<'a> {
    pub base_url: &'a str,
    pub prefix: &'a str,
}

impl LinkContext<'_> {
    /// `<base>/<prefix>/<name>`
    pub fn collection_url(&self, name: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, name)
    }

    /// `<base>/<prefix>/<name>/<id>`
    pub fn resource_url(&self, name: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(name), id)
    }
}

/// Encodes domain objects into JSON:API documents.
pub trait Marshaler<T: Resource>: Send + Sync {
    /// Single-resource document: `data` is one resource object.
    fn marshal_one(&self, obj: &T, links: &LinkContext<'_>) -> Result<Value, HttpError>;

    /// Collection document: `data` is an array of resource objects.
    fn marshal_many(&self, objs: &[T], links: &LinkContext<'_>) -> Result<Value, HttpError>;
}

/// Decodes an inbound JSON:API document into a domain object.
pub trait Unmarshaler<T: Resource>: Send + Sync {
    fn unmarshal(&self, body: &[u8]) -> Result<T, HttpError>;
}

/// Serde-backed codec. The serde representation of the resource becomes
/// `attributes` (id stripped); declared relationships render their links and
/// identifier data.
#[derive(Clone, Copy, Default)]
pub struct SerdeCodec;

impl SerdeCodec {
    fn resource_object<T: Resource>(
        obj: &T,
        links: &LinkContext<'_>,
    ) -> Result<Value, HttpError> {
        let name = T::resource_name();
        let id = obj.id();

        let encoded = serde_json::to_value(obj).map_err(|e| {
            HttpError::new(Some(Box::new(e)), "failed to encode resource", 500)
        })?;
        let mut attributes = match encoded {
            Value::Object(map) => map,
            _ => {
                return Err(HttpError::internal(
                    "resource must serialize to a JSON object",
                ))
            }
        };
        attributes.remove("id");

        let self_url = links.resource_url(name, &id);
        let mut resource = json!({
            "type": name,
            "id": id,
            "attributes": Value::Object(attributes),
            "links": { "self": self_url },
        });

        let relationship_names = T::relationship_names();
        if !relationship_names.is_empty() {
            let mut relationships = Map::new();
            for rel in relationship_names {
                let data = obj.relationship_identifiers(rel);
                relationships.insert(
                    (*rel).to_string(),
                    json!({
                        "links": {
                            "self": format!("{}/relationships/{}", self_url, rel),
                            "related": format!("{}/{}", self_url, rel),
                        },
                        "data": data,
                    }),
                );
            }
            resource["relationships"] = Value::Object(relationships);
        }

        Ok(resource)
    }
}

impl<T: Resource> Marshaler<T> for SerdeCodec {
    fn marshal_one(&self, obj: &T, links: &LinkContext<'_>) -> Result<Value, HttpError> {
        let data = Self::resource_object(obj, links)?;
        Ok(json!({
            "links": { "self": links.resource_url(T::resource_name(), &obj.id()) },
            "data": data,
        }))
    }

    fn marshal_many(&self, objs: &[T], links: &LinkContext<'_>) -> Result<Value, HttpError> {
        let mut data = Vec::with_capacity(objs.len());
        for obj in objs {
            data.push(Self::resource_object(obj, links)?);
        }
        Ok(json!({
            "links": { "self": links.collection_url(T::resource_name()) },
            "data": data,
        }))
    }
}

impl<T: Resource> Unmarshaler<T> for SerdeCodec {
    fn unmarshal(&self, body: &[u8]) -> Result<T, HttpError> {
        if body.is_empty() {
            return Err(HttpError::bad_request("empty request body"));
        }
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| HttpError::new(Some(Box::new(e)), "invalid JSON body", 400))?;
        let data = document
            .get("data")
            .ok_or_else(|| HttpError::bad_request("document has no data object"))?;
        let data = data
            .as_object()
            .ok_or_else(|| HttpError::bad_request("data must be an object"))?;

        if let Some(kind) = data.get("type").and_then(Value::as_str) {
            if kind != T::resource_name() {
                return Err(HttpError::conflict(format!(
                    "document type '{}' does not match resource '{}'",
                    kind,
                    T::resource_name()
                )));
            }
        }

        let attributes = match data.get("attributes") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(HttpError::bad_request("attributes must be an object")),
        };
        let mut obj: T = serde_json::from_value(Value::Object(attributes)).map_err(|e| {
            HttpError::new(Some(Box::new(e)), "failed to decode resource attributes", 400)
        })?;

        if let Some(id) = data.get("id").and_then(Value::as_str) {
            obj.set_id(id.to_string());
        }

        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

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

        fn relationship_names() -> &'static [&'static str] {
            &["comments"]
        }

        fn relationship_identifiers(&self, name: &str) -> Vec<ResourceIdentifier> {
            match name {
                "comments" => vec![ResourceIdentifier::new("comments", "c1")],
                _ => Vec::new(),
            }
        }
    }

    fn links() -> LinkContext<'static> {
        LinkContext {
            base_url: "https://example.com",
            prefix: "/v1/",
        }
    }

    #[test]
    fn marshal_one_builds_the_resource_document() {
        let article = Article {
            id: "a1".into(),
            title: "hello".into(),
        };
        let doc = SerdeCodec.marshal_one(&article, &links()).unwrap();

        assert_eq!(doc["data"]["type"], "articles");
        assert_eq!(doc["data"]["id"], "a1");
        assert_eq!(doc["data"]["attributes"]["title"], "hello");
        // id lives at the top level of the resource object, not in attributes
        assert!(doc["data"]["attributes"].get("id").is_none());
        assert_eq!(
            doc["links"]["self"],
            "https://example.com/v1/articles/a1"
        );
        assert_eq!(
            doc["data"]["relationships"]["comments"]["links"]["related"],
            "https://example.com/v1/articles/a1/comments"
        );
        assert_eq!(
            doc["data"]["relationships"]["comments"]["data"][0]["id"],
            "c1"
        );
    }

    #[test]
    fn marshal_many_builds_the_collection_document() {
        let articles = vec![
            Article {
                id: "a1".into(),
                title: "one".into(),
            },
            Article {
                id: "a2".into(),
                title: "two".into(),
            },
        ];
        let doc = SerdeCodec.marshal_many(&articles, &links()).unwrap();
        assert_eq!(doc["links"]["self"], "https://example.com/v1/articles");
        assert_eq!(doc["data"].as_array().unwrap().len(), 2);
        assert_eq!(doc["data"][1]["id"], "a2");
    }

    #[test]
    fn unmarshal_decodes_attributes_and_applies_the_id() {
        let body = br#"{"data":{"type":"articles","id":"a9","attributes":{"title":"hi"}}}"#;
        let article: Article = SerdeCodec.unmarshal(body).unwrap();
        assert_eq!(article.id, "a9");
        assert_eq!(article.title, "hi");
    }

    #[test]
    fn unmarshal_rejects_a_mismatched_document_type() {
        let body = br#"{"data":{"type":"users","attributes":{"title":"hi"}}}"#;
        let err = <SerdeCodec as Unmarshaler<Article>>::unmarshal(&SerdeCodec, body).unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn unmarshal_rejects_malformed_bodies() {
        let cases: [&[u8]; 3] = [b"", b"not json", br#"{"data": 5}"#];
        for body in cases {
            let err =
                <SerdeCodec as Unmarshaler<Article>>::unmarshal(&SerdeCodec, body).unwrap_err();
            assert_eq!(err.status(), 400, "body {:?}", body);
        }
    }
}
