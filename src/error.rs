//! Typed errors and the JSON:API error envelope.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Problems wiring up an API. Raised during registration, before the server
/// accepts traffic, never on a request path.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate resource: '{0}' is already registered")]
    DuplicateResource(String),
    #[error("invalid resource name: '{0}'")]
    InvalidResourceName(String),
}

/// JSON:API error object, see <https://jsonapi.org/format/#errors>.
/// Every field is optional and omitted from the wire when empty.
/// `status` mirrors the HTTP status code as a string.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ErrorLinks>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// `links.about` leads to further details about this occurrence of the
/// problem.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ErrorLinks {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub about: String,
}

/// References to the source of an error: a JSON Pointer into the request
/// document, or the name of the offending query parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pointer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
}

/// Error carried through a failing request.
///
/// `cause` is an internal diagnostic: it is logged server-side and never
/// serialized to the client. `message` and `status` are user-facing. Explicit
/// `errors` entries, when set, replace the one synthesized from
/// `message`/`status` at marshal time.
#[derive(Debug, Default)]
pub struct HttpError {
    cause: Option<Box<dyn StdError + Send + Sync>>,
    message: String,
    status: u16,
    pub errors: Vec<ErrorObject>,
}

impl HttpError {
    pub fn new(
        cause: Option<Box<dyn StdError + Send + Sync>>,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            cause,
            message: message.into(),
            status,
            errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(None, message, StatusCode::BAD_REQUEST.as_u16())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(None, message, StatusCode::FORBIDDEN.as_u16())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(None, message, StatusCode::NOT_FOUND.as_u16())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(None, message, StatusCode::CONFLICT.as_u16())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(None, message, StatusCode::INTERNAL_SERVER_ERROR.as_u16())
    }

    pub fn with_errors(mut self, errors: Vec<ErrorObject>) -> Self {
        self.errors = errors;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The HTTP status for the response; anything unrepresentable becomes 500.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "http error ({}) {} and {} more errors",
            self.status,
            self.message,
            self.errors.len()
        )?;
        if let Some(cause) = &self.cause {
            write!(f, ", {}", cause)?;
        }
        Ok(())
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorDocument<'a> {
    errors: &'a [ErrorObject],
}

/// Render an [`HttpError`] as the wire `{"errors": [...]}` document.
///
/// With no explicit `errors`, a single entry is synthesized from the message
/// and status. A serialization failure degrades to `{}` with a logged
/// diagnostic rather than surfacing a secondary error to the client.
pub fn marshal_http_error(input: &HttpError) -> String {
    let synthesized;
    let errors: &[ErrorObject] = if input.errors.is_empty() {
        synthesized = [ErrorObject {
            title: input.message.clone(),
            status: input.status.to_string(),
            ..Default::default()
        }];
        &synthesized
    } else {
        &input.errors
    };

    match serde_json::to_string(&ErrorDocument { errors }) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to marshal error document");
            "{}".to_string()
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, crate::document::MEDIA_TYPE)],
            marshal_http_error(&self),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn marshal_synthesizes_error_from_message_and_status() {
        let err = HttpError::new(None, "msg", 404);
        let body: Value = serde_json::from_str(&marshal_http_error(&err)).unwrap();
        assert_eq!(body, json!({"errors": [{"title": "msg", "status": "404"}]}));
    }

    #[test]
    fn explicit_errors_suppress_the_synthesized_one() {
        let err = HttpError::new(None, "msg", 422).with_errors(vec![ErrorObject {
            title: "name is required".into(),
            status: "422".into(),
            source: Some(ErrorSource {
                pointer: "/data/attributes/name".into(),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        let body: Value = serde_json::from_str(&marshal_http_error(&err)).unwrap();
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["title"], "name is required");
        assert_eq!(errors[0]["source"]["pointer"], "/data/attributes/name");
        assert!(errors[0].get("detail").is_none());
    }

    #[test]
    fn display_reports_status_message_and_extra_error_count() {
        let err = HttpError::new(None, "not found", 404);
        assert_eq!(err.to_string(), "http error (404) not found and 0 more errors");
    }

    #[test]
    fn display_appends_the_underlying_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = HttpError::new(Some(Box::new(io)), "storage failed", 500);
        assert_eq!(
            err.to_string(),
            "http error (500) storage failed and 0 more errors, disk on fire"
        );
    }

    #[test]
    fn into_response_sets_status_and_content_type() {
        let resp = HttpError::not_found("gone").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let ct = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(ct, crate::document::MEDIA_TYPE);
    }

    #[test]
    fn out_of_range_status_falls_back_to_internal_error() {
        let err = HttpError::new(None, "weird", 42);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
