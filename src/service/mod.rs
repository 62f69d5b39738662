//! The signature service: list, create and delete over a [`SignatureStore`].
//!
//! [`SignatureService::handle`] is transport-independent: it takes a method,
//! a path and the raw body, and returns an [`ApiResponse`]. The tiny_http
//! listener in [`http`] is a thin adapter on top of it.
//!
//! | Request | Success | Failure |
//! |---|---|---|
//! | `GET /signatures` | 200, array of records | 500 `{message}` |
//! | `POST /signatures` | 201, created record | 400 `{message}` |
//! | `DELETE /signatures/:id` | 200, deleted record | 404 `{message}` / 500 `Server Error` |

#[cfg(feature = "server")]
pub mod http;

use crate::record::{NewSignature, RecordId, SignatureRecord};
use crate::store::SignatureStore;
use crate::{Error, Result};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Collection path served by the API
pub const COLLECTION: &str = "/signatures";

/// Body of a response produced by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// A status code plus body, ready to be written by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self {
                status,
                body: ResponseBody::Json(v),
            },
            Err(e) => Self::message(500, &e.to_string()),
        }
    }

    /// `{ "message": ... }` with the given status
    pub fn message(status: u16, message: &str) -> Self {
        Self {
            status,
            body: ResponseBody::Json(json!({ "message": message })),
        }
    }

    pub fn text(status: u16, text: &str) -> Self {
        Self {
            status,
            body: ResponseBody::Text(text.to_string()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self.body {
            ResponseBody::Json(_) => Some("application/json; charset=utf-8"),
            ResponseBody::Text(_) => Some("text/html; charset=utf-8"),
            ResponseBody::Empty => None,
        }
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Json(v) => v.to_string().into_bytes(),
            ResponseBody::Text(t) => t.clone().into_bytes(),
            ResponseBody::Empty => Vec::new(),
        }
    }

    /// The `message` field of a JSON error body, if there is one.
    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Json(v) => v.get("message").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// A request resolved against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    List,
    Create,
    Delete(&'a str),
    Preflight,
    Unknown,
}

/// Resolve `method` + `path` to a [`Route`]. The query string is ignored and
/// one trailing slash is tolerated.
pub fn route<'a>(method: &str, path: &'a str) -> Route<'a> {
    let path = path.split('?').next().unwrap_or_default();
    let path = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };

    if method.eq_ignore_ascii_case("OPTIONS") {
        return Route::Preflight;
    }

    let rest = match path.strip_prefix(COLLECTION) {
        Some(rest) => rest,
        None => return Route::Unknown,
    };

    match (method.to_ascii_uppercase().as_str(), rest) {
        ("GET", "") => Route::List,
        ("POST", "") => Route::Create,
        ("DELETE", id) => match id.strip_prefix('/') {
            Some(id) if !id.is_empty() && !id.contains('/') => Route::Delete(id),
            _ => Route::Unknown,
        },
        _ => Route::Unknown,
    }
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    signature: Option<String>,
}

impl CreateBody {
    fn into_new_signature(self) -> Result<NewSignature> {
        let signature = self.signature.ok_or_else(|| {
            Error::Validation(
                "Signature validation failed: signature: Path `signature` is required.".into(),
            )
        })?;
        Ok(NewSignature {
            name: self.name.unwrap_or_default(),
            signature,
        })
    }
}

/// Stateless request handler over an injected store.
pub struct SignatureService<S: SignatureStore> {
    store: S,
    max_body_bytes: usize,
}

impl<S: SignatureStore> SignatureService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_body_bytes: 1024 * 1024,
        }
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All records in insertion order.
    pub fn list(&self) -> Result<Vec<SignatureRecord>> {
        self.store.list()
    }

    /// Parse a create body and persist it. The image payload is stored
    /// verbatim; only presence of `signature` is checked.
    pub fn create(&self, body: &[u8]) -> Result<SignatureRecord> {
        let parsed: CreateBody = if body.iter().all(u8::is_ascii_whitespace) {
            CreateBody {
                name: None,
                signature: None,
            }
        } else {
            serde_json::from_slice(body).map_err(|e| Error::Validation(e.to_string()))?
        };
        let new = parsed.into_new_signature()?;
        self.store.insert(&new.name, &new.signature)
    }

    /// Delete by id. A malformed id is a cast failure, not a miss.
    pub fn delete(&self, id: &str) -> Result<SignatureRecord> {
        let id = RecordId::parse(id)?;
        self.store.delete_by_id(&id)?.ok_or(Error::NotFound)
    }

    /// Dispatch one request.
    pub fn handle(&self, method: &str, path: &str, body: &[u8]) -> ApiResponse {
        if body.len() > self.max_body_bytes {
            return ApiResponse::message(413, "request entity too large");
        }

        match route(method, path) {
            Route::List => match self.list() {
                Ok(records) => ApiResponse::json(200, &records),
                Err(e) => ApiResponse::message(500, &e.to_string()),
            },
            Route::Create => match self.create(body) {
                Ok(record) => ApiResponse::json(201, &record),
                Err(e) => ApiResponse::message(400, &e.to_string()),
            },
            Route::Delete(id) => match self.delete(id) {
                Ok(record) => ApiResponse::json(200, &record),
                Err(Error::NotFound) => ApiResponse::message(404, &Error::NotFound.to_string()),
                Err(e) => {
                    error!("delete {} failed: {}", id, e);
                    ApiResponse::text(500, "Server Error")
                }
            },
            Route::Preflight => ApiResponse::empty(204),
            Route::Unknown => {
                let path = path.split('?').next().unwrap_or_default();
                ApiResponse::message(404, &format!("Cannot {} {}", method, path))
            }
        }
    }
}
