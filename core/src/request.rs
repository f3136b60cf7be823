//! Request descriptors and the builder that turns them into `HttpRequest`s.
//!
//! # Design
//! `RequestInput` is what API handles fill in: method, path relative to the
//! endpoint, optional query, optional headers and at most one body. The body
//! is either JSON, rendered with four-space indentation when it is attached,
//! or a stream forwarded untouched. `build_request` does no I/O.

use std::io::Read;

use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::StorageError;
use crate::http::{Headers, HttpMethod, HttpRequest, RequestBody};

/// Request body variants. A descriptor carries at most one.
pub enum Payload {
    /// Indented JSON text.
    Json(Vec<u8>),
    Stream(Box<dyn Read + Send>),
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Json(bytes) => f.debug_tuple("Json").field(&String::from_utf8_lossy(bytes)).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// In-memory description of an outbound request.
#[derive(Debug)]
pub struct RequestInput {
    pub method: HttpMethod,
    pub path: String,
    pub query: Option<Vec<(String, String)>>,
    pub headers: Option<Headers>,
    pub body: Option<Payload>,
}

impl RequestInput {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: None,
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).set(name, value);
        self
    }

    /// Attach `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, StorageError> {
        self.body = Some(Payload::Json(to_indented_json(value)?));
        Ok(self)
    }

    /// Attach a pre-encoded body. The caller is responsible for its content type.
    pub fn stream(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Some(Payload::Stream(Box::new(reader)));
        self
    }
}

/// Resolve `input` against the configured endpoint.
///
/// Caller headers replace any default of the same name. A JSON body gets
/// `Content-Type: application/json` unless the caller set a content type.
pub fn build_request(config: &ClientConfig, input: RequestInput) -> Result<HttpRequest, StorageError> {
    let RequestInput {
        method,
        path,
        query,
        headers,
        body,
    } = input;

    let url = resolve_url(config.endpoint(), &path, query.as_deref());
    let caller_headers = headers.unwrap_or_default();
    let mut request_headers = Headers::new();

    let body = match body {
        None => RequestBody::Empty,
        Some(Payload::Json(bytes)) => {
            if !caller_headers.contains("content-type") {
                request_headers.set("Content-Type", "application/json");
            }
            RequestBody::Bytes(bytes)
        }
        Some(Payload::Stream(reader)) => RequestBody::Stream(reader),
    };

    for (name, _) in caller_headers.iter() {
        request_headers.remove(name);
    }
    for (name, value) in caller_headers.iter() {
        request_headers.append(name, value);
    }

    Ok(HttpRequest {
        method,
        url: url.into(),
        headers: request_headers,
        body,
    })
}

/// Replace the endpoint's path with `path` and encode `query` in order.
fn resolve_url(endpoint: &Url, path: &str, query: Option<&[(String, String)]>) -> Url {
    let mut url = endpoint.clone();
    if path.starts_with('/') {
        url.set_path(path);
    } else {
        url.set_path(&format!("/{path}"));
    }
    url.set_query(None);
    url.set_fragment(None);
    if let Some(pairs) = query.filter(|pairs| !pairs.is_empty()) {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url
}

fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(StorageError::Encode)?;
    Ok(buf)
}
