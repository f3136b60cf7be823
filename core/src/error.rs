//! Error types for the storage client.
//!
//! # Design
//! Every failure carries the phase it came from: configuration, encoding,
//! signing, transport, or the service itself. Non-2xx responses are decoded
//! into `ServiceError`; when that decode fails the caller gets `ErrorDecode`
//! with the status code instead, so failure information is never dropped.

use std::io::Read;

use serde::Deserialize;

use crate::signer::SignError;

/// Boxed error produced by a `Transport`.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error returned by the service for a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("service returned {status} {code}: {message}")]
pub struct ServiceError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

/// Errors returned by `RequestExecutor` and the API handles built on it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("error parsing endpoint {value:?}: {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("error encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("error signing HTTP request: {0}")]
    Signing(#[from] SignError),

    #[error("error executing HTTP request: {0}")]
    Transport(#[source] TransportError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("error decoding error response (HTTP {status}): {source}")]
    ErrorDecode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("error decoding response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("error reading response body: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// HTTP status of a decoded service failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Service(err) => Some(err.status),
            StorageError::ErrorDecode { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            StorageError::Service(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Decode a non-2xx response body into a `StorageError`.
///
/// Returns `Service` when the body starts with a JSON error object and
/// `ErrorDecode` otherwise. Anything after the first JSON value is ignored.
pub fn decode_error_response(status: u16, body: impl Read) -> StorageError {
    let first = serde_json::Deserializer::from_reader(body)
        .into_iter::<ErrorBody>()
        .next();
    match first {
        Some(Ok(decoded)) => StorageError::Service(ServiceError {
            status,
            code: decoded.code,
            message: decoded.message,
        }),
        Some(Err(source)) => StorageError::ErrorDecode { status, source },
        None => StorageError::ErrorDecode {
            status,
            source: serde::de::Error::custom("empty error body"),
        },
    }
}
