//! The network seam.
//!
//! `Transport` is the only place the crate touches the network. The ureq
//! implementation disables ureq's automatic status-code-as-error behavior so
//! 4xx/5xx responses come back as data and the executor decides what they
//! mean.

use ureq::http;
use ureq::{Agent, SendBody};

use crate::error::TransportError;
use crate::http::{Headers, HttpRequest, HttpResponse, RequestBody};

/// Executes one `HttpRequest` and returns the unread response.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent, e.g. one with timeouts or a proxy.
    ///
    /// The agent must have `http_status_as_error(false)`, otherwise service
    /// errors surface as transport errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = match request.body {
            RequestBody::Empty => self.agent.run(builder.body(())?)?,
            RequestBody::Bytes(bytes) => self.agent.run(builder.body(bytes)?)?,
            RequestBody::Stream(reader) => {
                self.agent.run(builder.body(SendBody::from_owned_reader(reader))?)?
            }
        };

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.into_body().into_reader();

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(body),
        })
    }
}

/// Copy response headers, skipping values that are not valid UTF-8.
fn collect_headers(map: &http::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        match value.to_str() {
            Ok(value) => headers.append(name.as_str(), value),
            Err(_) => tracing::debug!(header = %name, "skipping response header with non-UTF-8 value"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_utf8_header_values_are_skipped() {
        let mut map = http::HeaderMap::new();
        map.append("result-set-size", http::HeaderValue::from_static("3"));
        map.append("x-raw", http::HeaderValue::from_bytes(b"caf\xe9").unwrap());
        map.append("etag", http::HeaderValue::from_static("abc"));

        let headers = collect_headers(&map);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Result-Set-Size"), Some("3"));
        assert_eq!(headers.get("etag"), Some("abc"));
        assert!(!headers.contains("x-raw"));
    }
}
