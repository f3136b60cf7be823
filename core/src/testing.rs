//! In-memory transport and signer for unit tests.

use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use crate::error::TransportError;
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::signer::{SignError, Signer};
use crate::transport::Transport;

/// A request as seen on the wire, with its body drained.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub streamed: bool,
}

impl CapturedRequest {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Canned response returned by `RecordingTransport`.
pub struct Canned {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Records every request and replies with queued responses in order.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<CapturedRequest>>,
    responses: Mutex<VecDeque<Canned>>,
}

impl RecordingTransport {
    pub fn replying(responses: impl IntoIterator<Item = Canned>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> CapturedRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (body, streamed) = match request.body {
            RequestBody::Empty => (Vec::new(), false),
            RequestBody::Bytes(bytes) => (bytes, false),
            RequestBody::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                (buf, true)
            }
        };
        self.requests.lock().unwrap().push(CapturedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
            streamed,
        });

        let canned = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or("no canned response left")?;
        Ok(HttpResponse {
            status: canned.status,
            headers: canned.headers.into_iter().collect(),
            body: Box::new(Cursor::new(canned.body)),
        })
    }
}

/// Transport that always fails to connect.
pub struct Unreachable;

impl Transport for Unreachable {
    fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// Signer whose output embeds the date it was given.
pub struct EchoSigner;

impl Signer for EchoSigner {
    fn sign(&self, date: &str) -> Result<String, SignError> {
        Ok(format!("Signature date=\"{date}\""))
    }
}

pub struct FailingSigner;

impl Signer for FailingSigner {
    fn sign(&self, _date: &str) -> Result<String, SignError> {
        Err(SignError::InvalidKey("no key loaded".to_string()))
    }
}
