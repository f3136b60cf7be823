//! Signed request execution.
//!
//! # Design
//! `RequestExecutor` owns the configuration, one `Signer` and one
//! `Transport`, all immutable, so a clone can be handed to every thread that
//! needs one. Each call builds the request, stamps `date`, signs that exact
//! value, sends, and classifies the status: [200, 300) hands the unread body
//! back to the caller, anything else is decoded into a `StorageError`.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{decode_error_response, StorageError};
use crate::http::HttpResponse;
use crate::request::{build_request, RequestInput};
use crate::signer::{format_http_date, Signer};
use crate::transport::Transport;

#[derive(Clone)]
pub struct RequestExecutor {
    config: ClientConfig,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
}

impl RequestExecutor {
    pub fn new(config: ClientConfig, signer: Arc<dyn Signer>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            signer,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign and send `input`, dated now.
    pub fn execute(&self, input: RequestInput) -> Result<HttpResponse, StorageError> {
        self.execute_at(input, OffsetDateTime::now_utc())
    }

    /// Sign and send `input` with `date` set to `now`.
    pub fn execute_at(&self, input: RequestInput, now: OffsetDateTime) -> Result<HttpResponse, StorageError> {
        let mut request = build_request(&self.config, input)?;

        let date = format_http_date(now)?;
        request.headers.set("date", date.as_str());
        let authorization = self.signer.sign(&date)?;
        request.headers.set("Authorization", authorization);
        request.headers.set("Accept", "*/*");
        request.headers.set("User-Agent", self.config.user_agent());

        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        let response = self.transport.send(request).map_err(StorageError::Transport)?;
        debug!(%method, %url, status = response.status, "received response");

        if response.is_success() {
            return Ok(response);
        }

        let err = decode_error_response(response.status, response.body);
        warn!(%method, %url, error = %err, "request failed");
        Err(err)
    }
}
