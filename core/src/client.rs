//! Entry point for the storage and job service.
//!
//! # Design
//! `StorageClient` wraps one `RequestExecutor` and hands out borrowed API
//! handles (`jobs()`, `objects()`). It carries no mutable state between
//! calls; clone it to share across threads.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::StorageError;
use crate::executor::RequestExecutor;
use crate::http::HttpResponse;
use crate::jobs::Jobs;
use crate::objects::Objects;
use crate::request::RequestInput;
use crate::signer::Signer;
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct StorageClient {
    executor: RequestExecutor,
}

impl StorageClient {
    /// Client that talks HTTP through a default `UreqTransport`.
    pub fn new(config: ClientConfig, signer: impl Signer + 'static) -> Self {
        Self::with_transport(config, Arc::new(signer), Arc::new(UreqTransport::new()))
    }

    pub fn with_transport(
        config: ClientConfig,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            executor: RequestExecutor::new(config, signer, transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.executor.config()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Sign and send an arbitrary request.
    pub fn execute(&self, input: RequestInput) -> Result<HttpResponse, StorageError> {
        self.executor.execute(input)
    }

    pub fn jobs(&self) -> Jobs<'_> {
        Jobs::new(&self.executor)
    }

    pub fn objects(&self) -> Objects<'_> {
        Objects::new(&self.executor)
    }
}
