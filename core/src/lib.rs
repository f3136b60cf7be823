//! Synchronous client for an object-storage and compute-job service.
//!
//! # Overview
//! Every call follows one path: a `RequestInput` descriptor is resolved into
//! an `HttpRequest` against the configured endpoint, stamped with a `date`
//! header, signed by the injected `Signer`, and sent through a `Transport`.
//! 2xx responses hand the unread body back to the caller; anything else is
//! decoded into a `StorageError`.
//!
//! # Design
//! - `ClientConfig` is explicit; nothing is read from the environment per call.
//! - Exactly one `Signer` and one `Transport` are injected at construction.
//! - The client blocks on each call and holds no mutable state, so clones can
//!   be used from several threads.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod jobs;
pub mod objects;
pub mod request;
pub mod signer;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::StorageClient;
pub use config::ClientConfig;
pub use error::{decode_error_response, ServiceError, StorageError, TransportError};
pub use executor::RequestExecutor;
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use jobs::Jobs;
pub use objects::Objects;
pub use request::{build_request, Payload, RequestInput};
pub use signer::{format_http_date, HmacSigner, SignError, Signer};
pub use transport::{Transport, UreqTransport};
pub use types::{
    CreateJob, Job, JobItems, JobList, JobPhase, JobStats, JobSummary, ListJobsInput, ObjectContents,
    PhaseType,
};
