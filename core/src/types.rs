//! Wire DTOs for the job and object endpoints.
//!
//! # Design
//! Field names follow the service's camelCase JSON. These types are defined
//! independently from the mock-server crate; integration tests catch schema
//! drift between the two.

use std::fmt;
use std::io::{BufRead, BufReader, Read};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    Map,
    Reduce,
}

/// One map or reduce step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPhase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    pub exec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Number of reducers; only meaningful for reduce phases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Memory in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Disk in GiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
}

impl JobPhase {
    pub fn map(exec: impl Into<String>) -> Self {
        Self::new(PhaseType::Map, exec)
    }

    pub fn reduce(exec: impl Into<String>) -> Self {
        Self::new(PhaseType::Reduce, exec)
    }

    fn new(phase_type: PhaseType, exec: impl Into<String>) -> Self {
        Self {
            phase_type,
            exec: exec.into(),
            init: None,
            assets: Vec::new(),
            image: None,
            count: None,
            memory: None,
            disk: None,
        }
    }
}

/// Request payload for creating a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub phases: Vec<JobPhase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStats {
    pub errors: u64,
    pub outputs: u64,
    pub retries: u64,
    pub tasks: u64,
    pub tasks_done: u64,
}

/// Job status as returned by `live/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub input_done: bool,
    #[serde(default)]
    pub stats: Option<JobStats>,
    #[serde(default)]
    pub phases: Vec<JobPhase>,
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub time_done: Option<String>,
    #[serde(default)]
    pub time_archive_started: Option<String>,
    #[serde(default)]
    pub time_archive_done: Option<String>,
}

/// Filters for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct ListJobsInput {
    pub running_only: bool,
    pub limit: Option<u64>,
    /// Resume after this job id.
    pub marker: Option<String>,
}

/// One line of the job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "name")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub mtime: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobList {
    pub result_set_size: u64,
    pub jobs: Vec<JobSummary>,
}

/// Newline-delimited object paths (job inputs, outputs or failures).
///
/// `items` is the unread response body; dropping it releases the connection.
pub struct JobItems {
    pub result_set_size: u64,
    pub items: Box<dyn Read + Send>,
}

impl JobItems {
    /// Iterate over non-empty lines of the listing.
    pub fn lines(self) -> impl Iterator<Item = std::io::Result<String>> {
        BufReader::new(self.items)
            .lines()
            .filter(|line| !matches!(line, Ok(line) if line.is_empty()))
    }
}

impl fmt::Debug for JobItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobItems")
            .field("result_set_size", &self.result_set_size)
            .finish_non_exhaustive()
    }
}

/// A fetched object; `body` is the unread content.
pub struct ObjectContents {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl fmt::Debug for ObjectContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectContents")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}
