//! Compute job endpoints under `/<account>/jobs`.

use std::io::{BufRead, BufReader, Cursor};

use tracing::debug;

use crate::error::StorageError;
use crate::executor::RequestExecutor;
use crate::http::{Headers, HttpMethod};
use crate::request::RequestInput;
use crate::types::{CreateJob, Job, JobItems, JobList, JobSummary, ListJobsInput};

/// Borrowed handle over the job API. Obtained from `StorageClient::jobs`.
#[derive(Clone, Copy)]
pub struct Jobs<'a> {
    executor: &'a RequestExecutor,
}

impl<'a> Jobs<'a> {
    pub(crate) fn new(executor: &'a RequestExecutor) -> Self {
        Self { executor }
    }

    /// Submit a new job and return its id.
    pub fn create(&self, input: &CreateJob) -> Result<String, StorageError> {
        let request = RequestInput::new(HttpMethod::Post, self.jobs_path()).json(input)?;
        let response = self.executor.execute(request)?;
        let location = response
            .headers
            .get("location")
            .ok_or_else(|| StorageError::UnexpectedResponse("missing Location header".to_string()))?;
        let job_id = job_id_from_location(location)?;
        debug!(%job_id, name = %input.name, "created job");
        Ok(job_id)
    }

    /// Append object paths to a job's input stream.
    pub fn add_inputs<S: AsRef<str>>(&self, job_id: &str, object_paths: &[S]) -> Result<(), StorageError> {
        let body = object_paths
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        let request = RequestInput::new(HttpMethod::Post, self.live_path(job_id, "in"))
            .header("Content-Type", "text/plain")
            .stream(Cursor::new(body.into_bytes()));
        self.executor.execute(request)?;
        debug!(%job_id, count = object_paths.len(), "added job inputs");
        Ok(())
    }

    /// Close the job's input stream; no more inputs are accepted afterwards.
    pub fn end_input(&self, job_id: &str) -> Result<(), StorageError> {
        let request = RequestInput::new(HttpMethod::Post, self.live_path(job_id, "in/end"));
        self.executor.execute(request)?;
        Ok(())
    }

    pub fn cancel(&self, job_id: &str) -> Result<(), StorageError> {
        let request = RequestInput::new(HttpMethod::Post, self.live_path(job_id, "cancel"));
        self.executor.execute(request)?;
        Ok(())
    }

    pub fn get(&self, job_id: &str) -> Result<Job, StorageError> {
        let request = RequestInput::new(HttpMethod::Get, self.live_path(job_id, "status"));
        let response = self.executor.execute(request)?;
        serde_json::from_reader(response.body).map_err(StorageError::Decode)
    }

    pub fn list(&self, input: &ListJobsInput) -> Result<JobList, StorageError> {
        let mut request = RequestInput::new(HttpMethod::Get, self.jobs_path());
        if input.running_only {
            request = request.query("state", "running");
        }
        if let Some(limit) = input.limit {
            request = request.query("limit", limit.to_string());
        }
        if let Some(marker) = &input.marker {
            request = request.query("marker", marker.as_str());
        }

        let response = self.executor.execute(request)?;
        let result_set_size = result_set_size(&response.headers)?;
        let mut jobs = Vec::new();
        for line in BufReader::new(response.body).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: JobSummary = serde_json::from_str(&line).map_err(StorageError::Decode)?;
            jobs.push(entry);
        }
        Ok(JobList { result_set_size, jobs })
    }

    /// Object paths submitted as input so far.
    pub fn get_input(&self, job_id: &str) -> Result<JobItems, StorageError> {
        self.items(job_id, "in")
    }

    /// Object paths produced by the job's final phase.
    pub fn get_output(&self, job_id: &str) -> Result<JobItems, StorageError> {
        self.items(job_id, "out")
    }

    /// Inputs whose tasks failed.
    pub fn get_failures(&self, job_id: &str) -> Result<JobItems, StorageError> {
        self.items(job_id, "fail")
    }

    fn items(&self, job_id: &str, which: &str) -> Result<JobItems, StorageError> {
        let request = RequestInput::new(HttpMethod::Get, self.live_path(job_id, which));
        let response = self.executor.execute(request)?;
        Ok(JobItems {
            result_set_size: result_set_size(&response.headers)?,
            items: response.body,
        })
    }

    fn jobs_path(&self) -> String {
        format!("/{}/jobs", self.executor.config().account())
    }

    fn live_path(&self, job_id: &str, suffix: &str) -> String {
        format!("/{}/jobs/{job_id}/live/{suffix}", self.executor.config().account())
    }
}

/// The job id is the last segment of `/<account>/jobs/<id>`.
fn job_id_from_location(location: &str) -> Result<String, StorageError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StorageError::UnexpectedResponse(format!("no job id in Location {location:?}")))
}

/// `Result-Set-Size`; absent means zero.
pub(crate) fn result_set_size(headers: &Headers) -> Result<u64, StorageError> {
    match headers.get("result-set-size") {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| StorageError::UnexpectedResponse(format!("invalid Result-Set-Size {value:?}"))),
    }
}
