//! Object storage endpoints under `/<account>/stor`.

use std::io::Read;

use crate::error::StorageError;
use crate::executor::RequestExecutor;
use crate::http::HttpMethod;
use crate::request::RequestInput;
use crate::types::ObjectContents;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Copy)]
pub struct Objects<'a> {
    executor: &'a RequestExecutor,
}

impl<'a> Objects<'a> {
    pub(crate) fn new(executor: &'a RequestExecutor) -> Self {
        Self { executor }
    }

    /// Upload `body` to `path`, relative to the account's `stor` directory.
    pub fn put(
        &self,
        path: &str,
        content_type: Option<&str>,
        body: impl Read + Send + 'static,
    ) -> Result<(), StorageError> {
        let request = RequestInput::new(HttpMethod::Put, self.object_path(path))
            .header("Content-Type", content_type.unwrap_or(DEFAULT_CONTENT_TYPE))
            .stream(body);
        self.executor.execute(request)?;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Result<ObjectContents, StorageError> {
        let request = RequestInput::new(HttpMethod::Get, self.object_path(path));
        let response = self.executor.execute(request)?;
        let content_length = response
            .headers
            .get("content-length")
            .and_then(|value| value.trim().parse().ok());
        Ok(ObjectContents {
            content_type: response.headers.get("content-type").map(str::to_string),
            content_length,
            etag: response.headers.get("etag").map(str::to_string),
            body: response.body,
        })
    }

    pub fn delete(&self, path: &str) -> Result<(), StorageError> {
        let request = RequestInput::new(HttpMethod::Delete, self.object_path(path));
        self.executor.execute(request)?;
        Ok(())
    }

    fn object_path(&self, path: &str) -> String {
        format!(
            "/{}/stor/{}",
            self.executor.config().account(),
            path.trim_start_matches('/')
        )
    }
}
