//! Processing backend client.

use async_trait::async_trait;

use crate::{
    error::{BackendError, UploadError},
    jobs::{JobStatus, ProcessingJob, SelectedFile},
};

/// reqwest implementation of the HTTP contract.
pub mod http;

pub use http::HttpBackend;

/// The three backend calls the workflow depends on.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// `POST /process` with the file; returns the created job.
    async fn upload(&self, file: &SelectedFile) -> Result<ProcessingJob, UploadError>;

    /// `GET /status/{id}`.
    async fn status(&self, job: &ProcessingJob) -> Result<JobStatus, BackendError>;

    /// `GET /download/{id}` bytes.
    async fn download(&self, job: &ProcessingJob) -> Result<Vec<u8>, BackendError>;

    /// Resource used as both the result image and the download target.
    fn download_url(&self, job: &ProcessingJob) -> String;
}
