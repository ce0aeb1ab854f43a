//! HTTP backend helpers.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};

use super::ProcessingBackend;
use crate::{
    config::{Config, ProcessingCfg},
    error::{BackendError, UploadError},
    jobs::{JobStatus, ProcessingJob, SelectedFile, StatusResp, UploadResp, WireStatus},
};

/// Talks to the processing service over HTTP.
pub struct HttpBackend {
    http: Client,
    /// Base URL without a trailing slash.
    base_url: String,
    /// Multipart field that carries the file.
    field_name: String,
    /// Extra form fields.
    options: ProcessingCfg,
}

impl HttpBackend {
    /// Build a client from config.
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder().timeout(cfg.request_timeout()).build()?;
        Ok(Self {
            http,
            base_url: cfg.server.base_url.trim_end_matches('/').to_string(),
            field_name: cfg.upload.field_name.clone(),
            options: cfg.processing.clone(),
        })
    }

    fn process_url(&self) -> String {
        format!("{}/process", self.base_url)
    }

    fn status_url(&self, job: &ProcessingJob) -> String {
        format!("{}/status/{}", self.base_url, urlencoding::encode(&job.id))
    }

    fn job_download_url(&self, job: &ProcessingJob) -> String {
        format!("{}/download/{}", self.base_url, urlencoding::encode(&job.id))
    }

    /// Multipart body: the file plus the processing options.
    fn build_form(&self, file: &SelectedFile) -> Result<Form, UploadError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let mut form = Form::new().part(self.field_name.clone(), part);
        if !self.options.email.is_empty() {
            form = form.text("email", self.options.email.clone());
        }
        Ok(form
            .text("model", self.options.model.clone())
            .text("output_format", self.options.output_format.clone())
            .text("quality", self.options.quality.to_string())
            .text("scale", self.options.scale.to_string()))
    }
}

#[async_trait]
impl ProcessingBackend for HttpBackend {
    async fn upload(&self, file: &SelectedFile) -> Result<ProcessingJob, UploadError> {
        let form = self.build_form(file)?;
        let resp = self
            .http
            .post(self.process_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body = resp
            .json::<UploadResp>()
            .await
            .map_err(|e| UploadError::Malformed(e.to_string()))?;
        if body.processing_id.is_empty() {
            return Err(UploadError::Malformed("empty processing_id".into()));
        }
        Ok(ProcessingJob::new(body.processing_id))
    }

    async fn status(&self, job: &ProcessingJob) -> Result<JobStatus, BackendError> {
        let body = self
            .http
            .get(self.status_url(job))
            .send()
            .await?
            .error_for_status()?
            .json::<StatusResp>()
            .await?;
        if body.status == WireStatus::Unrecognized {
            tracing::warn!("unrecognized status for job {}, treating as pending", job.id);
        }
        Ok(body.status.into())
    }

    async fn download(&self, job: &ProcessingJob) -> Result<Vec<u8>, BackendError> {
        let bytes = self
            .http
            .get(self.job_download_url(job))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    fn download_url(&self, job: &ProcessingJob) -> String {
        self.job_download_url(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn backend(base: &str) -> HttpBackend {
        let mut cfg = Config::default();
        cfg.server.base_url = base.into();
        HttpBackend::new(&cfg).unwrap()
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let b = backend("http://localhost:8000/");
        let job = ProcessingJob::new("job-1");
        assert_eq!(b.process_url(), "http://localhost:8000/process");
        assert_eq!(b.status_url(&job), "http://localhost:8000/status/job-1");
        assert_eq!(b.download_url(&job), "http://localhost:8000/download/job-1");
    }

    #[test]
    fn test_job_id_is_percent_encoded() {
        let b = backend("http://localhost:8000");
        let job = ProcessingJob::new("a/b c");
        assert_eq!(b.status_url(&job), "http://localhost:8000/status/a%2Fb%20c");
    }

    fn png() -> SelectedFile {
        SelectedFile::new("a.png", "image/png", vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_upload_sends_file_part_and_returns_job() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/process")
                    .body_includes(r#"name="file"; filename="a.png""#)
                    .body_includes(r#"name="model""#);
                then.status(200)
                    .json_body(json!({"processing_id": "job-1", "status": "pending"}));
            })
            .await;

        let job = backend(&server.base_url()).upload(&png()).await;
        assert_eq!(job, Ok(ProcessingJob::new("job-1")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(500).body("boom");
            })
            .await;

        let err = backend(&server.base_url()).upload(&png()).await;
        assert_eq!(err, Err(UploadError::Status(500)));
    }

    #[tokio::test]
    async fn test_upload_without_processing_id_is_malformed() {
        let server = MockServer::start_async().await;
        let mut mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(200).json_body(json!({"message": "queued"}));
            })
            .await;
        let b = backend(&server.base_url());
        assert!(matches!(b.upload(&png()).await, Err(UploadError::Malformed(_))));

        mock.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process");
                then.status(200).json_body(json!({"processing_id": ""}));
            })
            .await;
        assert!(matches!(b.upload(&png()).await, Err(UploadError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unknown_status_over_http_is_pending() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status/job-1");
                then.status(200).json_body(json!({"status": "queued"}));
            })
            .await;

        let status = backend(&server.base_url())
            .status(&ProcessingJob::new("job-1"))
            .await;
        assert_eq!(status, Ok(JobStatus::Pending));
    }

    #[tokio::test]
    async fn test_status_not_found_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status/job-9");
                then.status(404);
            })
            .await;

        let status = backend(&server.base_url())
            .status(&ProcessingJob::new("job-9"))
            .await;
        assert_eq!(status, Err(BackendError::Status(404)));
    }

    #[test]
    fn test_form_rejects_invalid_media_type() {
        let b = backend("http://localhost:8000");
        let file = SelectedFile::new("x.png", "not a mime", vec![1, 2, 3]);
        assert!(matches!(b.build_form(&file), Err(UploadError::Transport(_))));
    }
}
