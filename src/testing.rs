//! Scripted backend shared by controller tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    backend::ProcessingBackend,
    error::{BackendError, UploadError},
    jobs::{JobStatus, ProcessingJob, SelectedFile},
};

/// Answers from queues; unscripted status checks report Pending.
#[derive(Default)]
pub struct FakeBackend {
    uploads: Mutex<VecDeque<Result<String, u16>>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<JobStatus, ()>>>>,
    uploaded: Mutex<Vec<String>>,
    status_calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one upload answer: a job id or an HTTP status.
    pub fn with_upload(self, answer: Result<&str, u16>) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .push_back(answer.map(str::to_string));
        self
    }

    /// Queue status answers for a job; `Err(())` is a transport failure.
    pub fn with_statuses(
        self,
        job_id: &str,
        answers: impl IntoIterator<Item = Result<JobStatus, ()>>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .extend(answers);
        self
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn max_concurrent_status(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessingBackend for FakeBackend {
    async fn upload(&self, file: &SelectedFile) -> Result<ProcessingJob, UploadError> {
        self.uploaded.lock().unwrap().push(file.name.clone());
        match self.uploads.lock().unwrap().pop_front() {
            Some(Ok(id)) => Ok(ProcessingJob::new(id)),
            Some(Err(code)) => Err(UploadError::Status(code)),
            None => Err(UploadError::Transport("no scripted upload".into())),
        }
    }

    async fn status(&self, job: &ProcessingJob) -> Result<JobStatus, BackendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.status_calls.lock().unwrap().push(job.id.clone());
        tokio::task::yield_now().await;

        let answer = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(&job.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(JobStatus::Pending));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer.map_err(|_| BackendError::Transport("connection reset".into()))
    }

    async fn download(&self, job: &ProcessingJob) -> Result<Vec<u8>, BackendError> {
        Ok(format!("artifact:{}", job.id).into_bytes())
    }

    fn download_url(&self, job: &ProcessingJob) -> String {
        format!("/download/{}", job.id)
    }
}
