//! Upload + poll transaction driving the UI to a terminal state.

use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::{BackendError, UploadError},
    jobs::{JobStatus, ProcessingJob, SelectedFile},
    surface::{ErrorPanel, UiSurface},
    worker::Worker,
};

/// Shown when the backend reports a failed job.
pub const PROCESSING_FAILED: &str = "Processing failed.";

/// Where the current transaction stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting { txn: Uuid },
    Polling { txn: Uuid, job: ProcessingJob },
    Resolved(Outcome),
}

/// Terminal outcome of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(ProcessingJob),
    Failed(String),
}

/// The one scheduled status check. Dropping it cancels the timer.
struct PollTask {
    txn: Uuid,
    job_id: String,
    handle: JoinHandle<()>,
}

impl PollTask {
    fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Owns the submit action and the polling timer.
pub struct SubmissionController {
    worker: Worker,
    interval: Duration,
    state: SubmissionState,
    poll: Option<PollTask>,
}

impl SubmissionController {
    pub fn new(worker: Worker, interval: Duration) -> Self {
        Self {
            worker,
            interval,
            state: SubmissionState::Idle,
            poll: None,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// True while a status check is scheduled or in flight.
    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.handle.is_finished())
    }

    /// Job whose result is currently on screen.
    pub fn resolved_job(&self) -> Option<&ProcessingJob> {
        match &self.state {
            SubmissionState::Resolved(Outcome::Succeeded(job)) => Some(job),
            _ => None,
        }
    }

    /// `Idle → Submitting`. Any live timer from a previous job is cancelled first.
    pub fn submit(&mut self, ui: &mut dyn UiSurface, file: SelectedFile) -> Uuid {
        self.cancel_polling();

        let txn = Uuid::new_v4();
        tracing::info!("submission {txn} started for {}", file.name);
        ui.hide_errors();
        ui.hide_result();
        ui.set_busy(true);
        ui.set_submit_enabled(false);

        self.state = SubmissionState::Submitting { txn };
        self.worker.upload(txn, file);
        txn
    }

    /// `Submitting → Polling` or `Submitting → Resolved(failure)`.
    pub fn on_upload_finished(
        &mut self,
        ui: &mut dyn UiSurface,
        txn: Uuid,
        result: Result<ProcessingJob, UploadError>,
    ) {
        let SubmissionState::Submitting { txn: active } = &self.state else {
            tracing::debug!("upload result for {txn} discarded: not submitting");
            return;
        };
        if *active != txn {
            tracing::info!("upload result for superseded submission {txn} discarded");
            return;
        }

        match result {
            Ok(job) => {
                tracing::info!("submission {txn} accepted as job {}", job.id);
                self.state = SubmissionState::Polling {
                    txn,
                    job: job.clone(),
                };
                self.schedule_check(txn, job);
            }
            Err(e) => {
                tracing::error!("submission {txn} upload failed: {e}");
                self.resolve_failure(ui, e.to_string());
            }
        }
    }

    /// One poll tick completed.
    pub fn on_status_checked(
        &mut self,
        ui: &mut dyn UiSurface,
        txn: Uuid,
        job_id: &str,
        result: Result<JobStatus, BackendError>,
    ) {
        let job = match &self.state {
            SubmissionState::Polling { txn: active, job } if *active == txn && job.id == job_id => {
                job.clone()
            }
            _ => {
                tracing::debug!("stray status for {job_id} ({txn}) ignored");
                return;
            }
        };
        // The tick that produced this result has finished.
        self.poll = None;

        let status = result.unwrap_or_else(|e| {
            tracing::warn!("status check for {job_id} failed, retrying next tick: {e}");
            JobStatus::Pending
        });

        if status.is_terminal() {
            tracing::debug!("job {job_id} reached {status:?}");
        }
        match status {
            JobStatus::Pending => self.schedule_check(txn, job),
            JobStatus::Completed => {
                tracing::info!("job {job_id} completed");
                self.cancel_polling();
                let url = self.worker.backend().download_url(&job);
                ui.set_busy(false);
                ui.show_result(&url, &url);
                self.state = SubmissionState::Resolved(Outcome::Succeeded(job));
            }
            JobStatus::Failed => {
                tracing::warn!("job {job_id} failed on the server");
                self.resolve_failure(ui, PROCESSING_FAILED.to_string());
            }
        }
    }

    /// Cancel the scheduled status check, if any.
    pub fn cancel_polling(&mut self) {
        if let Some(task) = self.poll.take() {
            tracing::debug!("cancel polling for job {} ({})", task.job_id, task.txn);
            task.cancel();
        }
    }

    fn schedule_check(&mut self, txn: Uuid, job: ProcessingJob) {
        // Never two timers at once.
        self.cancel_polling();
        let job_id = job.id.clone();
        let handle = self.worker.check_status_after(txn, job, self.interval);
        self.poll = Some(PollTask {
            txn,
            job_id,
            handle,
        });
    }

    fn resolve_failure(&mut self, ui: &mut dyn UiSurface, message: String) {
        self.cancel_polling();
        ui.set_busy(false);
        ui.show_error(ErrorPanel::Processing, &message);
        self.state = SubmissionState::Resolved(Outcome::Failed(message));
    }
}

impl Drop for SubmissionController {
    fn drop(&mut self) {
        self.cancel_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{surface::SurfaceState, testing::FakeBackend};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn controller() -> (SubmissionController, mpsc::Receiver<crate::events::AppEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let worker = Worker::new(Arc::new(FakeBackend::new()), tx);
        (SubmissionController::new(worker, Duration::from_millis(2000)), rx)
    }

    fn file() -> SelectedFile {
        SelectedFile::new("cat.png", "image/png", vec![1])
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_for_other_transaction_is_discarded() {
        let (mut sub, _rx) = controller();
        let mut ui = SurfaceState::default();
        let txn = sub.submit(&mut ui, file());

        sub.on_upload_finished(&mut ui, Uuid::new_v4(), Ok(ProcessingJob::new("old")));
        assert_eq!(sub.state(), &SubmissionState::Submitting { txn });
        assert!(!sub.is_polling());

        sub.on_upload_finished(&mut ui, txn, Ok(ProcessingJob::new("job-1")));
        assert!(sub.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_tick_after_resolution_is_ignored() {
        let (mut sub, _rx) = controller();
        let mut ui = SurfaceState::default();
        let txn = sub.submit(&mut ui, file());
        sub.on_upload_finished(&mut ui, txn, Ok(ProcessingJob::new("job-1")));

        // Result for a different job id does not count.
        sub.on_status_checked(&mut ui, txn, "job-9", Ok(JobStatus::Completed));
        assert!(ui.result().is_none());

        sub.on_status_checked(&mut ui, txn, "job-1", Ok(JobStatus::Completed));
        assert_eq!(ui.result_writes(), 1);
        assert!(!sub.is_polling());
        assert_eq!(sub.resolved_job(), Some(&ProcessingJob::new("job-1")));

        sub.on_status_checked(&mut ui, txn, "job-1", Ok(JobStatus::Completed));
        assert_eq!(ui.result_writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_clears_previous_panels() {
        let (mut sub, _rx) = controller();
        let mut ui = SurfaceState::default();
        ui.show_error(ErrorPanel::Processing, PROCESSING_FAILED);
        sub.submit(&mut ui, file());
        assert!(ui.error().is_none());
        assert!(ui.result().is_none());
        assert!(ui.busy());
        assert!(!ui.submit_enabled());
    }
}
