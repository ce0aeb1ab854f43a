//! Wires the two controllers to user events and task completions.

use std::{path::PathBuf, sync::Arc};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    backend::ProcessingBackend,
    config::Config,
    events::{AppEvent, Bindings, Disposer, EventKind, Propagation, UiEvent},
    selection::{SelectionController, UploadLimits},
    submission::SubmissionController,
    surface::UiSurface,
    worker::Worker,
};

/// Selection + submission behind one dispatcher.
pub struct Workflow {
    bindings: Bindings,
    worker: Worker,
    pub selection: SelectionController,
    pub submission: SubmissionController,
}

impl Workflow {
    pub fn new(cfg: &Config, backend: Arc<dyn ProcessingBackend>, tx: mpsc::Sender<AppEvent>) -> Self {
        let worker = Worker::new(backend, tx);
        Self {
            bindings: Bindings::default(),
            selection: SelectionController::new(UploadLimits::from(&cfg.upload), worker.clone()),
            submission: SubmissionController::new(worker.clone(), cfg.poll_interval()),
            worker,
        }
    }

    /// Register every handler. Dropping the returned disposers tears them down.
    pub fn attach(&self) -> Vec<Disposer> {
        [
            EventKind::FileChosen,
            EventKind::DragEnter,
            EventKind::DragOver,
            EventKind::DragLeave,
            EventKind::Drop,
            EventKind::SubmitClicked,
        ]
        .into_iter()
        .map(|kind| self.bindings.bind(kind))
        .collect()
    }

    /// Route a user event to its controller.
    pub fn handle_ui_event(&mut self, ui: &mut dyn UiSurface, ev: UiEvent) -> Propagation {
        if !self.bindings.is_bound(ev.kind()) {
            tracing::debug!("no handler bound for {:?}", ev.kind());
            return Propagation::Continue;
        }
        match ev {
            UiEvent::FileChosen(file) => {
                self.selection.on_candidate_file(ui, file);
                Propagation::Continue
            }
            UiEvent::DragEnter => self.selection.on_drag_enter(ui),
            UiEvent::DragOver => self.selection.on_drag_over(ui),
            UiEvent::DragLeave => self.selection.on_drag_leave(ui),
            UiEvent::Drop(file) => self.selection.on_drop(ui, file),
            UiEvent::SubmitClicked => {
                match self.selection.claim_for_submit(ui) {
                    Some(file) => {
                        self.submission.submit(ui, file);
                    }
                    None => tracing::debug!("submit ignored: no armed selection"),
                }
                Propagation::Continue
            }
        }
    }

    /// Route a task completion to its controller.
    pub fn handle_app_event(&mut self, ui: &mut dyn UiSurface, ev: AppEvent) {
        match ev {
            AppEvent::PreviewDecoded { seq, data_uri } => {
                self.selection.on_preview_decoded(ui, seq, &data_uri)
            }
            AppEvent::UploadFinished { txn, result } => {
                self.submission.on_upload_finished(ui, txn, result)
            }
            AppEvent::StatusChecked {
                txn,
                job_id,
                result,
            } => self.submission.on_status_checked(ui, txn, &job_id, result),
            // Saving is reported by the host; no UI slot changes.
            AppEvent::DownloadFinished { .. } => {}
        }
    }

    /// Save the resolved artifact, if there is one.
    pub fn download_result(&self, dir: PathBuf, extension: &str) -> Option<JoinHandle<()>> {
        let job = self.submission.resolved_job()?.clone();
        Some(self.worker.download(job, dir, extension.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jobs::{JobStatus, SelectedFile},
        submission::{Outcome, PROCESSING_FAILED, SubmissionState},
        surface::{ErrorPanel, SurfaceState, UiPhase},
        testing::FakeBackend,
    };
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(2000);

    struct Harness {
        backend: Arc<FakeBackend>,
        workflow: Workflow,
        ui: SurfaceState,
        rx: mpsc::Receiver<AppEvent>,
        _disposers: Vec<Disposer>,
    }

    impl Harness {
        fn new(backend: FakeBackend) -> Self {
            let backend = Arc::new(backend);
            let (tx, rx) = mpsc::channel(64);
            let workflow = Workflow::new(&Config::default(), backend.clone(), tx);
            let disposers = workflow.attach();
            Self {
                backend,
                workflow,
                ui: SurfaceState::default(),
                rx,
                _disposers: disposers,
            }
        }

        fn send(&mut self, ev: UiEvent) -> Propagation {
            self.workflow.handle_ui_event(&mut self.ui, ev)
        }

        fn select(&mut self, name: &str) {
            let file = SelectedFile::new(name, "image/jpeg", vec![1, 2, 3]);
            self.send(UiEvent::FileChosen(Some(file)));
        }

        /// Let spawned tasks run and apply everything they reported.
        async fn settle(&mut self) {
            loop {
                for _ in 0..16 {
                    tokio::task::yield_now().await;
                }
                let mut applied = false;
                while let Ok(ev) = self.rx.try_recv() {
                    applied = true;
                    self.workflow.handle_app_event(&mut self.ui, ev);
                }
                if !applied {
                    break;
                }
            }
        }

        async fn tick(&mut self) {
            tokio::time::advance(TICK).await;
            self.settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_completed_shows_result_once() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_statuses("job-1", [Ok(JobStatus::Pending), Ok(JobStatus::Completed)]);
        let mut h = Harness::new(backend);

        h.select("cat.jpg");
        h.settle().await;
        h.send(UiEvent::SubmitClicked);
        assert!(h.ui.busy());
        assert!(!h.ui.submit_enabled());
        h.settle().await;

        // Nothing is requested before the first interval elapses.
        assert!(h.backend.status_calls().is_empty());
        h.tick().await;
        assert_eq!(h.backend.status_calls(), vec!["job-1"]);
        assert!(h.ui.busy());

        h.tick().await;
        assert!(!h.ui.busy());
        let result = h.ui.result().expect("result panel visible");
        assert_eq!(result.image_src, "/download/job-1");
        assert_eq!(result.download_href, "/download/job-1");
        assert_eq!(h.ui.result_writes(), 1);
        assert_eq!(h.ui.phase(), UiPhase::ResultShown);
        assert!(!h.workflow.submission.is_polling());

        // Polling has stopped for good.
        for _ in 0..5 {
            h.tick().await;
        }
        assert_eq!(h.backend.status_calls().len(), 2);
        assert_eq!(h.ui.result_writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_500_is_terminal_without_polling() {
        let mut h = Harness::new(FakeBackend::new().with_upload(Err(500)));
        h.select("cat.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;

        assert!(!h.ui.busy());
        let (panel, msg) = h.ui.error().expect("error panel visible");
        assert_eq!(panel, ErrorPanel::Processing);
        assert_eq!(msg, "Upload failed: 500");
        assert!(!h.workflow.submission.is_polling());
        assert!(!h.ui.submit_enabled());

        h.tick().await;
        assert!(h.backend.status_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_failure_stops_polling() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_statuses("job-1", [Ok(JobStatus::Failed)]);
        let mut h = Harness::new(backend);
        h.select("cat.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;
        h.tick().await;

        assert!(!h.ui.busy());
        assert_eq!(
            h.ui.error(),
            Some((ErrorPanel::Processing, PROCESSING_FAILED))
        );
        assert_eq!(
            h.workflow.submission.state(),
            &SubmissionState::Resolved(Outcome::Failed(PROCESSING_FAILED.into()))
        );

        h.tick().await;
        h.tick().await;
        assert_eq!(h.backend.status_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_transport_error_is_tolerated() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_statuses("job-1", [Err(()), Ok(JobStatus::Completed)]);
        let mut h = Harness::new(backend);
        h.select("cat.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;

        h.tick().await;
        assert!(h.ui.busy());
        assert!(h.ui.error().is_none());

        h.tick().await;
        assert!(h.ui.result().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_cancels_first_timer() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_upload(Ok("job-2"))
            .with_statuses("job-2", [Ok(JobStatus::Pending), Ok(JobStatus::Completed)]);
        let mut h = Harness::new(backend);

        h.select("a.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;
        h.tick().await;
        assert_eq!(h.backend.status_calls(), vec!["job-1"]);

        // A fresh selection re-arms submit while job-1 is still polling.
        h.select("b.jpg");
        assert!(h.ui.submit_enabled());
        h.send(UiEvent::SubmitClicked);
        assert!(!h.workflow.submission.is_polling());
        h.settle().await;
        assert!(h.workflow.submission.is_polling());

        h.tick().await;
        h.tick().await;
        assert_eq!(h.backend.status_calls(), vec!["job-1", "job-2", "job-2"]);
        assert_eq!(
            h.ui.result().map(|r| r.image_src.as_str()),
            Some("/download/job-2")
        );
        assert!(h.backend.max_concurrent_status() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_upload_response_is_discarded() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_upload(Ok("job-2"))
            .with_statuses("job-2", [Ok(JobStatus::Completed)]);
        let mut h = Harness::new(backend);

        // Second submission starts before the first upload result is handled.
        h.select("a.jpg");
        h.send(UiEvent::SubmitClicked);
        h.select("b.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;
        h.tick().await;

        assert_eq!(h.backend.uploaded(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(h.backend.status_calls(), vec!["job-2"]);
        assert_eq!(
            h.ui.result().map(|r| r.download_href.as_str()),
            Some("/download/job-2")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_valid_selection_is_ignored() {
        let mut h = Harness::new(FakeBackend::new());
        h.send(UiEvent::SubmitClicked);
        h.send(UiEvent::FileChosen(Some(SelectedFile::new("x.gif", "image/gif", vec![0]))));
        h.send(UiEvent::SubmitClicked);
        h.settle().await;
        assert!(h.backend.uploaded().is_empty());
        assert_eq!(h.workflow.submission.state(), &SubmissionState::Idle);
        assert_eq!(
            h.ui.error().map(|(p, _)| p),
            Some(ErrorPanel::UnsupportedType)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_funnels_into_validation() {
        let mut h = Harness::new(FakeBackend::new());
        assert_eq!(h.send(UiEvent::DragEnter), Propagation::Continue);
        assert!(h.ui.drag_over());
        assert_eq!(h.send(UiEvent::DragOver), Propagation::PreventDefault);
        let file = SelectedFile::new("drop.png", "image/png", vec![9; 8]);
        assert_eq!(h.send(UiEvent::Drop(Some(file))), Propagation::PreventDefault);
        h.settle().await;
        assert!(!h.ui.drag_over());
        assert_eq!(h.ui.file_label(), "drop.png");
        assert!(h.ui.preview().is_some());
        assert!(h.ui.submit_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_leave_clears_affordance() {
        let mut h = Harness::new(FakeBackend::new());
        h.send(UiEvent::DragEnter);
        assert!(h.ui.drag_over());
        assert_eq!(h.send(UiEvent::DragLeave), Propagation::Continue);
        assert!(!h.ui.drag_over());
        assert_eq!(h.ui.phase(), UiPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_transport_error_is_terminal() {
        // No scripted upload answer: the fake fails at the transport level.
        let mut h = Harness::new(FakeBackend::new());
        h.select("cat.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;

        assert!(!h.ui.busy());
        let (panel, msg) = h.ui.error().expect("error panel visible");
        assert_eq!(panel, ErrorPanel::Processing);
        assert!(msg.starts_with("Upload failed: "), "{msg}");
        assert!(matches!(
            h.workflow.submission.state(),
            SubmissionState::Resolved(Outcome::Failed(_))
        ));
        assert!(!h.workflow.submission.is_polling());

        h.tick().await;
        assert!(h.backend.status_calls().is_empty());
        assert_eq!(h.backend.uploaded(), vec!["cat.jpg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_handlers_ignore_events() {
        let mut h = Harness::new(FakeBackend::new());
        h._disposers.clear();
        h.select("cat.jpg");
        h.settle().await;
        assert_eq!(h.ui.file_label(), "");
        assert!(!h.ui.submit_enabled());
        assert_eq!(h.ui.phase(), UiPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_writes_artifact() {
        let backend = FakeBackend::new()
            .with_upload(Ok("job-1"))
            .with_statuses("job-1", [Ok(JobStatus::Completed)]);
        let mut h = Harness::new(backend);
        assert!(h.workflow.download_result(PathBuf::from("unused"), "png").is_none());

        h.select("cat.jpg");
        h.send(UiEvent::SubmitClicked);
        h.settle().await;
        h.tick().await;

        let dir = std::env::temp_dir().join(format!("image_upload_tui-{}", uuid::Uuid::new_v4()));
        h.workflow
            .download_result(dir.clone(), "png")
            .expect("resolved job")
            .await
            .unwrap();
        match h.rx.recv().await {
            Some(AppEvent::DownloadFinished { job_id, result }) => {
                assert_eq!(job_id, "job-1");
                let path = result.unwrap();
                assert_eq!(path, dir.join("job-1.png"));
                assert_eq!(std::fs::read(&path).unwrap(), b"artifact:job-1");
            }
            other => panic!("unexpected event {other:?}"),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
