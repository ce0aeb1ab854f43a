//! Background tasks for the suspension points of the workflow.
//!
//! Every operation runs in its own spawned task and reports back through the
//! event channel; controllers only ever see the result on the app loop.

use std::{path::PathBuf, sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::{
    backend::ProcessingBackend,
    events::AppEvent,
    jobs::{ProcessingJob, SelectedFile},
};

/// Spawns backend calls and file decodes.
#[derive(Clone)]
pub struct Worker {
    backend: Arc<dyn ProcessingBackend>,
    tx: mpsc::Sender<AppEvent>,
}

impl Worker {
    pub fn new(backend: Arc<dyn ProcessingBackend>, tx: mpsc::Sender<AppEvent>) -> Self {
        Self { backend, tx }
    }

    pub fn backend(&self) -> &Arc<dyn ProcessingBackend> {
        &self.backend
    }

    /// Encode file bytes as a data URI off the event loop.
    pub fn decode_preview(&self, seq: u64, file: SelectedFile) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let data_uri = to_data_uri(&file.media_type, &file.bytes);
            let _ = tx.send(AppEvent::PreviewDecoded { seq, data_uri }).await;
        })
    }

    /// Issue the upload. Not cancellable once spawned.
    pub fn upload(&self, txn: Uuid, file: SelectedFile) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tracing::info!("upload start: {} ({} bytes)", file.name, file.size);
            let result = backend.upload(&file).await;
            let _ = tx.send(AppEvent::UploadFinished { txn, result }).await;
        })
    }

    /// Wait `delay`, then fetch the job status once.
    pub fn check_status_after(
        &self,
        txn: Uuid,
        job: ProcessingJob,
        delay: Duration,
    ) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = backend.status(&job).await;
            let _ = tx
                .send(AppEvent::StatusChecked {
                    txn,
                    job_id: job.id,
                    result,
                })
                .await;
        })
    }

    /// Fetch the artifact and write it into `dir`.
    pub fn download(&self, job: ProcessingJob, dir: PathBuf, extension: String) -> JoinHandle<()> {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = save_artifact(backend.as_ref(), &job, dir, &extension).await;
            let _ = tx
                .send(AppEvent::DownloadFinished {
                    job_id: job.id,
                    result,
                })
                .await;
        })
    }
}

/// `data:<type>;base64,<payload>`
pub fn to_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

async fn save_artifact(
    backend: &dyn ProcessingBackend,
    job: &ProcessingJob,
    dir: PathBuf,
    extension: &str,
) -> Result<PathBuf, String> {
    let bytes = backend.download(job).await.map_err(|e| e.to_string())?;
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("create {}: {e}", dir.display()))?;
    let path = dir.join(artifact_file_name(&job.id, extension));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| format!("write {}: {e}", path.display()))?;
    Ok(path)
}

/// File name for a saved artifact; path separators in the id are replaced.
fn artifact_file_name(job_id: &str, extension: &str) -> String {
    let safe: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}.{extension}")
}
