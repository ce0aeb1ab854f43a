//! File acquisition, validation and local preview.

use crate::{
    config::UploadCfg,
    error::InvalidReason,
    events::Propagation,
    jobs::SelectedFile,
    surface::UiSurface,
    worker::Worker,
};

/// Outcome of validating a candidate file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(SelectedFile),
    Invalid(InvalidReason),
}

/// Size and type rules applied to every candidate.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub accepted_types: Vec<String>,
}

impl From<&UploadCfg> for UploadLimits {
    fn from(cfg: &UploadCfg) -> Self {
        Self {
            max_bytes: cfg.max_bytes,
            accepted_types: cfg.accepted_types.clone(),
        }
    }
}

/// Validate in fixed order: absence, size, declared type.
pub fn validate(candidate: Option<SelectedFile>, limits: &UploadLimits) -> ValidationResult {
    let Some(file) = candidate else {
        return ValidationResult::Invalid(InvalidReason::Empty);
    };
    if file.size > limits.max_bytes {
        return ValidationResult::Invalid(InvalidReason::TooLarge);
    }
    if !limits.accepted_types.iter().any(|t| *t == file.media_type) {
        return ValidationResult::Invalid(InvalidReason::UnsupportedType);
    }
    ValidationResult::Valid(file)
}

/// Owns the current selection and the submit-enabled flag.
pub struct SelectionController {
    limits: UploadLimits,
    worker: Worker,
    current: Option<SelectedFile>,
    /// Sequence of the most recent preview writer.
    preview_seq: u64,
    submit_enabled: bool,
}

impl SelectionController {
    pub fn new(limits: UploadLimits, worker: Worker) -> Self {
        Self {
            limits,
            worker,
            current: None,
            preview_seq: 0,
            submit_enabled: false,
        }
    }

    pub fn current(&self) -> Option<&SelectedFile> {
        self.current.as_ref()
    }

    /// Single entry point for both the chooser and drops.
    pub fn on_candidate_file(
        &mut self,
        ui: &mut dyn UiSurface,
        file: Option<SelectedFile>,
    ) -> ValidationResult {
        let result = validate(file, &self.limits);
        // Any selection supersedes previews still decoding.
        self.preview_seq += 1;

        match &result {
            ValidationResult::Valid(file) => {
                tracing::info!("selected {} ({}, {} bytes)", file.name, file.media_type, file.size);
                self.current = Some(file.clone());
                ui.hide_errors();
                ui.set_file_label(&file.name);
                self.set_submit(ui, true);
                self.worker.decode_preview(self.preview_seq, file.clone());
            }
            ValidationResult::Invalid(reason) => {
                tracing::info!("selection rejected: {reason:?}");
                self.current = None;
                ui.clear_preview();
                ui.set_file_label("");
                ui.show_error((*reason).into(), &reason.to_string());
                self.set_submit(ui, false);
            }
        }
        result
    }

    /// Apply a finished decode if it belongs to the latest selection.
    pub fn on_preview_decoded(&mut self, ui: &mut dyn UiSurface, seq: u64, data_uri: &str) {
        if seq != self.preview_seq {
            tracing::debug!("stale preview {seq} dropped (latest {})", self.preview_seq);
            return;
        }
        ui.set_preview(data_uri);
    }

    pub fn on_drag_enter(&mut self, ui: &mut dyn UiSurface) -> Propagation {
        ui.set_drag_over(true);
        Propagation::Continue
    }

    pub fn on_drag_over(&mut self, ui: &mut dyn UiSurface) -> Propagation {
        ui.set_drag_over(true);
        Propagation::PreventDefault
    }

    pub fn on_drag_leave(&mut self, ui: &mut dyn UiSurface) -> Propagation {
        ui.set_drag_over(false);
        Propagation::Continue
    }

    pub fn on_drop(&mut self, ui: &mut dyn UiSurface, file: Option<SelectedFile>) -> Propagation {
        ui.set_drag_over(false);
        self.on_candidate_file(ui, file);
        Propagation::PreventDefault
    }

    /// Hand the selection to a submission and disarm the submit action.
    ///
    /// Returns `None` while submit is disabled. A fresh valid selection is
    /// the only thing that re-enables it.
    pub fn claim_for_submit(&mut self, ui: &mut dyn UiSurface) -> Option<SelectedFile> {
        if !self.submit_enabled {
            return None;
        }
        let file = self.current.clone()?;
        self.set_submit(ui, false);
        Some(file)
    }

    fn set_submit(&mut self, ui: &mut dyn UiSurface, enabled: bool) {
        self.submit_enabled = enabled;
        ui.set_submit_enabled(enabled);
    }
}
