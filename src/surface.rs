//! Addressable UI slots the controllers write to.

use crate::error::InvalidReason;

/// The four mutually exclusive error panels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorPanel {
    TooLarge,
    UnsupportedType,
    Empty,
    /// Generic upload/processing failure panel.
    Processing,
}

impl From<InvalidReason> for ErrorPanel {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::Empty => ErrorPanel::Empty,
            InvalidReason::TooLarge => ErrorPanel::TooLarge,
            InvalidReason::UnsupportedType => ErrorPanel::UnsupportedType,
        }
    }
}

/// Observable UI phase, always derived from the slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiPhase {
    Idle,
    PreviewReady,
    ErrorShown,
    Submitting,
    ResultShown,
}

/// Write access to the UI slots.
///
/// Implementations must keep at most one error/result panel visible:
/// `show_error` hides the result and all other error panels, `show_result`
/// hides every error panel.
pub trait UiSurface {
    fn set_file_label(&mut self, name: &str);
    /// Point the preview image at `data_uri` and reveal the preview area.
    fn set_preview(&mut self, data_uri: &str);
    /// Clear the preview image and hide the preview area.
    fn clear_preview(&mut self);
    fn show_error(&mut self, panel: ErrorPanel, message: &str);
    fn hide_errors(&mut self);
    fn set_submit_enabled(&mut self, enabled: bool);
    fn set_busy(&mut self, busy: bool);
    fn show_result(&mut self, image_src: &str, download_href: &str);
    fn hide_result(&mut self);
    fn set_drag_over(&mut self, active: bool);
}

/// Result panel contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultSlot {
    pub image_src: String,
    pub download_href: String,
}

/// In-memory surface rendered by the terminal front end.
#[derive(Clone, Debug, Default)]
pub struct SurfaceState {
    file_label: String,
    preview: Option<String>,
    error: Option<(ErrorPanel, String)>,
    submit_enabled: bool,
    busy: bool,
    result: Option<ResultSlot>,
    drag_over: bool,
    #[cfg(test)]
    result_writes: usize,
}

impl SurfaceState {
    pub fn file_label(&self) -> &str {
        &self.file_label
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn error(&self) -> Option<(ErrorPanel, &str)> {
        self.error.as_ref().map(|(p, m)| (*p, m.as_str()))
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn result(&self) -> Option<&ResultSlot> {
        self.result.as_ref()
    }

    pub fn drag_over(&self) -> bool {
        self.drag_over
    }

    /// How many times the result panel has been populated.
    #[cfg(test)]
    pub fn result_writes(&self) -> usize {
        self.result_writes
    }

    pub fn phase(&self) -> UiPhase {
        if self.busy {
            UiPhase::Submitting
        } else if self.result.is_some() {
            UiPhase::ResultShown
        } else if self.error.is_some() {
            UiPhase::ErrorShown
        } else if self.preview.is_some() {
            UiPhase::PreviewReady
        } else {
            UiPhase::Idle
        }
    }
}

impl UiSurface for SurfaceState {
    fn set_file_label(&mut self, name: &str) {
        self.file_label = name.to_string();
    }

    fn set_preview(&mut self, data_uri: &str) {
        self.preview = Some(data_uri.to_string());
    }

    fn clear_preview(&mut self) {
        self.preview = None;
    }

    fn show_error(&mut self, panel: ErrorPanel, message: &str) {
        self.result = None;
        self.error = Some((panel, message.to_string()));
    }

    fn hide_errors(&mut self) {
        self.error = None;
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.submit_enabled = enabled;
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn show_result(&mut self, image_src: &str, download_href: &str) {
        self.error = None;
        self.result = Some(ResultSlot {
            image_src: image_src.to_string(),
            download_href: download_href.to_string(),
        });
        #[cfg(test)]
        {
            self.result_writes += 1;
        }
    }

    fn hide_result(&mut self) {
        self.result = None;
    }

    fn set_drag_over(&mut self, active: bool) {
        self.drag_over = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_replaces_result_and_other_errors() {
        let mut ui = SurfaceState::default();
        ui.show_result("/download/a", "/download/a");
        ui.show_error(ErrorPanel::TooLarge, "too large");
        ui.show_error(ErrorPanel::Empty, "empty");
        assert!(ui.result().is_none());
        assert_eq!(ui.error().map(|(p, _)| p), Some(ErrorPanel::Empty));
        assert_eq!(ui.phase(), UiPhase::ErrorShown);
    }

    #[test]
    fn test_result_hides_errors() {
        let mut ui = SurfaceState::default();
        ui.show_error(ErrorPanel::Processing, "Processing failed.");
        ui.show_result("/download/a", "/download/a");
        assert!(ui.error().is_none());
        assert_eq!(ui.phase(), UiPhase::ResultShown);
    }

    #[test]
    fn test_phase_prefers_busy() {
        let mut ui = SurfaceState::default();
        assert_eq!(ui.phase(), UiPhase::Idle);
        ui.set_preview("data:image/png;base64,AA==");
        assert_eq!(ui.phase(), UiPhase::PreviewReady);
        ui.set_busy(true);
        assert_eq!(ui.phase(), UiPhase::Submitting);
    }
}
