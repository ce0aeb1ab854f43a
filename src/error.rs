//! Error taxonomy for the selection and submission workflow.

use thiserror::Error;

/// Why a candidate file was rejected before reaching the network.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvalidReason {
    /// Nothing was selected or dropped.
    #[error("Please choose an image file.")]
    Empty,
    /// Larger than the configured limit.
    #[error("File exceeds the upload size limit.")]
    TooLarge,
    /// Declared media type is not accepted.
    #[error("Only JPEG and PNG images are supported.")]
    UnsupportedType,
}

/// Failure of the initial `POST /process` call. Always terminal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    /// Non-2xx HTTP status.
    #[error("Upload failed: {0}")]
    Status(u16),
    /// Connection, timeout or request building failure.
    #[error("Upload failed: {0}")]
    Transport(String),
    /// 2xx response without a usable `processing_id`.
    #[error("Upload failed: malformed response ({0})")]
    Malformed(String),
}

/// Failure of a status check or download call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => BackendError::Status(status.as_u16()),
            None if e.is_decode() => BackendError::Malformed(e.to_string()),
            None => BackendError::Transport(e.to_string()),
        }
    }
}
