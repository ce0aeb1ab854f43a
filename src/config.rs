//! Config model and persistence helpers.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend location and HTTP settings.
    pub server: ServerCfg,
    /// Client-side validation rules.
    pub upload: UploadCfg,
    /// Status polling cadence.
    pub polling: PollingCfg,
    /// Extra form fields sent alongside the file.
    pub processing: ProcessingCfg,
    /// Where saved artifacts go.
    pub download: DownloadCfg,
}

/// Backend HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    /// Base URL that `/process`, `/status` and `/download` hang off.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

/// Candidate file limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCfg {
    /// Largest accepted file in bytes.
    pub max_bytes: u64,
    /// Declared media types that pass validation.
    pub accepted_types: Vec<String>,
    /// Multipart field name carrying the file.
    pub field_name: String,
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingCfg {
    /// Delay between status checks.
    pub interval_ms: u64,
}

/// Processing options accepted by the backend form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingCfg {
    /// Notification address; omitted from the form when empty.
    pub email: String,
    pub model: String,
    pub output_format: String,
    pub quality: u8,
    pub scale: f32,
}

/// Artifact download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadCfg {
    /// Directory for saved results.
    pub output_dir: PathBuf,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            let cfg: Self = toml::from_str(&s)?;
            cfg.validate()?;
            Ok(cfg)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }

    /// Reject values the workflow cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            bail!("server.base_url is not set");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }
        if self.polling.interval_ms == 0 {
            bail!("polling.interval_ms must be greater than zero");
        }
        if self.upload.max_bytes == 0 {
            bail!("upload.max_bytes must be greater than zero");
        }
        if self.upload.accepted_types.is_empty() {
            bail!("upload.accepted_types must list at least one media type");
        }
        if self.upload.field_name.is_empty() {
            bail!("upload.field_name is not set");
        }
        if !(1..=100).contains(&self.processing.quality) {
            bail!("processing.quality must be within 1..=100");
        }
        if !(self.processing.scale > 0.0 && self.processing.scale <= 2.0) {
            bail!("processing.scale must be within (0, 2]");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for Config {
    /// Defaults match the backend's documented limits.
    fn default() -> Self {
        Self {
            server: ServerCfg {
                base_url: "http://localhost:8000".into(),
                request_timeout_secs: 30,
            },
            upload: UploadCfg {
                max_bytes: 5 * 1024 * 1024,
                accepted_types: vec!["image/jpeg".into(), "image/png".into()],
                field_name: "file".into(),
            },
            polling: PollingCfg { interval_ms: 2000 },
            processing: ProcessingCfg {
                email: "".into(),
                model: "u2net".into(),
                output_format: "png".into(),
                quality: 95,
                scale: 1.0,
            },
            download: DownloadCfg {
                output_dir: PathBuf::from("processed_images"),
            },
        }
    }
}
