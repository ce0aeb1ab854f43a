//! Turning chooser input and dropped paths into candidate files.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::jobs::SelectedFile;

/// Declared media type, derived from the extension the way browsers do.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Read a candidate from disk.
///
/// Files over `max_bytes` are not read; their size is enough to reject them.
pub async fn load_candidate(path: &Path, max_bytes: u64) -> Result<SelectedFile> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = media_type_for(path);

    if meta.len() > max_bytes {
        return Ok(SelectedFile::unread(name, media_type, meta.len()));
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(SelectedFile::new(name, media_type, bytes))
}

/// Resolve chooser input; blank or unreadable input is "no file".
pub async fn choose(input: &str, max_bytes: u64) -> Option<SelectedFile> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let path = expand_home(trimmed);
    match load_candidate(&path, max_bytes).await {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("cannot read {}: {e}", path.display());
            None
        }
    }
}

/// First path in a terminal paste produced by dropping files.
///
/// Handles `'quoted paths'`, `"quoted paths"`, backslash-escaped spaces and
/// `file://` URIs. Only the first path is used.
pub fn parse_dropped_path(pasted: &str) -> Option<PathBuf> {
    let s = pasted.trim();
    let first = match s.chars().next()? {
        q @ ('\'' | '"') => {
            let rest = &s[1..];
            let end = rest.find(q)?;
            rest[..end].to_string()
        }
        _ => {
            let mut out = String::new();
            let mut chars = s.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            out.push(next);
                        }
                    }
                    c if c.is_whitespace() => break,
                    c => out.push(c),
                }
            }
            out
        }
    };
    let first = match first.strip_prefix("file://") {
        Some(rest) => urlencoding::decode(rest).ok()?.into_owned(),
        None => first,
    };
    if first.is_empty() {
        None
    } else {
        Some(PathBuf::from(first))
    }
}

/// Leading `~/` becomes the home directory.
pub fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(input)
}
