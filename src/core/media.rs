use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::config::UploadConfig;
use crate::core::error::StepError;

pub const MIME_MP4: &str = "video/mp4";
pub const MIME_QUICKTIME: &str = "video/quicktime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            mime: mime.into(),
            size,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if !meta.is_file() {
            return Err(anyhow!("{} is not a file", path.display()));
        }
        Ok(Self::new(path, mime_from_extension(path), meta.len()))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => MIME_MP4,
        "mov" | "qt" => MIME_QUICKTIME,
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Checks type and size before any upload work starts.
pub fn validate_upload(file: &MediaFile, policy: &UploadConfig) -> Result<(), StepError> {
    if !policy.accepted_types.iter().any(|t| t == &file.mime) {
        return Err(StepError::InvalidFormat {
            mime: file.mime.clone(),
        });
    }
    if file.size > policy.max_bytes {
        return Err(StepError::TooLarge {
            size: file.size,
            limit_mib: policy.max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(Url);

impl MediaRef {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        Url::from_file_path(&abs)
            .map(Self)
            .map_err(|_| anyhow!("Cannot build a file URL for {}", abs.display()))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a render. `id` is unique per render call, so reprocessing
/// the same inputs yields a new output that supersedes the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub id: String,
    pub media: MediaRef,
}
