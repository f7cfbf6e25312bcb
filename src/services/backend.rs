use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::media::{MediaFile, MediaRef, OutputRef};
use crate::core::state::VoiceChoice;
use crate::utils::geometry::{FaceRegion, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStyle {
    #[default]
    Product,
    Tutorial,
    Funny,
    Formal,
    Casual,
}

impl ScriptStyle {
    pub const ALL: [ScriptStyle; 5] = [
        ScriptStyle::Product,
        ScriptStyle::Tutorial,
        ScriptStyle::Funny,
        ScriptStyle::Formal,
        ScriptStyle::Casual,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScriptStyle::Product => "產品介紹",
            ScriptStyle::Tutorial => "教學說明",
            ScriptStyle::Funny => "趣味吐槽",
            ScriptStyle::Formal => "正式演講",
            ScriptStyle::Casual => "日常對話",
        }
    }
}

impl fmt::Display for ScriptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ScriptLength {
    pub const ALL: [ScriptLength; 3] = [ScriptLength::Short, ScriptLength::Medium, ScriptLength::Long];

    pub fn label(self) -> &'static str {
        match self {
            ScriptLength::Short => "簡短 (約 15 秒)",
            ScriptLength::Medium => "中等 (約 30 秒)",
            ScriptLength::Long => "較長 (約 45-60 秒)",
        }
    }
}

impl fmt::Display for ScriptLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub theme: String,
    pub keywords: Option<String>,
    pub style: ScriptStyle,
    pub length: ScriptLength,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub media: MediaRef,
    pub face: FaceRegion,
    pub script: String,
    pub voice: VoiceChoice,
    pub subtitles: bool,
}

/// Receives upload progress as a percentage in `0..=100`.
pub trait ProgressSink: Send + Sync {
    fn set(&self, percent: u8);
}

impl ProgressSink for indicatif::ProgressBar {
    fn set(&self, percent: u8) {
        self.set_position(percent as u64);
    }
}

/// Media and voice collaborator behind the wizard.
///
/// Each call resolves exactly once, to a value or an error.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Transfers the file and returns a playable reference once progress hits 100.
    async fn upload(&self, file: &MediaFile, progress: &dyn ProgressSink) -> Result<MediaRef>;

    async fn probe(&self, media: &MediaRef) -> Result<Size>;

    /// Candidate faces in source pixels, highest priority first.
    async fn detect_faces(&self, media: &MediaRef) -> Result<Vec<FaceRegion>>;

    async fn generate_script(&self, request: &ScriptRequest) -> Result<String>;

    async fn render(&self, request: &RenderRequest) -> Result<OutputRef>;

    fn name(&self) -> &str;
}

pub fn create_backend(config: &Config) -> Result<Arc<dyn MediaBackend>> {
    info!("Initializing media backend for provider: {}", config.backend.provider);
    match config.backend.provider.as_str() {
        "mock" => Ok(Arc::new(crate::services::mock::MockMediaBackend::new(config)?)),
        _ => Err(anyhow!("Unknown media backend provider: {}", config.backend.provider)),
    }
}
