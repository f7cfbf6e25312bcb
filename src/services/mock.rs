use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::config::{Config, UploadConfig};
use crate::core::media::{MediaFile, MediaRef, OutputRef};
use crate::services::backend::{
    MediaBackend, ProgressSink, RenderRequest, ScriptLength, ScriptRequest, ScriptStyle,
};
use crate::utils::geometry::{FaceRegion, Size};

const CANNED_SCRIPTS: &str = include_str!("../../assets/mock_scripts.yml");

#[derive(Debug, Deserialize, Clone)]
pub struct CannedScripts {
    pub placeholder: String,
    pub scripts: HashMap<ScriptStyle, HashMap<ScriptLength, String>>,
}

impl CannedScripts {
    pub fn bundled() -> Result<Self> {
        serde_yaml_ng::from_str(CANNED_SCRIPTS).context("Failed to parse bundled mock scripts")
    }

    /// Canned copy for `style` x `length` with every placeholder replaced by `theme`.
    pub fn render(&self, style: ScriptStyle, length: ScriptLength, theme: &str) -> Result<String> {
        let text = self
            .scripts
            .get(&style)
            .and_then(|by_length| by_length.get(&length))
            .ok_or_else(|| anyhow!("No canned script for {:?}/{:?}", style, length))?;
        Ok(text.replace(&self.placeholder, theme))
    }
}

/// Stand-in backend: fixed delays, fixed data, always succeeds.
pub struct MockMediaBackend {
    upload: UploadConfig,
    frame: Size,
    faces: Vec<FaceRegion>,
    script_delay: Duration,
    render_delay: Duration,
    scripts: CannedScripts,
}

impl MockMediaBackend {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            upload: config.upload.clone(),
            frame: config.backend.frame_size(),
            faces: config.backend.faces.clone(),
            script_delay: Duration::from_millis(config.backend.script_delay_ms),
            render_delay: Duration::from_millis(config.backend.render_delay_ms),
            scripts: CannedScripts::bundled()?,
        })
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    async fn upload(&self, file: &MediaFile, progress: &dyn ProgressSink) -> Result<MediaRef> {
        let step = self.upload.progress_step.clamp(1, 100);
        let interval = Duration::from_millis(self.upload.progress_interval_ms);
        info!("Uploading {} ({} bytes)", file.file_name(), file.size);

        let mut percent: u8 = 0;
        progress.set(percent);
        while percent < 100 {
            tokio::time::sleep(interval).await;
            percent = percent.saturating_add(step).min(100);
            debug!("Upload progress {}%", percent);
            progress.set(percent);
        }

        MediaRef::from_file(&file.path)
    }

    async fn probe(&self, _media: &MediaRef) -> Result<Size> {
        Ok(self.frame)
    }

    async fn detect_faces(&self, media: &MediaRef) -> Result<Vec<FaceRegion>> {
        debug!("Detecting faces in {}", media);
        Ok(self.faces.clone())
    }

    async fn generate_script(&self, request: &ScriptRequest) -> Result<String> {
        info!(
            "Generating {:?}/{:?} script for theme {:?}",
            request.style, request.length, request.theme
        );
        if let Some(keywords) = &request.keywords {
            debug!("Keywords are not used by the mock generator: {}", keywords);
        }
        tokio::time::sleep(self.script_delay).await;
        self.scripts.render(request.style, request.length, &request.theme)
    }

    async fn render(&self, request: &RenderRequest) -> Result<OutputRef> {
        info!(
            "Rendering {} with voice {} at {:.1}x (subtitles: {})",
            request.media,
            request.voice.id,
            request.voice.speed.multiplier(),
            request.subtitles
        );
        tokio::time::sleep(self.render_delay).await;
        Ok(OutputRef {
            id: format!("render-{:016x}", rand::random::<u64>()),
            media: request.media.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
