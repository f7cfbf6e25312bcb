use anyhow::Context;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::error::StepError;
use crate::core::media::{MediaRef, OutputRef};
use crate::core::state::{VoiceChoice, WizardPayload};
use crate::services::backend::RenderRequest;
use crate::steps::StepContext;
use crate::utils::geometry::FaceRegion;

#[derive(Debug, Serialize)]
struct RenderManifest<'a> {
    output: &'a OutputRef,
    #[serde(flatten)]
    request: &'a RenderRequest,
}

#[derive(Debug)]
pub struct PreviewStep {
    media: MediaRef,
    face: FaceRegion,
    script: String,
    voice: VoiceChoice,
    subtitles: bool,
    processing: bool,
    output: Option<OutputRef>,
    last_request: Option<RenderRequest>,
}

impl PreviewStep {
    pub fn from_payload(payload: &WizardPayload) -> Option<Self> {
        Some(Self {
            media: payload.video.clone()?,
            face: payload.face?,
            script: payload.script.clone()?,
            voice: payload.voice.clone()?,
            subtitles: true,
            processing: false,
            output: None,
            last_request: None,
        })
    }

    pub fn voice(&self) -> &VoiceChoice {
        &self.voice
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn subtitles(&self) -> bool {
        self.subtitles
    }

    pub fn set_subtitles(&mut self, on: bool) {
        self.subtitles = on;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn output(&self) -> Option<&OutputRef> {
        self.output.as_ref()
    }

    pub fn can_process(&self) -> bool {
        !self.processing
    }

    pub fn can_finish(&self) -> bool {
        self.output.is_some()
    }

    pub fn begin_process(&mut self, ctx: &StepContext<'_>) -> Result<RenderRequest, StepError> {
        if self.processing {
            return ctx.reject(StepError::Busy);
        }
        self.processing = true;
        Ok(RenderRequest {
            media: self.media.clone(),
            face: self.face,
            script: self.script.clone(),
            voice: self.voice.clone(),
            subtitles: self.subtitles,
        })
    }

    /// Stores the render result. A new result replaces any earlier one.
    pub fn finish_process(
        &mut self,
        ctx: &StepContext<'_>,
        request: RenderRequest,
        result: anyhow::Result<OutputRef>,
    ) -> Result<&OutputRef, StepError> {
        self.processing = false;
        match result {
            Ok(output) => {
                info!("Render {} ready", output.id);
                ctx.notifier
                    .info("處理完成", "您的影片已成功處理，可以預覽或下載");
                self.last_request = Some(request);
                Ok(self.output.insert(output))
            }
            Err(err) => ctx.reject(StepError::backend(err)),
        }
    }

    pub async fn process(&mut self, ctx: &StepContext<'_>) -> Result<&OutputRef, StepError> {
        let request = self.begin_process(ctx)?;
        let result = ctx.backend.render(&request).await;
        self.finish_process(ctx, request, result)
    }

    /// Writes a JSON manifest of the finished render into the output folder.
    pub async fn download(&self, ctx: &StepContext<'_>) -> Result<PathBuf, StepError> {
        let (output, request) = match (&self.output, &self.last_request) {
            (Some(output), Some(request)) => (output, request),
            _ => return ctx.reject(StepError::NoOutput),
        };

        let dir = Path::new(&ctx.config.output_folder);
        let path = dir.join(format!("{}.json", output.id));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            let manifest = RenderManifest { output, request };
            let content = serde_json::to_string_pretty(&manifest)?;
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            anyhow::Ok(())
        }
        .await;

        match written {
            Ok(()) => {
                info!("Exported {}", path.display());
                ctx.notifier.info("下載開始", "您的影片正在下載中");
                Ok(path)
            }
            Err(err) => ctx.reject(StepError::backend(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::state::Speed;
    use crate::services::backend::MediaBackend;
    use crate::services::notify::{RecordingNotifier, Severity};
    use crate::steps::testing::{media, StubBackend};
    use std::sync::atomic::Ordering;

    fn payload() -> WizardPayload {
        WizardPayload {
            video: Some(media()),
            face: Some(FaceRegion::new(200.0, 100.0, 120.0, 120.0)),
            script: Some("隆重推出 MyWidget".to_string()),
            voice: Some(VoiceChoice {
                id: "voice1".to_string(),
                display_name: "女聲 - 小美".to_string(),
                speed: Speed::from_multiplier(1.2).unwrap(),
            }),
            output: None,
        }
    }

    #[test]
    fn test_needs_full_payload() {
        let mut partial = payload();
        partial.voice = None;
        assert!(PreviewStep::from_payload(&partial).is_none());

        let view = PreviewStep::from_payload(&payload()).unwrap();
        assert!(view.subtitles());
        assert!(!view.can_finish());
        assert_eq!(view.voice().display_name, "女聲 - 小美");
    }

    #[tokio::test]
    async fn test_process_is_not_reentrant() {
        let config = Config::default();
        let backend = StubBackend::default();
        let notifier = RecordingNotifier::new();
        let ctx = StepContext::new(&config, &backend, &notifier);

        let mut view = PreviewStep::from_payload(&payload()).unwrap();
        view.set_subtitles(false);
        let request = view.begin_process(&ctx).unwrap();
        assert!(!request.subtitles);
        assert!(view.is_processing());
        assert!(!view.can_process());
        assert_eq!(view.begin_process(&ctx), Err(StepError::Busy));

        let result = backend.render(&request).await;
        view.finish_process(&ctx, request, result).unwrap();
        assert!(view.can_finish());
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_download_requires_output() {
        let config = Config::default();
        let backend = StubBackend::default();
        let notifier = RecordingNotifier::new();
        let ctx = StepContext::new(&config, &backend, &notifier);

        let view = PreviewStep::from_payload(&payload()).unwrap();
        assert_eq!(view.download(&ctx).await, Err(StepError::NoOutput));
        assert_eq!(notifier.count(Severity::Error), 1);
    }

    #[tokio::test]
    async fn test_download_exports_manifest() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config {
            output_folder: dir.path().join("out").to_string_lossy().to_string(),
            ..Config::default()
        };
        let backend = StubBackend::default();
        let notifier = RecordingNotifier::new();
        let ctx = StepContext::new(&config, &backend, &notifier);

        let mut view = PreviewStep::from_payload(&payload()).unwrap();
        let output_id = view.process(&ctx).await.unwrap().id.clone();
        let path = view.download(&ctx).await.unwrap();

        assert_eq!(path.file_name().unwrap().to_string_lossy(), format!("{}.json", output_id));
        let manifest: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(manifest["output"]["id"], output_id.as_str());
        assert_eq!(manifest["voice"]["id"], "voice1");
        assert_eq!(manifest["voice"]["speed"], 1.2);
        assert_eq!(manifest["subtitles"], true);

        let titles: Vec<String> = notifier.take().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["處理完成", "下載開始"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_render_allows_retry() {
        let config = Config::default();
        let backend = StubBackend::failing();
        let notifier = RecordingNotifier::new();
        let ctx = StepContext::new(&config, &backend, &notifier);

        let mut view = PreviewStep::from_payload(&payload()).unwrap();
        assert!(matches!(view.process(&ctx).await, Err(StepError::Backend { .. })));
        assert!(!view.is_processing());
        assert!(view.can_process());
        assert!(!view.can_finish());
    }
}
