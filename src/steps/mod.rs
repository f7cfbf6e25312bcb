//! The five wizard pages.

pub mod character;
pub mod preview;
pub mod script;
pub mod upload;
pub mod voice;

use log::warn;

use crate::core::config::Config;
use crate::core::error::{StepError, TransitionError};
use crate::core::state::{StepResult, WizardPayload, WizardStep};
use crate::services::backend::MediaBackend;
use crate::services::notify::Notifier;

pub use character::CharacterStep;
pub use preview::PreviewStep;
pub use script::ScriptStep;
pub use upload::UploadStep;
pub use voice::VoiceStep;

#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a Config,
    pub backend: &'a dyn MediaBackend,
    pub notifier: &'a dyn Notifier,
}

impl<'a> StepContext<'a> {
    pub fn new(config: &'a Config, backend: &'a dyn MediaBackend, notifier: &'a dyn Notifier) -> Self {
        Self {
            config,
            backend,
            notifier,
        }
    }

    /// Surfaces `err` to the user and hands it back to the caller.
    pub fn reject<T>(&self, err: StepError) -> Result<T, StepError> {
        warn!("Rejected: {}", err);
        self.notifier.error(&err);
        Err(err)
    }
}

pub enum ActiveStep {
    Upload(UploadStep),
    Character(CharacterStep),
    Script(ScriptStep),
    Voice(VoiceStep),
    Preview(PreviewStep),
}

impl ActiveStep {
    /// Builds the page for `step`, seeded with any value the user already
    /// entered there. Refuses to mount a page whose upstream data is missing.
    pub fn mount(step: WizardStep, payload: &WizardPayload, config: &Config) -> Result<Self, TransitionError> {
        if !payload.satisfies(step) {
            return Err(TransitionError::MissingUpstream { step });
        }
        let missing = || TransitionError::MissingUpstream { step };

        Ok(match step {
            WizardStep::Upload => ActiveStep::Upload(match &payload.video {
                Some(media) => UploadStep::with_media(media.clone()),
                None => UploadStep::new(),
            }),
            WizardStep::Character => {
                let media = payload.video.clone().ok_or_else(missing)?;
                ActiveStep::Character(CharacterStep::new(media, payload.face))
            }
            WizardStep::Script => ActiveStep::Script(match &payload.script {
                Some(script) => ScriptStep::with_script(script.clone()),
                None => ScriptStep::new(),
            }),
            WizardStep::Voice => {
                let mut view = VoiceStep::from_config(&config.voice);
                if let Some(choice) = &payload.voice {
                    view.restore(choice);
                }
                ActiveStep::Voice(view)
            }
            WizardStep::Preview => ActiveStep::Preview(PreviewStep::from_payload(payload).ok_or_else(missing)?),
        })
    }

    pub fn step(&self) -> WizardStep {
        match self {
            ActiveStep::Upload(_) => WizardStep::Upload,
            ActiveStep::Character(_) => WizardStep::Character,
            ActiveStep::Script(_) => WizardStep::Script,
            ActiveStep::Voice(_) => WizardStep::Voice,
            ActiveStep::Preview(_) => WizardStep::Preview,
        }
    }

    pub fn complete(&self, ctx: &StepContext<'_>) -> Result<Option<StepResult>, StepError> {
        match self {
            ActiveStep::Upload(view) => view.complete(ctx).map(Some),
            ActiveStep::Character(view) => view.complete(ctx).map(Some),
            ActiveStep::Script(view) => view.complete(ctx).map(Some),
            ActiveStep::Voice(view) => view.complete(ctx).map(Some),
            ActiveStep::Preview(_) => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::ActiveStep;
    use crate::core::media::{MediaFile, MediaRef, OutputRef, MIME_MP4};
    use crate::core::state::{Speed, WizardStep};
    use crate::services::backend::{MediaBackend, ProgressSink, RenderRequest, ScriptRequest};
    use crate::services::wizard::WizardController;
    use crate::utils::geometry::{FaceRegion, Point, Size};

    #[derive(Default)]
    pub struct StubBackend {
        pub fail: bool,
        pub faces: Vec<FaceRegion>,
        pub renders: AtomicUsize,
        pub scripts: AtomicUsize,
    }

    impl StubBackend {
        pub fn with_faces(faces: Vec<FaceRegion>) -> Self {
            Self {
                faces,
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    pub fn media() -> MediaRef {
        MediaRef::new(url::Url::parse("file:///tmp/clip.mp4").unwrap())
    }

    pub fn clip(dir: &tempfile::TempDir) -> MediaFile {
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        MediaFile::new(path, MIME_MP4, 18)
    }

    pub async fn walk_to(wizard: &mut WizardController, target: WizardStep, file: &MediaFile) {
        while wizard.current_step() < target {
            let (view, ctx) = wizard.split();
            match view {
                ActiveStep::Upload(view) => {
                    view.submit(&ctx, file, None).await.unwrap();
                }
                ActiveStep::Character(view) => {
                    view.load(&ctx).await.unwrap();
                    view.select_at(Point::new(250.0, 150.0));
                }
                ActiveStep::Script(view) => {
                    view.set_theme("MyWidget");
                    view.generate(&ctx).await.unwrap();
                }
                ActiveStep::Voice(view) => {
                    view.select("voice1");
                    view.set_speed(Speed::from_multiplier(1.2).unwrap());
                }
                ActiveStep::Preview(_) => unreachable!(),
            }
            wizard.next().unwrap();
        }
    }

    #[async_trait]
    impl MediaBackend for StubBackend {
        async fn upload(&self, _file: &MediaFile, progress: &dyn ProgressSink) -> Result<MediaRef> {
            if self.fail {
                return Err(anyhow!("upload refused"));
            }
            for p in [0, 50, 100] {
                progress.set(p);
            }
            Ok(media())
        }

        async fn probe(&self, _media: &MediaRef) -> Result<Size> {
            Ok(Size::new(1280.0, 720.0))
        }

        async fn detect_faces(&self, _media: &MediaRef) -> Result<Vec<FaceRegion>> {
            if self.fail {
                return Err(anyhow!("detector offline"));
            }
            Ok(self.faces.clone())
        }

        async fn generate_script(&self, request: &ScriptRequest) -> Result<String> {
            self.scripts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("generator offline"));
            }
            Ok(format!("關於 {} 的文案", request.theme))
        }

        async fn render(&self, request: &RenderRequest) -> Result<OutputRef> {
            let n = self.renders.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("renderer offline"));
            }
            Ok(OutputRef {
                id: format!("render-{}", n),
                media: request.media.clone(),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }
}
