use log::{debug, info};
use std::sync::atomic::{AtomicU8, Ordering};

use crate::core::error::StepError;
use crate::core::media::{validate_upload, MediaFile, MediaRef};
use crate::core::state::StepResult;
use crate::services::backend::ProgressSink;
use crate::steps::StepContext;

#[derive(Debug, Default)]
pub struct UploadStep {
    drag_active: bool,
    uploading: bool,
    progress: AtomicU8,
    media: Option<MediaRef>,
}

/// Records progress on the step (never going backwards) and forwards it
/// to an optional observer such as a progress bar.
struct Relay<'a> {
    progress: &'a AtomicU8,
    observer: Option<&'a dyn ProgressSink>,
}

impl ProgressSink for Relay<'_> {
    fn set(&self, percent: u8) {
        let percent = percent.min(100);
        let prev = self.progress.fetch_max(percent, Ordering::Relaxed);
        if let Some(observer) = self.observer {
            observer.set(prev.max(percent));
        }
    }
}

impl UploadStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(media: MediaRef) -> Self {
        Self {
            progress: AtomicU8::new(100),
            media: Some(media),
            ..Self::default()
        }
    }

    pub fn set_drag_active(&mut self, active: bool) {
        self.drag_active = active;
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    pub fn can_continue(&self) -> bool {
        self.media.is_some()
    }

    /// Validates the offered file and marks the transfer as started.
    /// Nothing changes when validation fails.
    pub fn begin_upload(&mut self, ctx: &StepContext<'_>, file: &MediaFile) -> Result<(), StepError> {
        self.drag_active = false;
        if self.uploading {
            return ctx.reject(StepError::Busy);
        }
        if let Err(err) = validate_upload(file, &ctx.config.upload) {
            return ctx.reject(err);
        }

        info!("Accepted {} for upload", file.file_name());
        self.uploading = true;
        self.media = None;
        self.progress.store(0, Ordering::Relaxed);
        Ok(())
    }

    pub fn finish_upload(
        &mut self,
        ctx: &StepContext<'_>,
        result: anyhow::Result<MediaRef>,
    ) -> Result<&MediaRef, StepError> {
        self.uploading = false;
        match result {
            Ok(media) => {
                self.progress.store(100, Ordering::Relaxed);
                debug!("Upload ready at {}", media);
                Ok(self.media.insert(media))
            }
            Err(err) => {
                self.progress.store(0, Ordering::Relaxed);
                ctx.reject(StepError::backend(err))
            }
        }
    }

    pub async fn submit(
        &mut self,
        ctx: &StepContext<'_>,
        file: &MediaFile,
        observer: Option<&dyn ProgressSink>,
    ) -> Result<&MediaRef, StepError> {
        self.begin_upload(ctx, file)?;
        let result = {
            let relay = Relay {
                progress: &self.progress,
                observer,
            };
            ctx.backend.upload(file, &relay).await
        };
        self.finish_upload(ctx, result)
    }

    pub fn reupload(&mut self) {
        info!("Discarding uploaded media");
        self.media = None;
        self.uploading = false;
        self.progress.store(0, Ordering::Relaxed);
    }

    pub fn complete(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        match &self.media {
            Some(media) => Ok(StepResult::Upload(media.clone())),
            None => ctx.reject(StepError::NoMedia),
        }
    }
}
