use log::{debug, info, warn};

use crate::core::error::StepError;
use crate::core::media::MediaRef;
use crate::core::state::StepResult;
use crate::steps::StepContext;
use crate::utils::geometry::{display_to_source, hit_test, FaceRegion, Point, Scale, Size};

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    pub number: usize,
    pub region: FaceRegion,
    pub selected: bool,
}

#[derive(Debug)]
pub struct CharacterStep {
    media: MediaRef,
    frame: Option<Size>,
    faces: Vec<FaceRegion>,
    selected: Option<usize>,
    pending: Option<FaceRegion>,
}

impl CharacterStep {
    /// `previous` is the face chosen on an earlier visit, reselected once
    /// detection results arrive.
    pub fn new(media: MediaRef, previous: Option<FaceRegion>) -> Self {
        Self {
            media,
            frame: None,
            faces: Vec::new(),
            selected: None,
            pending: previous,
        }
    }

    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    pub fn is_loaded(&self) -> bool {
        self.frame.is_some()
    }

    pub fn frame(&self) -> Option<Size> {
        self.frame
    }

    pub fn faces(&self) -> &[FaceRegion] {
        &self.faces
    }

    pub fn selected(&self) -> Option<&FaceRegion> {
        self.selected.and_then(|i| self.faces.get(i))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn can_continue(&self) -> bool {
        self.selected.is_some()
    }

    /// Reads the intrinsic frame size and the candidate faces.
    /// Candidates that do not fit inside the frame are dropped.
    pub async fn load(&mut self, ctx: &StepContext<'_>) -> Result<(), StepError> {
        let probed = futures_util::try_join!(
            ctx.backend.probe(&self.media),
            ctx.backend.detect_faces(&self.media)
        );
        let (frame, detected) = match probed {
            Ok(found) => found,
            Err(err) => return ctx.reject(StepError::backend(err)),
        };

        let total = detected.len();
        let faces: Vec<FaceRegion> = detected
            .into_iter()
            .filter(|face| {
                let fits = face.fits_within(frame);
                if !fits {
                    warn!("Discarding face {:?} outside {:?}", face, frame);
                }
                fits
            })
            .collect();
        info!("Detected {} face(s), kept {}", total, faces.len());

        self.selected = self
            .pending
            .take()
            .and_then(|prev| faces.iter().position(|f| *f == prev));
        self.frame = Some(frame);
        self.faces = faces;
        Ok(())
    }

    /// Selects the first face containing a point given in source pixels.
    /// A miss leaves the current selection untouched.
    pub fn select_at(&mut self, p: Point) -> Option<usize> {
        if let Some(i) = hit_test(&self.faces, p) {
            debug!("Selected face {} at ({}, {})", i + 1, p.x, p.y);
            self.selected = Some(i);
        }
        self.selected
    }

    pub fn click(&mut self, p: Point, display: Size) -> Option<usize> {
        let source = match self.frame.and_then(|frame| display_to_source(p, display, frame)) {
            Some(source) => source,
            None => return self.selected,
        };
        self.select_at(source)
    }

    pub fn overlay(&self, display: Size) -> Vec<OverlayBox> {
        let scale = match self.frame.and_then(|frame| Scale::between(frame, display)) {
            Some(scale) => scale,
            None => return Vec::new(),
        };
        self.faces
            .iter()
            .enumerate()
            .map(|(i, face)| OverlayBox {
                number: i + 1,
                region: face.scaled(scale),
                selected: self.selected == Some(i),
            })
            .collect()
    }

    pub fn complete(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        match self.selected() {
            Some(face) => {
                ctx.notifier.info("已選擇角色", "成功鎖定影片中的角色");
                Ok(StepResult::Character(*face))
            }
            None => ctx.reject(StepError::NoSelection),
        }
    }
}
