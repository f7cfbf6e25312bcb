use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::TransitionError;
use crate::core::media::{MediaRef, OutputRef};
use crate::utils::geometry::FaceRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    Upload = 1,
    Character = 2,
    Script = 3,
    Voice = 4,
    Preview = 5,
}

pub const ALL_STEPS: [WizardStep; 5] = [
    WizardStep::Upload,
    WizardStep::Character,
    WizardStep::Script,
    WizardStep::Voice,
    WizardStep::Preview,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Current,
    Pending,
}

impl WizardStep {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<WizardStep> {
        ALL_STEPS.get(self.index() as usize).copied()
    }

    pub fn prev(self) -> Option<WizardStep> {
        match self.index() {
            1 => None,
            i => ALL_STEPS.get(i as usize - 2).copied(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Upload => "上傳影片",
            WizardStep::Character => "選擇角色",
            WizardStep::Script => "文案生成",
            WizardStep::Voice => "選擇語音",
            WizardStep::Preview => "預覽與輸出",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Upload => "Upload",
            WizardStep::Character => "Select character",
            WizardStep::Script => "Script",
            WizardStep::Voice => "Voice",
            WizardStep::Preview => "Preview & export",
        }
    }

    pub fn status(self, current: WizardStep) -> StepStatus {
        match self.cmp(&current) {
            std::cmp::Ordering::Less => StepStatus::Done,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Pending,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index(), self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedLabel {
    Slow,
    Normal,
    Fast,
}

impl SpeedLabel {
    pub fn zh(self) -> &'static str {
        match self {
            SpeedLabel::Slow => "較慢",
            SpeedLabel::Normal => "正常",
            SpeedLabel::Fast => "較快",
        }
    }
}

impl fmt::Display for SpeedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpeedLabel::Slow => "slow",
            SpeedLabel::Normal => "normal",
            SpeedLabel::Fast => "fast",
        };
        f.write_str(s)
    }
}

/// Voice speed multiplier in `[0.5, 1.5]` with a 0.1 step, stored in tenths
/// so comparisons against 1.0 are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Speed(u8);

impl Speed {
    pub const MIN_TENTHS: u8 = 5;
    pub const MAX_TENTHS: u8 = 15;
    pub const NORMAL: Speed = Speed(10);

    /// Rounds to the nearest 0.1. The range is checked before rounding.
    pub fn from_multiplier(value: f64) -> Option<Speed> {
        const EPSILON: f64 = 1e-9;
        let min = Self::MIN_TENTHS as f64 / 10.0;
        let max = Self::MAX_TENTHS as f64 / 10.0;
        if !value.is_finite() || value < min - EPSILON || value > max + EPSILON {
            return None;
        }
        let tenths = (value * 10.0).round() as u8;
        Some(Speed(tenths.clamp(Self::MIN_TENTHS, Self::MAX_TENTHS)))
    }

    pub fn multiplier(self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn label(self) -> SpeedLabel {
        match self.0.cmp(&Self::NORMAL.0) {
            std::cmp::Ordering::Less => SpeedLabel::Slow,
            std::cmp::Ordering::Equal => SpeedLabel::Normal,
            std::cmp::Ordering::Greater => SpeedLabel::Fast,
        }
    }

    pub fn all() -> impl Iterator<Item = Speed> {
        (Self::MIN_TENTHS..=Self::MAX_TENTHS).map(Speed)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Speed::NORMAL
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}x)", self.label().zh(), self.multiplier())
    }
}

impl TryFrom<f64> for Speed {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Speed::from_multiplier(value).ok_or_else(|| format!("speed {} outside 0.5..=1.5", value))
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> f64 {
        speed.multiplier()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceChoice {
    pub id: String,
    pub display_name: String,
    pub speed: Speed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardPayload {
    pub video: Option<MediaRef>,
    pub face: Option<FaceRegion>,
    pub script: Option<String>,
    pub voice: Option<VoiceChoice>,
    pub output: Option<OutputRef>,
}

impl WizardPayload {
    pub fn is_empty(&self) -> bool {
        *self == WizardPayload::default()
    }

    /// Whether every field a view mounted at `step` needs from earlier steps is set.
    pub fn satisfies(&self, step: WizardStep) -> bool {
        let mut ok = true;
        if step >= WizardStep::Character {
            ok &= self.video.is_some();
        }
        if step >= WizardStep::Script {
            ok &= self.face.is_some();
        }
        if step >= WizardStep::Voice {
            ok &= self.script.is_some();
        }
        if step >= WizardStep::Preview {
            ok &= self.voice.is_some();
        }
        ok
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Upload(MediaRef),
    Character(FaceRegion),
    Script(String),
    Voice(VoiceChoice),
}

impl StepResult {
    pub fn step(&self) -> WizardStep {
        match self {
            StepResult::Upload(_) => WizardStep::Upload,
            StepResult::Character(_) => WizardStep::Character,
            StepResult::Script(_) => WizardStep::Script,
            StepResult::Voice(_) => WizardStep::Voice,
        }
    }
}

/// The wizard state machine: current step plus the accumulated payload.
///
/// Results are assumed to be validated by the view that produced them;
/// only structural misuse (wrong step, out-of-range move) is rejected here.
#[derive(Debug, Clone, PartialEq)]
pub struct StepState {
    current: WizardStep,
    payload: WizardPayload,
}

impl Default for StepState {
    fn default() -> Self {
        Self::new()
    }
}

impl StepState {
    pub fn new() -> Self {
        Self {
            current: WizardStep::Upload,
            payload: WizardPayload::default(),
        }
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn payload(&self) -> &WizardPayload {
        &self.payload
    }

    pub fn advance(&mut self, result: StepResult) -> Result<WizardStep, TransitionError> {
        let next = self.current.next().ok_or(TransitionError::AtLastStep)?;
        if result.step() != self.current {
            return Err(TransitionError::StepMismatch {
                current: self.current,
                got: result.step(),
            });
        }

        match result {
            StepResult::Upload(media) => self.payload.video = Some(media),
            StepResult::Character(face) => self.payload.face = Some(face),
            StepResult::Script(script) => self.payload.script = Some(script),
            StepResult::Voice(voice) => self.payload.voice = Some(voice),
        }
        // A render made from earlier inputs no longer matches the payload.
        if let Some(stale) = self.payload.output.take() {
            info!("Dropping render {}", stale.id);
        }

        info!("Wizard advanced: {} -> {}", self.current, next);
        self.current = next;
        Ok(next)
    }

    /// Steps back one page. The payload is left as is so it can be edited.
    pub fn retreat(&mut self) -> Result<WizardStep, TransitionError> {
        let prev = self.current.prev().ok_or(TransitionError::AtFirstStep)?;
        info!("Wizard retreated: {} -> {}", self.current, prev);
        self.current = prev;
        Ok(prev)
    }

    pub fn record_output(&mut self, output: OutputRef) -> Result<(), TransitionError> {
        if self.current != WizardStep::Preview {
            return Err(TransitionError::NotAtPreview {
                current: self.current,
            });
        }
        self.payload.output = Some(output);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), TransitionError> {
        if self.current != WizardStep::Preview {
            warn!("Ignoring reset from {}", self.current);
            return Err(TransitionError::NotAtPreview {
                current: self.current,
            });
        }
        *self = StepState::new();
        info!("Wizard reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn media() -> MediaRef {
        MediaRef::new(Url::parse("file:///tmp/clip.mp4").unwrap())
    }

    fn voice() -> VoiceChoice {
        VoiceChoice {
            id: "voice1".to_string(),
            display_name: "女聲 - 小美".to_string(),
            speed: Speed::from_multiplier(1.2).unwrap(),
        }
    }

    fn results() -> Vec<StepResult> {
        vec![
            StepResult::Upload(media()),
            StepResult::Character(FaceRegion::new(200.0, 100.0, 120.0, 120.0)),
            StepResult::Script("hello".to_string()),
            StepResult::Voice(voice()),
        ]
    }

    fn state_at(step: WizardStep) -> StepState {
        let mut state = StepState::new();
        for result in results().into_iter().take(step.index() as usize - 1) {
            state.advance(result).unwrap();
        }
        state
    }

    #[test]
    fn test_initial_state() {
        let state = StepState::new();
        assert_eq!(state.current(), WizardStep::Upload);
        assert!(state.payload().is_empty());
    }

    #[test]
    fn test_advance_merges_only_owned_field() {
        let mut state = StepState::new();
        state.advance(StepResult::Upload(media())).unwrap();
        assert_eq!(state.current(), WizardStep::Character);
        assert_eq!(state.payload().video, Some(media()));
        assert!(state.payload().face.is_none());
        assert!(state.payload().script.is_none());

        state
            .advance(StepResult::Character(FaceRegion::new(1.0, 2.0, 3.0, 4.0)))
            .unwrap();
        assert_eq!(state.current(), WizardStep::Script);
        assert_eq!(state.payload().face, Some(FaceRegion::new(1.0, 2.0, 3.0, 4.0)));
        assert!(state.payload().voice.is_none());
    }

    #[test]
    fn test_retreat_preserves_payload() {
        for step in [
            WizardStep::Character,
            WizardStep::Script,
            WizardStep::Voice,
            WizardStep::Preview,
        ] {
            let mut state = state_at(step);
            let before = state.payload().clone();
            let prev = state.retreat().unwrap();
            assert_eq!(prev.index(), step.index() - 1);
            assert_eq!(state.payload(), &before);
        }
    }

    #[test]
    fn test_boundaries_are_rejected() {
        let mut state = StepState::new();
        assert_eq!(state.retreat(), Err(TransitionError::AtFirstStep));
        assert_eq!(state.current(), WizardStep::Upload);

        let mut state = state_at(WizardStep::Preview);
        assert_eq!(
            state.advance(StepResult::Script("x".to_string())),
            Err(TransitionError::AtLastStep)
        );
        assert_eq!(state.current(), WizardStep::Preview);
    }

    #[test]
    fn test_mismatched_result_is_rejected() {
        let mut state = StepState::new();
        let err = state.advance(StepResult::Script("x".to_string())).unwrap_err();
        assert_eq!(
            err,
            TransitionError::StepMismatch {
                current: WizardStep::Upload,
                got: WizardStep::Script
            }
        );
        assert!(state.payload().is_empty());
    }

    #[test]
    fn test_reset_only_from_preview() {
        let mut state = state_at(WizardStep::Voice);
        assert!(state.reset().is_err());
        assert_eq!(state.current(), WizardStep::Voice);

        let mut state = state_at(WizardStep::Preview);
        state
            .record_output(OutputRef {
                id: "render-1".to_string(),
                media: media(),
            })
            .unwrap();
        state.reset().unwrap();
        assert_eq!(state, StepState::new());
    }

    #[test]
    fn test_record_output_requires_preview() {
        let mut state = state_at(WizardStep::Voice);
        let output = OutputRef {
            id: "render-1".to_string(),
            media: media(),
        };
        assert!(state.record_output(output).is_err());
        assert!(state.payload().output.is_none());
    }

    #[test]
    fn test_payload_satisfies_upstream() {
        let state = state_at(WizardStep::Voice);
        assert!(state.payload().satisfies(WizardStep::Voice));
        assert!(!state.payload().satisfies(WizardStep::Preview));
        assert!(WizardPayload::default().satisfies(WizardStep::Upload));
        assert!(!WizardPayload::default().satisfies(WizardStep::Character));
    }

    #[test]
    fn test_step_navigation_and_status() {
        assert_eq!(WizardStep::Upload.next(), Some(WizardStep::Character));
        assert_eq!(WizardStep::Preview.next(), None);
        assert_eq!(WizardStep::Upload.prev(), None);
        assert_eq!(WizardStep::Preview.prev(), Some(WizardStep::Voice));

        assert_eq!(WizardStep::Upload.status(WizardStep::Script), StepStatus::Done);
        assert_eq!(WizardStep::Script.status(WizardStep::Script), StepStatus::Current);
        assert_eq!(WizardStep::Preview.status(WizardStep::Script), StepStatus::Pending);
    }

    #[test]
    fn test_speed_labels() {
        assert_eq!(Speed::from_multiplier(0.5).unwrap().label(), SpeedLabel::Slow);
        assert_eq!(Speed::from_multiplier(1.0).unwrap().label(), SpeedLabel::Normal);
        assert_eq!(Speed::from_multiplier(1.5).unwrap().label(), SpeedLabel::Fast);
        assert_eq!(SpeedLabel::Slow.to_string(), "slow");
        assert_eq!(Speed::from_multiplier(1.2).unwrap().to_string(), "較快 (1.2x)");
    }

    #[test]
    fn test_speed_range_and_steps() {
        assert!(Speed::from_multiplier(0.4).is_none());
        assert!(Speed::from_multiplier(1.6).is_none());
        assert!(Speed::from_multiplier(f64::NAN).is_none());
        assert_eq!(Speed::from_multiplier(0.7 + 0.2).unwrap().tenths(), 9);
        assert_eq!(Speed::default(), Speed::NORMAL);
        assert_eq!(Speed::all().count(), 11);
    }

    #[test]
    fn test_speed_near_bounds_is_rejected() {
        assert!(Speed::from_multiplier(1.54).is_none());
        assert!(Speed::from_multiplier(0.46).is_none());
        assert_eq!(Speed::from_multiplier(1.5).unwrap().tenths(), 15);
        assert_eq!(Speed::from_multiplier(0.1 * 5.0).unwrap().tenths(), 5);

        let parsed: Result<VoiceChoice, _> =
            serde_yaml_ng::from_str("id: voice1\ndisplay_name: a\nspeed: 1.54\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_advance_drops_earlier_render() {
        let mut state = state_at(WizardStep::Preview);
        state
            .record_output(OutputRef {
                id: "render-1".to_string(),
                media: media(),
            })
            .unwrap();

        state.retreat().unwrap();
        state.advance(StepResult::Voice(voice())).unwrap();
        assert_eq!(state.current(), WizardStep::Preview);
        assert!(state.payload().output.is_none());
    }
}
