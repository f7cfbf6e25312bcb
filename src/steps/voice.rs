use log::debug;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::config::{VoiceConfig, VoiceOption};
use crate::core::error::StepError;
use crate::core::state::{Speed, SpeedLabel, StepResult, VoiceChoice};
use crate::steps::StepContext;

#[derive(Debug, Clone)]
struct Playback {
    voice_id: String,
    started: Instant,
}

#[derive(Debug)]
pub struct VoiceStep {
    catalog: Vec<VoiceOption>,
    selected: Option<String>,
    speed: Speed,
    playing: Option<Playback>,
    sample_duration: Duration,
}

impl VoiceStep {
    pub fn new(catalog: Vec<VoiceOption>, sample_duration: Duration) -> Self {
        Self {
            catalog,
            selected: None,
            speed: Speed::default(),
            playing: None,
            sample_duration,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            config.catalog.clone(),
            Duration::from_millis(config.sample_duration_ms),
        )
    }

    pub fn restore(&mut self, choice: &VoiceChoice) {
        self.select(&choice.id);
        self.speed = choice.speed;
    }

    pub fn catalog(&self) -> &[VoiceOption] {
        &self.catalog
    }

    pub fn select(&mut self, voice_id: &str) -> bool {
        if self.catalog.iter().any(|v| v.id == voice_id) {
            self.selected = Some(voice_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&VoiceOption> {
        let id = self.selected.as_deref()?;
        self.catalog.iter().find(|v| v.id == id)
    }

    pub fn can_continue(&self) -> bool {
        self.selected.is_some()
    }

    /// Starts the sample for `voice_id`, or stops it if it is the one playing.
    /// Returns whether that sample is playing afterwards.
    pub fn toggle_sample(&mut self, voice_id: &str) -> bool {
        if self.playing() == Some(voice_id) {
            debug!("Stopping sample {}", voice_id);
            self.playing = None;
            return false;
        }
        debug!("Playing sample {}", voice_id);
        self.playing = Some(Playback {
            voice_id: voice_id.to_string(),
            started: Instant::now(),
        });
        true
    }

    /// The sample currently playing; samples stop by themselves after the
    /// configured duration.
    pub fn playing(&self) -> Option<&str> {
        self.playing
            .as_ref()
            .filter(|p| p.started.elapsed() < self.sample_duration)
            .map(|p| p.voice_id.as_str())
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    pub fn speed_label(&self) -> SpeedLabel {
        self.speed.label()
    }

    pub fn complete(&self, ctx: &StepContext<'_>) -> Result<StepResult, StepError> {
        match self.selected() {
            Some(voice) => Ok(StepResult::Voice(VoiceChoice {
                id: voice.id.clone(),
                display_name: voice.name.clone(),
                speed: self.speed,
            })),
            None => ctx.reject(StepError::NoVoice),
        }
    }
}
