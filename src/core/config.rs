use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::media::{MIME_MP4, MIME_QUICKTIME};
use crate::utils::geometry::{FaceRegion, Size};

pub const DEFAULT_CONFIG_PATH: &str = "lipsync.yml";
pub const CONFIG_PATH_ENV: &str = "LIPSYNC_CONFIG";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_folder: default_output(),
            upload: UploadConfig::default(),
            backend: BackendConfig::default(),
            voice: VoiceConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            accepted_types: default_accepted_types(),
            progress_step: default_progress_step(),
            progress_interval_ms: default_progress_interval(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_backend_provider")]
    pub provider: String,
    #[serde(default = "default_frame_width")]
    pub frame_width: f64,
    #[serde(default = "default_frame_height")]
    pub frame_height: f64,
    #[serde(default = "default_faces")]
    pub faces: Vec<FaceRegion>,
    #[serde(default = "default_script_delay")]
    pub script_delay_ms: u64,
    #[serde(default = "default_render_delay")]
    pub render_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_backend_provider(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            faces: default_faces(),
            script_delay_ms: default_script_delay(),
            render_delay_ms: default_render_delay(),
        }
    }
}

impl BackendConfig {
    pub fn frame_size(&self) -> Size {
        Size::new(self.frame_width, self.frame_height)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Female => "女聲",
            Gender::Male => "男聲",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub sample: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VoiceConfig {
    #[serde(default = "default_catalog")]
    pub catalog: Vec<VoiceOption>,
    #[serde(default = "default_sample_duration")]
    pub sample_duration_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            sample_duration_ms: default_sample_duration(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_display_width")]
    pub width: f64,
    #[serde(default = "default_display_height")]
    pub height: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            height: default_display_height(),
        }
    }
}

impl DisplayConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

fn default_output() -> String {
    "output".to_string()
}
fn default_max_bytes() -> u64 {
    100 * 1024 * 1024
}
fn default_accepted_types() -> Vec<String> {
    vec![MIME_MP4.to_string(), MIME_QUICKTIME.to_string()]
}
fn default_progress_step() -> u8 {
    10
}
fn default_progress_interval() -> u64 {
    500
}
fn default_backend_provider() -> String {
    "mock".to_string()
}
fn default_frame_width() -> f64 {
    1280.0
}
fn default_frame_height() -> f64 {
    720.0
}
fn default_faces() -> Vec<FaceRegion> {
    vec![
        FaceRegion::new(200.0, 100.0, 120.0, 120.0),
        FaceRegion::new(400.0, 150.0, 100.0, 100.0),
    ]
}
fn default_script_delay() -> u64 {
    2000
}
fn default_render_delay() -> u64 {
    5000
}
fn default_sample_duration() -> u64 {
    3000
}
fn default_display_width() -> f64 {
    640.0
}
fn default_display_height() -> f64 {
    360.0
}

fn default_catalog() -> Vec<VoiceOption> {
    let voice = |id: &str, name: &str, gender: Gender, sample: &str| VoiceOption {
        id: id.to_string(),
        name: name.to_string(),
        gender,
        sample: sample.to_string(),
    };
    vec![
        voice("voice1", "女聲 - 小美", Gender::Female, "/sample1.wav"),
        voice("voice2", "女聲 - 小雲", Gender::Female, "/sample2.wav"),
        voice("voice3", "男聲 - 大偉", Gender::Male, "/sample3.wav"),
        voice("voice4", "男聲 - 小剛", Gender::Male, "/sample4.wav"),
    ]
}

impl Config {
    /// Path from `LIPSYNC_CONFIG`, falling back to `lipsync.yml`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// A missing file is not an error: every field has a default.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using built-in defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}
