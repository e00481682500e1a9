//! Configuration persistence for visiondemo settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which camera backend produces photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// Live camera through a GStreamer pipeline
    #[default]
    Gstreamer,
    /// Still image file (or directory of images) standing in for a camera
    File,
}

/// Which classifier runs on captured photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// SqueezeNet 1.1 through ONNX Runtime
    #[default]
    Squeezenet,
}

/// Which speech backend announces results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// External synthesizer process
    #[default]
    Command,
    /// Log the utterance only
    Silent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    /// Device path for `v4l2src` (None = `source`, else the first video source the device monitor reports)
    pub device: Option<String>,
    /// GStreamer source element factory used when no device path is set (e.g. `videotestsrc`)
    pub source: Option<String>,
    /// Capture resolution
    pub width: u32,
    pub height: u32,
    /// Image file or directory used by the file backend
    pub still_image: Option<PathBuf>,
    /// Open a live preview window next to the photo sink
    pub preview_window: bool,
    /// Name of the V4L2 control that switches the flash LED
    pub flash_control: String,
    /// How long to wait for a frame before a capture fails
    pub capture_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackend::Gstreamer,
            device: None,
            source: None,
            // Fixed high-resolution preset
            width: 1920,
            height: 1080,
            still_image: None,
            preview_window: false,
            flash_control: "led_mode".to_string(),
            capture_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// ONNX model file (None = download into the cache dir)
    pub model_path: Option<PathBuf>,
    /// Synset label file (None = download into the cache dir)
    pub labels_path: Option<PathBuf>,
    pub model_url: String,
    pub labels_url: String,
    /// Number of ranked results kept per photo
    pub max_results: usize,
    /// Below this top confidence the result is announced as unsure
    pub confidence_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Squeezenet,
            model_path: None,
            labels_path: None,
            model_url: "https://github.com/onnx/models/raw/main/validated/vision/classification/squeezenet/model/squeezenet1.1-7.onnx".to_string(),
            labels_url: "https://raw.githubusercontent.com/onnx/models/main/validated/vision/classification/synset.txt".to_string(),
            max_results: 5,
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    pub program: String,
    /// Arguments placed before the utterance text
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Command,
            program: "espeak-ng".to_string(),
            args: vec!["-s".to_string(), "150".to_string()],
        }
    }
}

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionDemoConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub speech: SpeechConfig,
    /// Where decorated thumbnails of captured photos are written (None = don't write)
    pub output_dir: Option<PathBuf>,
    /// Size of the hosting view the preview is fitted into
    pub view_width: u32,
    pub view_height: u32,
    /// Reset a capture cycle whose completion never arrives (None = wait forever)
    pub cycle_timeout_secs: Option<u64>,
}

impl Default for VisionDemoConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            classifier: ClassifierConfig::default(),
            speech: SpeechConfig::default(),
            output_dir: dirs::picture_dir().map(|dir| dir.join("visiondemo")),
            // Portrait phone-sized view
            view_width: 375,
            view_height: 667,
            cycle_timeout_secs: None,
        }
    }
}

impl VisionDemoConfig {
    /// Application directory name under the XDG config and cache dirs
    pub const ID: &'static str = "visiondemo";

    /// Path of the config file, honoring `VISIONDEMO_CONFIG`
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("VISIONDEMO_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().context("No config directory available")?;
        Ok(dir.join(Self::ID).join("config.json"))
    }

    /// Directory for downloaded models
    #[cfg(feature = "onnx")]
    pub fn model_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(Self::ID)
            .join("models")
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(err) => {
                log::warn!("Could not locate config file, using defaults: {:?}", err);
                return Self::default();
            }
        };
        match Self::load_from(&path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file if it exists
    pub fn load_from(path: &std::path::Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(Some(config))
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Save configuration to disk
    pub fn save(&self) {
        match Self::config_path() {
            Ok(path) => {
                if let Err(err) = self.save_to(&path) {
                    log::error!("Failed to save config: {:?}", err);
                }
            }
            Err(err) => {
                log::error!("Could not locate config file for saving: {:?}", err);
            }
        }
    }
}
