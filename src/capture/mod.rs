//! Camera capture module
//!
//! This module consolidates:
//! - Capture session setup and preview geometry (session.rs)
//! - Captured photo bytes and decoding (photo.rs)
//! - GStreamer camera pipeline (pipeline.rs)
//! - Still-image file camera (file.rs)

pub mod file;
#[cfg(feature = "gstreamer")]
pub mod pipeline;
pub mod photo;
pub mod session;

use anyhow::Result;

use crate::config::{CameraBackend, CameraConfig};
use photo::CapturedPhoto;

/// Flash setting for a capture request (no auto mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    On,
    #[default]
    Off,
}

impl FlashMode {
    pub fn toggled(self) -> Self {
        match self {
            FlashMode::On => FlashMode::Off,
            FlashMode::Off => FlashMode::On,
        }
    }

    pub fn is_on(self) -> bool {
        self == FlashMode::On
    }
}

/// Settings for one capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub flash: FlashMode,
}

impl CaptureSettings {
    pub fn new(flash: FlashMode) -> Self {
        Self { flash }
    }
}

/// A still-photo sink attached to a camera device
///
/// `capture` blocks until the photo is encoded; callers run it on a blocking worker.
pub trait PhotoOutput: Send + Sync {
    /// Name of the device feeding this output
    fn device_name(&self) -> &str;

    /// Start delivering frames
    fn start(&self) -> Result<()>;

    /// Stop delivering frames
    fn stop(&self) -> Result<()>;

    /// Capture one encoded photo honoring the settings
    fn capture(&self, settings: CaptureSettings) -> Result<CapturedPhoto>;
}

/// Create the photo output for the configured backend
pub fn create_output(cfg: &CameraConfig) -> Result<Box<dyn PhotoOutput>> {
    match cfg.backend {
        #[cfg(feature = "gstreamer")]
        CameraBackend::Gstreamer => Ok(Box::new(pipeline::CameraPipeline::new(cfg)?)),
        #[cfg(not(feature = "gstreamer"))]
        CameraBackend::Gstreamer => {
            anyhow::bail!("GStreamer camera support not compiled in (enable the `gstreamer` feature)")
        }
        CameraBackend::File => {
            let path = cfg
                .still_image
                .clone()
                .ok_or_else(|| anyhow::anyhow!("File camera needs `camera.still_image`"))?;
            Ok(Box::new(file::FileCamera::new(path)?))
        }
    }
}
