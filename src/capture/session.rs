//! Capture session: camera input, photo output and preview surface

use anyhow::{Context, Result};
use std::sync::Arc;

use super::PhotoOutput;
use crate::config::VisionDemoConfig;

/// Orientation the preview is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Preview surface attached to a session, sized to the hosting view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewLayer {
    /// Hosting view bounds
    pub bounds: (u32, u32),
    pub orientation: VideoOrientation,
}

impl PreviewLayer {
    pub fn new(bounds: (u32, u32), orientation: VideoOrientation) -> Self {
        Self {
            bounds,
            orientation,
        }
    }

    /// Size of a source frame fitted inside the bounds, keeping its aspect ratio
    pub fn fitted_size(&self, source: (u32, u32)) -> (u32, u32) {
        let (sw, sh) = match self.orientation {
            // Landscape sensor frames are shown rotated
            VideoOrientation::Portrait if source.0 > source.1 => (source.1, source.0),
            _ => source,
        };
        if sw == 0 || sh == 0 {
            return (0, 0);
        }
        let (bw, bh) = (self.bounds.0 as u64, self.bounds.1 as u64);
        let (sw, sh) = (sw as u64, sh as u64);
        // Width-limited when bw/sw <= bh/sh
        if bw * sh <= bh * sw {
            (bw as u32, (sh * bw / sw) as u32)
        } else {
            ((sw * bh / sh) as u32, bh as u32)
        }
    }
}

/// A camera pipeline: input device, still-photo output and preview
pub struct CaptureSession {
    output: Arc<dyn PhotoOutput>,
    preset: (u32, u32),
    preview: PreviewLayer,
    running: bool,
}

impl CaptureSession {
    /// Configure a session from the config
    ///
    /// Failures are logged and yield `None`: no preview, capture inert.
    pub fn initialize(cfg: &VisionDemoConfig) -> Option<Self> {
        match super::create_output(&cfg.camera) {
            Ok(output) => Some(Self::new(
                Arc::from(output),
                (cfg.camera.width, cfg.camera.height),
                PreviewLayer::new(
                    (cfg.view_width, cfg.view_height),
                    VideoOrientation::Portrait,
                ),
            )),
            Err(e) => {
                log::error!("Failed to configure capture session: {:?}", e);
                None
            }
        }
    }

    pub fn new(output: Arc<dyn PhotoOutput>, preset: (u32, u32), preview: PreviewLayer) -> Self {
        log::info!(
            "Capture session: device={}, preset={}x{}, preview={}x{} {:?}",
            output.device_name(),
            preset.0,
            preset.1,
            preview.bounds.0,
            preview.bounds.1,
            preview.orientation
        );
        Self {
            output,
            preset,
            preview,
            running: false,
        }
    }

    /// Begin delivering frames
    pub fn start_running(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.output
            .start()
            .with_context(|| format!("Failed to start {}", self.output.device_name()))?;
        self.running = true;
        Ok(())
    }

    pub fn stop_running(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.output.stop()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Shared handle to the photo output for capture workers
    pub fn output(&self) -> Arc<dyn PhotoOutput> {
        Arc::clone(&self.output)
    }

    pub fn preset(&self) -> (u32, u32) {
        self.preset
    }

    pub fn preview(&self) -> &PreviewLayer {
        &self.preview
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop_running() {
            log::error!("Failed to stop capture session: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::photo::CapturedPhoto;
    use crate::capture::CaptureSettings;
    use crate::config::CameraBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingOutput {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl PhotoOutput for CountingOutput {
        fn device_name(&self) -> &str {
            "counting"
        }
        fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn capture(&self, _settings: CaptureSettings) -> Result<CapturedPhoto> {
            Ok(CapturedPhoto::new(Vec::new()))
        }
    }

    #[test]
    fn test_portrait_preview_fits_rotated_frame() {
        let preview = PreviewLayer::new((375, 667), VideoOrientation::Portrait);
        assert_eq!(preview.fitted_size((1920, 1080)), (375, 666));
    }

    #[test]
    fn test_landscape_preview_keeps_frame() {
        let preview = PreviewLayer::new((960, 960), VideoOrientation::Landscape);
        assert_eq!(preview.fitted_size((1920, 1080)), (960, 540));
        assert_eq!(preview.fitted_size((0, 1080)), (0, 0));
    }

    #[test]
    fn test_start_stop_and_drop() {
        let output = Arc::new(CountingOutput::default());
        {
            let mut session = CaptureSession::new(
                output.clone(),
                (1920, 1080),
                PreviewLayer::new((375, 667), VideoOrientation::Portrait),
            );
            session.start_running().unwrap();
            session.start_running().unwrap();
            assert!(session.is_running());
        }
        assert_eq!(output.starts.load(Ordering::SeqCst), 1);
        assert_eq!(output.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initialize_failure_is_inert() {
        let mut cfg = VisionDemoConfig::default();
        cfg.camera.backend = CameraBackend::File;
        cfg.camera.still_image = Some("/nonexistent/visiondemo.jpg".into());
        assert!(CaptureSession::initialize(&cfg).is_none());
    }
}
