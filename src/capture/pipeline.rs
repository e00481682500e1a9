//! GStreamer camera pipeline construction and still-photo capture

use anyhow::{Context, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use std::sync::Mutex;

use super::photo::CapturedPhoto;
use super::{CaptureSettings, FlashMode, PhotoOutput};
use crate::config::CameraConfig;

/// GStreamer pipeline feeding JPEG stills from a camera into an app sink
///
/// ```text
/// source ! videoconvert ! videoscale ! caps ! tee ! queue ! jpegenc ! appsink
///                                             tee ! queue ! videoflip ! autovideosink  (preview_window)
/// ```
pub struct CameraPipeline {
    pipeline: gst::Pipeline,
    source: gst::Element,
    appsink: gst_app::AppSink,
    device_name: String,
    flash_control: String,
    capture_timeout: gst::ClockTime,
    /// Serializes flash changes with the frame pull that depends on them
    capture_lock: Mutex<()>,
}

impl CameraPipeline {
    /// Create the pipeline for the configured (or default) video device
    pub fn new(cfg: &CameraConfig) -> Result<Self> {
        gst::init().context("Failed to initialize GStreamer")?;

        let (source, device_name) = create_source(cfg.device.as_deref(), cfg.source.as_deref())?;
        log::info!(
            "Creating camera pipeline: device={}, {}x{}, preview_window={}",
            device_name,
            cfg.width,
            cfg.height,
            cfg.preview_window
        );

        let pipeline = gst::Pipeline::new();

        let videoconvert = make_element("videoconvert")?;
        let videoscale = make_element("videoscale")?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("width", cfg.width as i32)
            .field("height", cfg.height as i32)
            .build();
        let capsfilter = gst::ElementFactory::make("capsfilter")
            .property("caps", &caps)
            .build()
            .context("Failed to create capsfilter element")?;

        let tee = make_element("tee")?;

        // Keep only the newest frame queued for the photo branch
        let photo_queue = gst::ElementFactory::make("queue")
            .property_from_str("leaky", "downstream")
            .property("max-size-buffers", 1u32)
            .build()
            .context("Failed to create queue element")?;

        let jpegenc = make_element("jpegenc")?;

        let appsink = gst_app::AppSink::builder()
            .name("photo-sink")
            .max_buffers(1)
            .drop(true)
            .sync(false)
            .build();

        // Add elements to pipeline
        pipeline.add_many([
            &source,
            &videoconvert,
            &videoscale,
            &capsfilter,
            &tee,
            &photo_queue,
            &jpegenc,
            appsink.upcast_ref(),
        ])?;

        // Link elements
        gst::Element::link_many([&source, &videoconvert, &videoscale, &capsfilter, &tee])?;
        gst::Element::link_many([&tee, &photo_queue, &jpegenc, appsink.upcast_ref()])?;

        if cfg.preview_window {
            let preview_queue = make_element("queue")?;
            // Portrait orientation
            let videoflip = gst::ElementFactory::make("videoflip")
                .property_from_str("method", "clockwise")
                .build()
                .context("Failed to create videoflip element")?;
            let preview_convert = make_element("videoconvert")?;
            let preview_sink = make_element("autovideosink")?;

            pipeline.add_many([&preview_queue, &videoflip, &preview_convert, &preview_sink])?;
            gst::Element::link_many([
                &tee,
                &preview_queue,
                &videoflip,
                &preview_convert,
                &preview_sink,
            ])?;
        }

        Ok(Self {
            pipeline,
            source,
            appsink,
            device_name,
            flash_control: cfg.flash_control.clone(),
            capture_timeout: gst::ClockTime::from_mseconds(cfg.capture_timeout_ms),
            capture_lock: Mutex::new(()),
        })
    }

    /// Switch the flash LED through the source's V4L2 controls
    fn apply_flash(&self, flash: FlashMode) {
        if self.source.find_property("extra-controls").is_none() {
            if flash.is_on() {
                log::warn!(
                    "Camera source {} exposes no controls, flash ignored",
                    self.device_name
                );
            }
            return;
        }

        let value: i32 = if flash.is_on() { 1 } else { 0 };
        let controls = gst::Structure::builder("controls")
            .field(self.flash_control.as_str(), value)
            .build();
        log::debug!("Setting camera controls: {}", controls);
        self.source.set_property("extra-controls", controls);
    }

    /// First error message waiting on the pipeline bus
    fn pipeline_error(&self) -> Option<anyhow::Error> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(anyhow::anyhow!(
                "Pipeline error: {} ({})",
                err.error(),
                err.debug().unwrap_or_default()
            )),
            _ => None,
        }
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            log::error!("Failed to tear down camera pipeline: {}", e);
        }
    }
}

impl PhotoOutput for CameraPipeline {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn start(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .context("Failed to start camera pipeline")?;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Null)
            .context("Failed to stop camera pipeline")?;
        Ok(())
    }

    fn capture(&self, settings: CaptureSettings) -> Result<CapturedPhoto> {
        let _guard = self
            .capture_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Camera capture lock poisoned"))?;

        self.apply_flash(settings.flash);

        // Drop the frame queued before the settings took effect
        let _ = self.appsink.try_pull_sample(gst::ClockTime::ZERO);

        let sample = match self.appsink.try_pull_sample(self.capture_timeout) {
            Some(sample) => sample,
            None => {
                return Err(self.pipeline_error().unwrap_or_else(|| {
                    anyhow::anyhow!("Timed out waiting for a frame from {}", self.device_name)
                }));
            }
        };

        let buffer = sample.buffer().context("Camera sample has no buffer")?;
        let map = buffer
            .map_readable()
            .context("Failed to map camera buffer for reading")?;
        log::info!(
            "Captured {} byte JPEG from {}",
            map.len(),
            self.device_name
        );
        Ok(CapturedPhoto::new(map.as_slice().to_vec()))
    }
}

fn make_element(name: &str) -> Result<gst::Element> {
    gst::ElementFactory::make(name)
        .build()
        .with_context(|| format!("Failed to create {} element", name))
}

/// Create the camera source element and a human-readable device name
///
/// A device path wins over a source factory name; with neither, the device
/// monitor picks the first camera.
fn create_source(device: Option<&str>, factory: Option<&str>) -> Result<(gst::Element, String)> {
    if let Some(path) = device {
        let source = gst::ElementFactory::make("v4l2src")
            .name("camera-source")
            .property("device", path)
            .build()
            .with_context(|| format!("Failed to create v4l2src for {}", path))?;
        return Ok((source, path.to_string()));
    }

    if let Some(factory) = factory {
        let source = gst::ElementFactory::make(factory)
            .name("camera-source")
            .build()
            .with_context(|| format!("Failed to create {} source", factory))?;
        return Ok((source, factory.to_string()));
    }

    let devices = list_devices()?;
    log::info!(
        "Available video sources: {:?}",
        devices.iter().map(|d| d.display_name().to_string()).collect::<Vec<_>>()
    );

    let device = devices
        .into_iter()
        .next()
        .context("No video capture device found")?;
    let name = device.display_name().to_string();
    let source = device
        .create_element(Some("camera-source"))
        .with_context(|| format!("Failed to create source element for {}", name))?;
    Ok((source, name))
}

/// Enumerate video capture devices
pub fn list_devices() -> Result<Vec<gst::Device>> {
    gst::init().context("Failed to initialize GStreamer")?;

    let monitor = gst::DeviceMonitor::new();
    let _filter = monitor.add_filter(Some("Video/Source"), None);
    monitor
        .start()
        .context("Failed to start GStreamer device monitor")?;
    let devices: Vec<gst::Device> = monitor.devices().into_iter().collect();
    monitor.stop();
    Ok(devices)
}
