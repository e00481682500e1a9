//! Capture-and-classify controller
//!
//! Owns the capture session and all UI state. Runs as a single task that
//! handles one `Msg` at a time; capture, inference and speech run on blocking
//! workers that each post exactly one completion message back.
//!
//! Cycle: `Idle → Capturing → Classifying → Speaking → Idle`. Taps are
//! ignored (and the capture surface disabled) outside `Idle`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::capture::photo::{CapturedFrame, CapturedPhoto};
use crate::capture::session::CaptureSession;
use crate::capture::{CaptureSettings, FlashMode};
use crate::classify::Classifier;
use crate::classify::Classification;
use crate::classify::announcement::Announcement;
use crate::config::VisionDemoConfig;
use crate::speech::Speaker;
use crate::surface::{FlashButton, Surface};

/// Messages handled by the controller task
#[derive(Debug, Clone)]
pub enum Msg {
    /// Single tap on the capture surface
    Tap,
    /// Flash button pressed
    ToggleFlash,
    /// Capture request finished, photo decoded for display
    PhotoCaptured {
        cycle: u64,
        result: Result<CapturedFrame, String>,
    },
    /// Inference request finished
    Classified {
        cycle: u64,
        result: Result<Vec<Classification>, String>,
    },
    /// Utterance finished playing
    SpeechFinished { cycle: u64, result: Result<(), String> },
    /// Watchdog fired for a cycle
    CycleTimedOut { cycle: u64 },
    /// Stop the controller loop
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    Capturing,
    Classifying,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerOptions {
    pub confidence_threshold: f32,
    /// Reset a cycle that has not completed after this long
    pub cycle_timeout: Option<Duration>,
    /// Width the capture worker scales the displayed photo down to
    pub display_width: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            cycle_timeout: None,
            display_width: 256,
        }
    }
}

impl From<&VisionDemoConfig> for ControllerOptions {
    fn from(cfg: &VisionDemoConfig) -> Self {
        Self {
            confidence_threshold: cfg.classifier.confidence_threshold,
            cycle_timeout: cfg.cycle_timeout_secs.map(Duration::from_secs),
            ..Self::default()
        }
    }
}

pub struct CameraController<S: Surface> {
    surface: S,
    session: Option<CaptureSession>,
    classifier: Option<Arc<dyn Classifier>>,
    speaker: Arc<dyn Speaker>,
    tx: UnboundedSender<Msg>,
    options: ControllerOptions,
    state: CycleState,
    /// Id of the latest cycle; completions for older cycles are dropped
    cycle: u64,
    flash: FlashMode,
    photo: Option<CapturedPhoto>,
}

impl<S: Surface> CameraController<S> {
    pub fn new(
        surface: S,
        session: Option<CaptureSession>,
        classifier: Option<Arc<dyn Classifier>>,
        speaker: Arc<dyn Speaker>,
        tx: UnboundedSender<Msg>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            surface,
            session,
            classifier,
            speaker,
            tx,
            options,
            state: CycleState::Idle,
            cycle: 0,
            flash: FlashMode::Off,
            photo: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn flash(&self) -> FlashMode {
        self.flash
    }

    /// Photo of the latest successful capture
    pub fn photo(&self) -> Option<&CapturedPhoto> {
        self.photo.as_ref()
    }

    /// Start the session and enable taps on the capture surface
    pub fn start(&mut self) {
        self.surface.set_flash_button(FlashButton::for_mode(self.flash));
        self.surface.set_busy(false);

        let started = match self.session.as_mut() {
            Some(session) => session.start_running(),
            None => {
                log::warn!("No capture session, capture is inert");
                self.surface.set_preview_interaction(false);
                return;
            }
        };

        match started {
            Ok(()) => {
                if let Some(session) = &self.session {
                    self.surface.show_preview(session.preview(), session.preset());
                }
                self.surface.set_preview_interaction(true);
            }
            Err(e) => {
                log::error!("Failed to start capture session: {:?}", e);
                self.session = None;
                self.surface.set_preview_interaction(false);
            }
        }
    }

    /// Process messages until `Quit` or the channel closes
    pub async fn run(mut self, mut rx: UnboundedReceiver<Msg>) {
        while let Some(msg) = rx.recv().await {
            if matches!(msg, Msg::Quit) {
                log::info!("Controller stopping");
                break;
            }
            self.update(msg);
        }
    }

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Tap => self.capture_photo(),
            Msg::ToggleFlash => self.toggle_flash(),
            Msg::PhotoCaptured { cycle, result } => {
                if self.accepts(cycle, CycleState::Capturing, "capture") {
                    self.handle_capture(result);
                }
            }
            Msg::Classified { cycle, result } => {
                if self.accepts(cycle, CycleState::Classifying, "classification") {
                    self.handle_classification(result);
                }
            }
            Msg::SpeechFinished { cycle, result } => {
                if self.accepts(cycle, CycleState::Speaking, "speech") {
                    self.handle_speech(result);
                }
            }
            Msg::CycleTimedOut { cycle } => self.handle_timeout(cycle),
            Msg::Quit => {}
        }
    }

    /// Whether a completion belongs to the cycle step in flight
    fn accepts(&self, cycle: u64, expected: CycleState, what: &str) -> bool {
        if cycle == self.cycle && self.state == expected {
            true
        } else {
            log::debug!(
                "Dropping stale {} completion for cycle {} (current cycle {}, {:?})",
                what,
                cycle,
                self.cycle,
                self.state
            );
            false
        }
    }

    fn toggle_flash(&mut self) {
        self.flash = self.flash.toggled();
        log::info!("Flash {:?}", self.flash);
        self.surface.set_flash_button(FlashButton::for_mode(self.flash));
    }

    fn capture_photo(&mut self) {
        if self.state != CycleState::Idle {
            log::debug!("Cycle {} in flight, tap ignored", self.cycle);
            return;
        }
        let Some(output) = self
            .session
            .as_ref()
            .filter(|session| session.is_running())
            .map(|session| session.output())
        else {
            log::debug!("Capture session inactive, tap ignored");
            return;
        };

        self.cycle += 1;
        let cycle = self.cycle;
        self.state = CycleState::Capturing;
        self.surface.set_preview_interaction(false);
        self.surface.set_busy(true);

        let settings = CaptureSettings::new(self.flash);
        let display_width = self.options.display_width;
        log::info!("Cycle {}: capturing with flash {:?}", cycle, settings.flash);
        self.submit(
            move || {
                let photo = output.capture(settings)?;
                Ok(CapturedFrame::prepare(photo, display_width))
            },
            move |result| Msg::PhotoCaptured { cycle, result },
        );
        self.arm_watchdog(cycle);
    }

    fn handle_capture(&mut self, result: Result<CapturedFrame, String>) {
        let CapturedFrame { photo, display } = match result {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Cycle {}: capture failed: {}", self.cycle, e);
                self.fail_cycle();
                return;
            }
        };

        if let Some(image) = &display {
            self.surface.show_photo(&photo, image);
        }

        let bytes = photo.bytes.clone();
        self.photo = Some(photo);
        self.state = CycleState::Classifying;
        self.classify(bytes);
    }

    fn classify(&mut self, bytes: Vec<u8>) {
        let Some(classifier) = self.classifier.clone() else {
            log::error!("Cycle {}: no classifier available", self.cycle);
            self.fail_cycle();
            return;
        };

        let cycle = self.cycle;
        log::info!("Cycle {}: classifying with {}", cycle, classifier.name());
        self.submit(
            move || classifier.classify(&bytes),
            move |result| Msg::Classified { cycle, result },
        );
    }

    fn handle_classification(&mut self, result: Result<Vec<Classification>, String>) {
        let results = match result {
            Ok(results) => results,
            Err(e) => {
                log::error!("Cycle {}: classification failed: {}", self.cycle, e);
                self.fail_cycle();
                return;
            }
        };

        let announcement = Announcement::from_results(&results, self.options.confidence_threshold);
        self.surface.set_item_text(&announcement.item_text);
        self.surface.set_confidence_text(&announcement.confidence_text);

        self.state = CycleState::Speaking;
        let cycle = self.cycle;
        let speaker = Arc::clone(&self.speaker);
        let text = announcement.spoken_text;
        self.submit(
            move || speaker.speak(&text),
            move |result| Msg::SpeechFinished { cycle, result },
        );
    }

    fn handle_speech(&mut self, result: Result<(), String>) {
        if let Err(e) = result {
            log::warn!("Cycle {}: speech failed: {}", self.cycle, e);
        }
        self.end_cycle();
    }

    /// Reset a stalled cycle
    ///
    /// A speech worker always reports back, so a cycle that is already
    /// speaking is left to finish: taps stay disabled and the shown result
    /// stays until the utterance ends.
    fn handle_timeout(&mut self, cycle: u64) {
        if cycle != self.cycle {
            return;
        }
        match self.state {
            CycleState::Idle => {}
            CycleState::Speaking => {
                log::warn!("Cycle {} still speaking past its timeout", cycle);
            }
            CycleState::Capturing | CycleState::Classifying => {
                log::warn!("Cycle {} timed out while {:?}, resetting", cycle, self.state);
                self.fail_cycle();
            }
        }
    }

    /// Show the unsure message and close the cycle
    fn fail_cycle(&mut self) {
        let unsure = Announcement::unsure();
        self.surface.set_item_text(&unsure.item_text);
        self.surface.set_confidence_text(&unsure.confidence_text);
        self.end_cycle();
    }

    fn end_cycle(&mut self) {
        log::info!("Cycle {} done", self.cycle);
        self.state = CycleState::Idle;
        self.surface.set_busy(false);
        self.surface.set_preview_interaction(true);
    }

    /// Run `work` on a blocking worker and post exactly one completion message
    fn submit<T, F, M>(&self, work: F, into_msg: M)
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        M: FnOnce(Result<T, String>) -> Msg + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(work).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(e) => Err(format!("worker failed: {}", e)),
            };
            if tx.send(into_msg(result)).is_err() {
                log::debug!("Controller gone, completion dropped");
            }
        });
    }

    fn arm_watchdog(&self, cycle: u64) {
        let Some(timeout) = self.options.cycle_timeout else {
            return;
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Msg::CycleTimedOut { cycle });
        });
    }
}
