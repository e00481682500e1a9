//! UI surface the controller drives, and its terminal rendition

use image::RgbaImage;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use crate::capture::FlashMode;
use crate::capture::photo::CapturedPhoto;
use crate::capture::session::PreviewLayer;
use crate::view::RoundedShadow;

/// Corner radius of the captured photo thumbnail
const PHOTO_CORNER_RADIUS: f32 = 15.0;
/// Label box height in the rendered terminal layout (rows)
const LABEL_BOX_HEIGHT: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonColor {
    White,
    Black,
}

/// Title and background of the flash toggle button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashButton {
    pub title: &'static str,
    pub background: ButtonColor,
}

impl FlashButton {
    pub fn for_mode(flash: FlashMode) -> Self {
        match flash {
            FlashMode::On => Self {
                title: "FLASH ON",
                background: ButtonColor::White,
            },
            FlashMode::Off => Self {
                title: "FLASH OFF",
                background: ButtonColor::Black,
            },
        }
    }
}

/// Mutable UI elements owned by the UI task
pub trait Surface {
    fn set_item_text(&mut self, text: &str);

    fn set_confidence_text(&mut self, text: &str);

    fn set_flash_button(&mut self, button: FlashButton);

    /// Show and animate the busy indicator, or stop and hide it
    fn set_busy(&mut self, busy: bool);

    /// Enable or disable taps on the capture surface
    fn set_preview_interaction(&mut self, enabled: bool);

    /// Attach the camera preview
    fn show_preview(&mut self, preview: &PreviewLayer, preset: (u32, u32));

    /// Display a freshly captured photo
    fn show_photo(&mut self, photo: &CapturedPhoto, image: &RgbaImage);
}

/// Terminal surface: prints UI changes and writes decorated thumbnails to disk
pub struct ConsoleSurface<W: Write> {
    out: W,
    output_dir: Option<PathBuf>,
    thumbnail_width: u32,
    label_style: RoundedShadow,
    /// Emit ANSI escapes (only when writing to a terminal)
    ansi: bool,
    busy: bool,
    interaction: bool,
    /// Path of the last thumbnail written
    pub last_thumbnail: Option<PathBuf>,
}

impl ConsoleSurface<std::io::Stdout> {
    pub fn stdout(output_dir: Option<PathBuf>, thumbnail_width: u32) -> Self {
        let ansi = std::io::stdout().is_terminal();
        Self::new(std::io::stdout(), output_dir, thumbnail_width).with_ansi(ansi)
    }
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W, output_dir: Option<PathBuf>, thumbnail_width: u32) -> Self {
        Self {
            out,
            output_dir,
            thumbnail_width: thumbnail_width.max(1),
            label_style: RoundedShadow::for_view(LABEL_BOX_HEIGHT),
            ansi: false,
            busy: false,
            interaction: false,
            last_thumbnail: None,
        }
    }

    pub fn with_ansi(self, ansi: bool) -> Self {
        Self { ansi, ..self }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            log::error!("Failed to write to console: {}", e);
        }
    }

    /// Text inside a box, with rounded corners when the label style is rounded
    fn boxed(&self, text: &str) -> String {
        let (tl, tr, bl, br) = if self.label_style.corner_radius > 0.0 {
            ('╭', '╮', '╰', '╯')
        } else {
            ('┌', '┐', '└', '┘')
        };
        let width = text.chars().count() + 2;
        let bar = "─".repeat(width);
        format!("{tl}{bar}{tr}\n│ {text} │\n{bl}{bar}{br}")
    }

    fn write_thumbnail(&mut self, photo: &CapturedPhoto, image: &RgbaImage) -> anyhow::Result<Option<PathBuf>> {
        let Some(dir) = self.output_dir.clone() else {
            return Ok(None);
        };
        std::fs::create_dir_all(&dir)?;

        let width = self.thumbnail_width.min(image.width().max(1));
        let height = ((image.height() as u64 * width as u64) / image.width().max(1) as u64).max(1) as u32;
        let thumbnail = image::imageops::thumbnail(image, width, height);

        let style = RoundedShadow::for_view(height as f32).with_corner_radius(PHOTO_CORNER_RADIUS);
        let decorated = style
            .render(&thumbnail)
            .ok_or_else(|| anyhow::anyhow!("Failed to render thumbnail"))?;

        let path = dir.join(format!("{}.png", photo.file_stem()));
        decorated.save(&path)?;
        Ok(Some(path))
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    fn set_item_text(&mut self, text: &str) {
        let boxed = self.boxed(text);
        self.print(&boxed);
    }

    fn set_confidence_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.print(text);
        }
    }

    fn set_flash_button(&mut self, button: FlashButton) {
        let line = match button.background {
            // Inverse video for the white button
            ButtonColor::White if self.ansi => format!("\x1b[7m[ {} ]\x1b[0m", button.title),
            ButtonColor::White | ButtonColor::Black => format!("[ {} ]", button.title),
        };
        self.print(&line);
    }

    fn set_busy(&mut self, busy: bool) {
        if busy == self.busy {
            return;
        }
        self.busy = busy;
        if busy {
            self.print("⠿ working...");
        }
    }

    fn set_preview_interaction(&mut self, enabled: bool) {
        if enabled == self.interaction {
            return;
        }
        self.interaction = enabled;
        if enabled {
            self.print("Press Enter to capture, f + Enter to toggle flash, q + Enter to quit");
        }
    }

    fn show_preview(&mut self, preview: &PreviewLayer, preset: (u32, u32)) {
        let (w, h) = preview.fitted_size(preset);
        self.print(&format!(
            "Camera preview {}x{} ({:?}) in {}x{} view",
            w, h, preview.orientation, preview.bounds.0, preview.bounds.1
        ));
    }

    fn show_photo(&mut self, photo: &CapturedPhoto, image: &RgbaImage) {
        match self.write_thumbnail(photo, image) {
            Ok(Some(path)) => {
                self.print(&format!(
                    "Captured {}x{} photo -> {}",
                    image.width(),
                    image.height(),
                    path.display()
                ));
                self.last_thumbnail = Some(path);
            }
            Ok(None) => {
                self.print(&format!("Captured {}x{} photo", image.width(), image.height()));
            }
            Err(e) => log::error!("Failed to write photo thumbnail: {:?}", e),
        }
    }
}
