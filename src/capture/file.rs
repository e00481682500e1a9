//! Still-image camera backed by files on disk
//!
//! Stands in for a camera on machines without one: each capture returns the
//! bytes of the configured image, or the next image of a directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::photo::CapturedPhoto;
use super::{CaptureSettings, PhotoOutput};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

pub struct FileCamera {
    name: String,
    images: Vec<PathBuf>,
    next: AtomicUsize,
    running: AtomicBool,
}

impl FileCamera {
    pub fn new(path: PathBuf) -> Result<Self> {
        let images = if path.is_dir() {
            list_images(&path)?
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            anyhow::bail!("Still image not found: {}", path.display());
        };

        if images.is_empty() {
            anyhow::bail!("No images found in {}", path.display());
        }

        log::info!(
            "File camera using {} image(s) from {}",
            images.len(),
            path.display()
        );

        Ok(Self {
            name: format!("file:{}", path.display()),
            images,
            next: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        })
    }
}

/// Image files of a directory, sorted by name
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

impl PhotoOutput for FileCamera {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&self, settings: CaptureSettings) -> Result<CapturedPhoto> {
        if !self.running.load(Ordering::SeqCst) {
            anyhow::bail!("File camera is not running");
        }
        if settings.flash.is_on() {
            log::debug!("File camera has no flash, ignoring flash setting");
        }

        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.images.len();
        let path = &self.images[index];
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read still image: {}", path.display()))?;
        log::info!("Captured {} ({} bytes)", path.display(), bytes.len());
        Ok(CapturedPhoto::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FlashMode;

    #[test]
    fn test_single_file_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banana.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let camera = FileCamera::new(path).unwrap();
        camera.start().unwrap();
        let photo = camera.capture(CaptureSettings::new(FlashMode::On)).unwrap();
        assert_eq!(photo.bytes, b"not really a png");
    }

    #[test]
    fn test_directory_cycles_sorted_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        std::fs::write(dir.path().join("a.PNG"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let camera = FileCamera::new(dir.path().to_path_buf()).unwrap();
        camera.start().unwrap();
        let settings = CaptureSettings::new(FlashMode::Off);
        let captured: Vec<Vec<u8>> = (0..3)
            .map(|_| camera.capture(settings).unwrap().bytes)
            .collect();
        assert_eq!(captured, vec![b"a".to_vec(), b"b".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn test_capture_requires_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"a").unwrap();

        let camera = FileCamera::new(path).unwrap();
        assert!(camera.capture(CaptureSettings::new(FlashMode::Off)).is_err());
        camera.start().unwrap();
        camera.stop().unwrap();
        assert!(camera.capture(CaptureSettings::new(FlashMode::Off)).is_err());
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileCamera::new(dir.path().to_path_buf()).is_err());
        assert!(FileCamera::new(dir.path().join("missing.jpg")).is_err());
    }
}
