//! Model file resolution: configured path, cached copy, or download

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Return `configured` if set, otherwise the cached copy of `url` in `cache_dir`,
/// downloading it first if needed
pub fn resolve(configured: Option<&Path>, url: &str, cache_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = configured {
        if !path.exists() {
            anyhow::bail!("Configured model file not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }

    let path = cache_dir.join(file_name_from_url(url)?);
    if !path.exists() {
        download(url, &path)?;
    }
    Ok(path)
}

/// Last path segment of a URL
fn file_name_from_url(url: &str) -> Result<String> {
    url.split(['?', '#'])
        .next()
        .and_then(|base| base.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a file name from {}", url))
}

/// Download with curl into a temp file, then move into place
fn download(url: &str, path: &Path) -> Result<()> {
    log::info!("Downloading model from {} to {:?}", url, path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create model directory: {}", parent.display()))?;
    }

    let partial = path.with_extension("part");
    let output = std::process::Command::new("curl")
        .args(["-fL", "-o"])
        .arg(&partial)
        .arg(url)
        .output()
        .context("Failed to run curl")?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&partial);
        anyhow::bail!("curl failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    std::fs::rename(&partial, path)
        .with_context(|| format!("Failed to move download into {}", path.display()))?;
    log::info!("Downloaded model to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/models/squeezenet1.1-7.onnx").unwrap(),
            "squeezenet1.1-7.onnx"
        );
        assert_eq!(
            file_name_from_url("https://example.com/synset.txt?raw=true").unwrap(),
            "synset.txt"
        );
        assert!(file_name_from_url("https://example.com/").is_err());
    }

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"onnx").unwrap();

        let resolved = resolve(Some(&model), "https://example.com/other.onnx", dir.path()).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_missing_configured_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.onnx");
        assert!(resolve(Some(&missing), "https://example.com/m.onnx", dir.path()).is_err());
    }

    #[test]
    fn test_cached_file_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("synset.txt"), b"n07753592 banana").unwrap();

        let resolved = resolve(None, "https://invalid.invalid/synset.txt", dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join("synset.txt"));
    }
}
