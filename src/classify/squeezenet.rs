//! SqueezeNet 1.1 image classifier via ONNX Runtime.
//!
//! Uses the ONNX model zoo SqueezeNet 1.1 (opset 7) with the ImageNet synset
//! labels. Both files are downloaded into the cache dir on first use unless
//! `classifier.model_path` / `classifier.labels_path` point at local copies.

use anyhow::{Context, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use ort::{session::Session, value::Tensor};
use std::sync::Mutex;

use super::{Classification, Classifier, labels, model};
use crate::config::{ClassifierConfig, VisionDemoConfig};

/// Square input edge expected by the model
pub const INPUT_SIZE: u32 = 224;
/// ImageNet channel statistics
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct SqueezeNet {
    /// A session run needs exclusive access
    session: Mutex<Session>,
    labels: Vec<String>,
    max_results: usize,
}

impl SqueezeNet {
    /// Load the model and labels, downloading them if needed
    pub fn load(cfg: &ClassifierConfig) -> Result<Self> {
        let cache_dir = VisionDemoConfig::model_cache_dir();
        let model_path = model::resolve(cfg.model_path.as_deref(), &cfg.model_url, &cache_dir)?;
        let labels_path =
            model::resolve(cfg.labels_path.as_deref(), &cfg.labels_url, &cache_dir)?;

        let labels = labels::load_labels(&labels_path)?;
        let session = Session::builder()?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model: {}", model_path.display()))?;

        log::info!(
            "Loaded SqueezeNet from {} with {} labels",
            model_path.display(),
            labels.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            max_results: cfg.max_results.max(1),
        })
    }
}

/// Scale-to-fill, center crop and normalize into an NCHW float buffer
pub fn preprocess(img: &DynamicImage) -> Vec<f32> {
    let resized = img
        .resize_to_fill(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = (y * INPUT_SIZE + x) as usize;
        for c in 0..3 {
            data[c * plane + idx] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    data
}

impl Classifier for SqueezeNet {
    fn name(&self) -> &str {
        "squeezenet"
    }

    fn classify(&self, encoded: &[u8]) -> Result<Vec<Classification>> {
        let start = std::time::Instant::now();
        let img = image::load_from_memory(encoded)
            .context("Failed to decode photo for classification")?;

        let side = INPUT_SIZE as usize;
        let input = Tensor::from_array(([1usize, 3, side, side], preprocess(&img).into_boxed_slice()))?;

        let probabilities = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("SqueezeNet session lock poisoned"))?;
            let outputs = session.run(ort::inputs![input])?;
            let (_, logits) = outputs[0].try_extract_tensor::<f32>()?;
            labels::softmax(logits)
        };

        let ranked = labels::rank(&probabilities, &self.labels, self.max_results);
        if let Some(top) = ranked.first() {
            log::info!(
                "SqueezeNet ({:.0} ms): {} ({:.3})",
                start.elapsed().as_secs_f64() * 1000.0,
                top.label,
                top.confidence
            );
        }
        Ok(ranked)
    }
}
