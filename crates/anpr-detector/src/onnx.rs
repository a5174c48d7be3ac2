//! ONNX Runtime adapters for the local backend.
//!
//! Two small models, both consumed as opaque pre-trained artifacts:
//! - a single-class YOLO-style plate detector (`[1, 5, N]` output: box
//!   center/size plus objectness), and
//! - a CRNN-style plate recognizer decoded with greedy CTC.
//!
//! Training never happens here; client deployments are inference only.

use std::path::Path;
use std::sync::Mutex;

use image::{imageops, RgbImage};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use anpr_models::BBox;

use crate::error::{DetectorError, DetectorResult};
use crate::local::{PlateCandidate, PlateFinder, PlateReader};

/// Configuration for the ONNX plate finder.
#[derive(Debug, Clone)]
pub struct OnnxFinderConfig {
    /// Path to the detection ONNX model
    pub model_path: String,
    /// Raw score threshold applied before NMS
    pub score_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Model input size (square)
    pub input_size: u32,
    /// Name of the output tensor
    pub output_name: String,
}

impl Default for OnnxFinderConfig {
    fn default() -> Self {
        Self {
            model_path: "models/plate_detect.onnx".to_string(),
            score_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
            output_name: "output0".to_string(),
        }
    }
}

/// Single-class plate detector backed by ONNX Runtime.
#[derive(Debug)]
pub struct OnnxPlateFinder {
    session: Mutex<Session>,
    config: OnnxFinderConfig,
}

impl OnnxPlateFinder {
    /// Load the model. Fails loudly if the file is missing or malformed.
    pub fn new(config: OnnxFinderConfig) -> DetectorResult<Self> {
        let session = Mutex::new(create_session(Path::new(&config.model_path))?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Plate finder initialized"
        );
        Ok(Self { session, config })
    }
}

impl PlateFinder for OnnxPlateFinder {
    fn find_plates(&self, image: &RgbImage) -> DetectorResult<Vec<PlateCandidate>> {
        let (orig_width, orig_height) = image.dimensions();
        let input_size = self.config.input_size;

        let resized = imageops::resize(
            image,
            input_size,
            input_size,
            imageops::FilterType::Triangle,
        );
        let input = to_chw_tensor(&resized)?;

        let outputs = run_to_vec(&self.session, input, &self.config.output_name)?;

        // Output layout [1, 5, N]: cx, cy, w, h, score per candidate column.
        let num_features = 5;
        if outputs.len() % num_features != 0 {
            return Err(DetectorError::model(format!(
                "Unexpected output size {} (not divisible by {})",
                outputs.len(),
                num_features
            )));
        }
        let num_boxes = outputs.len() / num_features;

        let scale_w = orig_width as f32 / input_size as f32;
        let scale_h = orig_height as f32 / input_size as f32;

        let mut candidates = Vec::new();
        for i in 0..num_boxes {
            let score = outputs[4 * num_boxes + i];
            if score < self.config.score_threshold {
                continue;
            }

            let cx = outputs[i];
            let cy = outputs[num_boxes + i];
            let w = outputs[2 * num_boxes + i];
            let h = outputs[3 * num_boxes + i];

            let x1 = ((cx - w / 2.0) * scale_w).round() as i32;
            let y1 = ((cy - h / 2.0) * scale_h).round() as i32;
            let x2 = ((cx + w / 2.0) * scale_w).round() as i32;
            let y2 = ((cy + h / 2.0) * scale_h).round() as i32;

            let bbox = BBox::new(x1, y1, x2, y2);
            match bbox.clamp(orig_width, orig_height) {
                Some(clamped) => candidates.push(PlateCandidate {
                    bbox: clamped,
                    confidence: score as f64,
                }),
                None => continue,
            }
        }

        let kept = non_maximum_suppression(candidates, self.config.nms_threshold);
        debug!(count = kept.len(), "Plate detection completed");
        Ok(kept)
    }
}

/// Configuration for the ONNX plate reader.
#[derive(Debug, Clone)]
pub struct OnnxReaderConfig {
    /// Path to the recognition ONNX model
    pub model_path: String,
    /// Model input width
    pub input_width: u32,
    /// Model input height
    pub input_height: u32,
    /// Characters in label order; index 0 of the logits is the CTC blank
    pub charset: String,
    /// Name of the output tensor
    pub output_name: String,
}

impl Default for OnnxReaderConfig {
    fn default() -> Self {
        Self {
            model_path: "models/plate_read.onnx".to_string(),
            input_width: 160,
            input_height: 32,
            charset: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            output_name: "output0".to_string(),
        }
    }
}

/// CRNN-style plate recognizer decoded with greedy CTC.
pub struct OnnxPlateReader {
    session: Mutex<Session>,
    config: OnnxReaderConfig,
}

impl OnnxPlateReader {
    /// Load the model. Fails loudly if the file is missing or malformed.
    pub fn new(config: OnnxReaderConfig) -> DetectorResult<Self> {
        let session = Mutex::new(create_session(Path::new(&config.model_path))?);
        info!(model_path = %config.model_path, "Plate reader initialized");
        Ok(Self { session, config })
    }
}

impl PlateReader for OnnxPlateReader {
    fn read_plate(&self, crop: &RgbImage) -> DetectorResult<Option<String>> {
        let resized = imageops::resize(
            crop,
            self.config.input_width,
            self.config.input_height,
            imageops::FilterType::Triangle,
        );
        let input = to_chw_tensor(&resized)?;

        let logits = run_to_vec(&self.session, input, &self.config.output_name)?;

        let text = ctc_greedy_decode(&logits, &self.config.charset)?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }
}

/// Run one inference and copy the named output tensor out as a flat vector.
fn run_to_vec(
    session: &Mutex<Session>,
    input: Value,
    output_name: &str,
) -> DetectorResult<Vec<f32>> {
    let mut session = session
        .lock()
        .map_err(|_| DetectorError::model("Session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input])
        .map_err(|e| DetectorError::model(format!("ONNX inference failed: {}", e)))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| DetectorError::model(format!("Missing {} tensor", output_name)))?;

    let tensor = output
        .try_extract_tensor::<f32>()
        .map_err(|e| DetectorError::model(format!("Failed to extract tensor: {}", e)))?;

    Ok(tensor.1.to_vec())
}

/// HWC u8 -> NCHW f32 in [0, 1].
fn to_chw_tensor(image: &RgbImage) -> DetectorResult<Value> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);

    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = image.get_pixel(x as u32, y as u32);
                chw_data.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    let shape = vec![1usize, 3, h, w];
    Tensor::from_array((shape, chw_data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| DetectorError::model(format!("Failed to create tensor: {}", e)))
}

/// Greedy CTC decode over `[T, C]` logits with blank at index 0: argmax per
/// step, collapse repeats, drop blanks.
fn ctc_greedy_decode(logits: &[f32], charset: &str) -> DetectorResult<String> {
    let chars: Vec<char> = charset.chars().collect();
    let num_classes = chars.len() + 1;
    if logits.is_empty() || logits.len() % num_classes != 0 {
        return Err(DetectorError::model(format!(
            "Unexpected logits size {} for {} classes",
            logits.len(),
            num_classes
        )));
    }

    let steps = logits.len() / num_classes;
    let mut decoded = String::new();
    let mut previous = 0usize;

    for t in 0..steps {
        let row = &logits[t * num_classes..(t + 1) * num_classes];
        let mut best = 0usize;
        let mut best_score = f32::MIN;
        for (idx, &score) in row.iter().enumerate() {
            if score > best_score {
                best_score = score;
                best = idx;
            }
        }

        if best != 0 && best != previous {
            decoded.push(chars[best - 1]);
        }
        previous = best;
    }

    Ok(decoded)
}

/// Apply NMS over pixel-space candidates, highest confidence first.
fn non_maximum_suppression(
    mut candidates: Vec<PlateCandidate>,
    nms_threshold: f32,
) -> Vec<PlateCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<PlateCandidate> = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(candidates[i].clone());

        for j in (i + 1)..candidates.len() {
            if suppressed[j] {
                continue;
            }
            if compute_iou(&candidates[i].bbox, &candidates[j].bbox) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over Union of two pixel-space boxes.
fn compute_iou(a: &BBox, b: &BBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_w = (x2 - x1).max(0) as f32;
    let inter_h = (y2 - y1).max(0) as f32;
    let intersection = inter_w * inter_h;

    let area_a = (a.width() * a.height()) as f32;
    let area_b = (b.width() * b.height()) as f32;
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> DetectorResult<Session> {
    if !model_path.exists() {
        return Err(DetectorError::model(format!(
            "Model not found: {}",
            model_path.display()
        )));
    }

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| DetectorError::model(format!("Failed to read model file: {}", e)))?;

    let mut builder = Session::builder()
        .map_err(|e| DetectorError::model(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DetectorError::model(format!("Failed to set optimization level: {}", e)))?;

    // Try CUDA on Linux with cuda feature
    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for plate inference");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, falling back to CPU");
    }

    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| DetectorError::model(format!("Failed to load ONNX model: {}", e)))
}
