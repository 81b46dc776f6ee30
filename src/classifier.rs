//! Species classification of uploaded photos.
//!
//! The network itself is a black box behind [`SpeciesModel`]: it takes a
//! normalized 1x3x384x384 tensor and returns one logit per species. Everything
//! around it (decoding, resizing, normalization, softmax, label lookup) lives
//! here so it can be tested without model weights.

use std::sync::Arc;

use image::imageops::FilterType;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::species::{Hazard, Species};

/// Side length of the square input the network expects.
pub const IMAGE_SIZE: u32 = 384;

/// ImageNet channel means the network was trained with.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations.
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A normalized image in channel-major (CHW) order.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl ImageTensor {
    /// Shape including the batch dimension.
    pub fn shape(&self) -> [usize; 4] {
        [1, 3, self.height, self.width]
    }
}

/// Decode an upload and turn it into the network's input tensor.
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, image::ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let resized = image::imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);

    let (width, height) = (IMAGE_SIZE as usize, IMAGE_SIZE as usize);
    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for channel in 0..3 {
            let value = f32::from(pixel.0[channel]) / 255.0;
            data[channel * plane + offset] = (value - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel];
        }
    }

    Ok(ImageTensor {
        data,
        width,
        height,
    })
}

/// A pretrained network that scores an image against every known species.
pub trait SpeciesModel: Send + Sync {
    /// Run one forward pass and return raw logits, one per class.
    fn logits(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>>;
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest element.
fn arg_max(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// The top class for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub species: Species,

    /// Softmax probability of `species`, in [0, 1].
    pub confidence: f32,
}

/// Body for a successful POST /predict.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub species: &'static str,

    /// Confidence as a percentage.
    pub confidence: f64,
    pub common_name: &'static str,
    pub nepali_name: &'static str,
    pub danger: Hazard,
    pub habitat: &'static str,
}

impl From<Prediction> for PredictionResponse {
    fn from(prediction: Prediction) -> Self {
        let info = prediction.species.info();
        Self {
            species: prediction.species.identifier(),
            confidence: f64::from(prediction.confidence) * 100.0,
            common_name: info.common_name,
            nepali_name: info.nepali_name,
            danger: info.danger,
            habitat: info.habitat,
        }
    }
}

/// Shared handle to the loaded model.
#[derive(Clone)]
pub struct SpeciesClassifier {
    model: Arc<dyn SpeciesModel>,
}

impl SpeciesClassifier {
    pub fn new(model: Arc<dyn SpeciesModel>) -> Self {
        Self { model }
    }

    /// Classify raw image bytes on the current thread.
    pub fn classify(&self, bytes: &[u8]) -> Result<Prediction, AppError> {
        let input = preprocess(bytes)?;

        let logits = self
            .model
            .logits(&input)
            .map_err(|e| AppError::Inference(format!("{e:#}")))?;

        if logits.len() != Species::COUNT {
            return Err(AppError::Inference(format!(
                "model returned {} classes, expected {}",
                logits.len(),
                Species::COUNT
            )));
        }

        let probabilities = softmax(&logits);
        let (index, confidence) = arg_max(&probabilities)
            .filter(|(_, p)| p.is_finite())
            .ok_or_else(|| AppError::Inference("model returned non-finite scores".to_string()))?;
        let species = Species::from_index(index)
            .ok_or_else(|| AppError::Inference(format!("class index {index} out of range")))?;

        Ok(Prediction {
            species,
            confidence,
        })
    }

    /// Classify an upload on the blocking thread pool.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub async fn classify_upload(&self, bytes: Vec<u8>) -> Result<Prediction, AppError> {
        let classifier = self.clone();
        let prediction = tokio::task::spawn_blocking(move || classifier.classify(&bytes))
            .await
            .map_err(|e| {
                warn!(error = %e, "Inference task did not complete");
                AppError::Inference(e.to_string())
            })??;

        info!(
            species = prediction.species.identifier(),
            confidence = prediction.confidence,
            "Image classified"
        );
        Ok(prediction)
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use tract_onnx::prelude::*;

    use super::{IMAGE_SIZE, ImageTensor, SpeciesModel};

    /// The classifier network exported to ONNX, optimized once at load time.
    pub struct OnnxModel {
        plan: TypedRunnableModel<TypedModel>,
    }

    impl OnnxModel {
        pub fn load(path: &Path) -> ::anyhow::Result<Self> {
            let size = IMAGE_SIZE as usize;
            let plan = tract_onnx::onnx()
                .model_for_path(path)?
                .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
                .into_optimized()?
                .into_runnable()?;

            Ok(Self { plan })
        }
    }

    impl SpeciesModel for OnnxModel {
        fn logits(&self, input: &ImageTensor) -> ::anyhow::Result<Vec<f32>> {
            let array = tract_ndarray::Array4::from_shape_vec(
                (1, 3, input.height, input.width),
                input.data.clone(),
            )?;
            let tensor: Tensor = array.into();

            let outputs = self.plan.run(tvec!(tensor.into()))?;
            let logits = outputs[0].to_array_view::<f32>()?.iter().copied().collect();
            Ok(logits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    struct FixedLogits(Vec<f32>);

    impl SpeciesModel for FixedLogits {
        fn logits(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
            assert_eq!(input.shape(), [1, 3, 384, 384]);
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl SpeciesModel for Broken {
        fn logits(&self, _input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("weights corrupted")
        }
    }

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn logits_favoring(index: usize) -> Vec<f32> {
        let mut logits = vec![0.0; Species::COUNT];
        logits[index] = 5.0;
        logits
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let tensor = preprocess(&png(10, 20, [255, 0, 128])).unwrap();
        assert_eq!(tensor.shape(), [1, 3, 384, 384]);
        assert_eq!(tensor.data.len(), 3 * 384 * 384);

        let plane = 384 * 384;
        let red = tensor.data[0];
        let green = tensor.data[plane];
        assert!((red - (1.0 - 0.485) / 0.229).abs() < 1e-4);
        assert!((green - (0.0 - 0.456) / 0.224).abs() < 1e-4);
    }

    #[test]
    fn test_preprocess_rejects_garbage() {
        assert!(preprocess(b"definitely not an image").is_err());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 1000.0, -1000.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_eq!(arg_max(&probs).unwrap().0, 3);
    }

    #[test]
    fn test_classify_picks_top_logit() {
        let classifier = SpeciesClassifier::new(Arc::new(FixedLogits(logits_favoring(16))));
        let prediction = classifier.classify(&png(32, 32, [10, 200, 10])).unwrap();

        assert_eq!(prediction.species, Species::NajaNaja);
        assert!(prediction.confidence > 0.5 && prediction.confidence <= 1.0);
    }

    #[test]
    fn test_classify_invalid_image() {
        let classifier = SpeciesClassifier::new(Arc::new(FixedLogits(logits_favoring(0))));
        let err = classifier.classify(b"GIF89a-truncated").unwrap_err();
        assert!(matches!(err, AppError::InvalidImage(_)));
    }

    #[test]
    fn test_classify_model_failure() {
        let classifier = SpeciesClassifier::new(Arc::new(Broken));
        let err = classifier.classify(&png(8, 8, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_classify_wrong_class_count() {
        let classifier = SpeciesClassifier::new(Arc::new(FixedLogits(vec![1.0, 2.0])));
        let err = classifier.classify(&png(8, 8, [0, 0, 0])).unwrap_err();
        assert!(matches!(err, AppError::Inference(_)));
    }

    #[test]
    fn test_response_uses_percentage() {
        let response = PredictionResponse::from(Prediction {
            species: Species::OphiophagusHannah,
            confidence: 0.875,
        });
        assert_eq!(response.species, "Ophiophagus_hannah");
        assert!((response.confidence - 87.5).abs() < 1e-6);
        assert_eq!(response.common_name, "King Cobra");
        assert_eq!(response.danger, Hazard::HighlyVenomous);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["danger"], "Highly venomous");
    }

    #[tokio::test]
    async fn test_classify_upload_off_thread() {
        let classifier = SpeciesClassifier::new(Arc::new(FixedLogits(logits_favoring(9))));
        let prediction = classifier
            .classify_upload(png(16, 16, [120, 80, 40]))
            .await
            .unwrap();
        assert_eq!(prediction.species, Species::DaboiaRusselii);
    }
}
