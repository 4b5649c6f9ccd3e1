//! ONNX model loading and inference

use std::path::Path;

use half::f16;
use ndarray::{Array2, ArrayView4};
use ort::session::Session;
use ort::value::Tensor;

use super::PredictiveModel;
use crate::error::KeyEstimationError;

/// Key classifier backed by an ONNX Runtime session
///
/// The graph must take one `float16` input of shape `(N, 168, 60, 1)` and
/// produce `(N, 24)` `float32` probabilities as its first output.
pub struct OnnxKeyModel {
    session: Session,
    input_name: String,
}

impl OnnxKeyModel {
    /// Load an ONNX model from file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.onnx` file
    /// * `input_name` - Name of the graph input that receives the frames
    pub fn load(path: impl AsRef<Path>, input_name: &str) -> Result<Self, KeyEstimationError> {
        let path = path.as_ref();
        log::debug!("Loading ONNX key model from: {}", path.display());

        if !path.exists() {
            return Err(KeyEstimationError::ModelError(format!(
                "Model not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| KeyEstimationError::ModelError(format!("Failed to load model: {}", e)))?;

        Ok(Self {
            session,
            input_name: input_name.to_string(),
        })
    }

    /// Name of the graph input the frames are bound to
    pub fn input_name(&self) -> &str {
        &self.input_name
    }
}

impl PredictiveModel for OnnxKeyModel {
    fn predict(
        &mut self,
        frames: ArrayView4<'_, f16>,
        batch_size: usize,
    ) -> Result<Array2<f32>, KeyEstimationError> {
        log::debug!("Running ONNX inference on {} frames", batch_size);

        let input = frames.as_standard_layout().into_owned();
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| KeyEstimationError::ModelError(format!("Tensor creation error: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| KeyEstimationError::ModelError(format!("Inference error: {}", e)))?;

        let (_, probs_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| KeyEstimationError::ModelError("Model produced no output".to_string()))?;

        let (shape, data) = probs_value
            .try_extract_tensor::<f32>()
            .map_err(|e| KeyEstimationError::ModelError(format!("Output extraction error: {}", e)))?;

        if shape.len() != 2 {
            return Err(KeyEstimationError::ModelError(format!(
                "Expected a 2-dimensional output, got shape {:?}",
                &shape[..]
            )));
        }
        let rows = shape[0].max(0) as usize;
        let cols = shape[1].max(0) as usize;

        Array2::from_shape_vec((rows, cols), data.to_vec())
            .map_err(|e| KeyEstimationError::ModelError(format!("Output shape error: {}", e)))
    }
}
