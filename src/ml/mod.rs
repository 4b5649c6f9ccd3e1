//! Predictive model boundary
//!
//! The key classifier itself is an external capability: a batch of
//! normalized `(N, 168, 60, 1)` frames goes in, an `(N, 24)` matrix of key
//! probabilities comes out. Anything implementing [`PredictiveModel`] can be
//! plugged into the estimator; the optional ONNX Runtime backend lives in
//! [`onnx_model`] (requires the `ml` feature).

use half::f16;
use ndarray::{Array2, ArrayView4};

use crate::error::KeyEstimationError;

#[cfg(feature = "ml")]
pub mod onnx_model;

#[cfg(feature = "ml")]
pub use onnx_model::OnnxKeyModel;

/// A model that scores a batch of frames over the 24 key classes
pub trait PredictiveModel {
    /// Score a batch of normalized frames
    ///
    /// # Arguments
    ///
    /// * `frames` - Normalized tensor of shape `(batch_size, 168, 60, 1)`
    /// * `batch_size` - Number of frames (the length of axis 0)
    ///
    /// # Returns
    ///
    /// Matrix of shape `(batch_size, 24)`, one probability distribution per row
    fn predict(
        &mut self,
        frames: ArrayView4<'_, f16>,
        batch_size: usize,
    ) -> Result<Array2<f32>, KeyEstimationError>;
}

impl<M: PredictiveModel + ?Sized> PredictiveModel for &mut M {
    fn predict(
        &mut self,
        frames: ArrayView4<'_, f16>,
        batch_size: usize,
    ) -> Result<Array2<f32>, KeyEstimationError> {
        (**self).predict(frames, batch_size)
    }
}

impl<M: PredictiveModel + ?Sized> PredictiveModel for Box<M> {
    fn predict(
        &mut self,
        frames: ArrayView4<'_, f16>,
        batch_size: usize,
    ) -> Result<Array2<f32>, KeyEstimationError> {
        (**self).predict(frames, batch_size)
    }
}
