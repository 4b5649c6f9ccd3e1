//! Key distribution estimation
//!
//! Validates a batch of feature frames, normalizes it and asks the
//! predictive model for one 24-class key distribution per frame.

use half::f16;
use ndarray::{Array2, Array4, ArrayBase, ArrayView4, Data, Dimension, Ix4};

use super::ranker::{average_distributions, rank_keys};
use crate::analysis::result::{RankedKeyList, NUM_KEYS};
use crate::config::KeyEstimationConfig;
use crate::error::{KeyEstimationError, ShapeCheck};
use crate::ml::PredictiveModel;
use crate::preprocessing::normalization::std_normalize;

/// Rank of the batch tensor `(N, height, width, channels)`
pub const BATCH_RANK: usize = 4;

/// Feature rows per frame (axis 1)
pub const FRAME_HEIGHT: usize = 168;

/// Feature columns per frame (axis 2)
pub const FRAME_WIDTH: usize = 60;

/// Channels per frame (axis 3)
pub const FRAME_CHANNELS: usize = 1;

/// Check that a shape is `(N, 168, 60, 1)`
///
/// Checks run in order (rank, then axes 1, 2, 3) and the first violation is
/// reported.
pub fn validate_shape(shape: &[usize]) -> Result<(), KeyEstimationError> {
    if shape.len() != BATCH_RANK {
        return Err(KeyEstimationError::ShapeMismatch {
            check: ShapeCheck::Rank,
            expected: BATCH_RANK,
            shape: shape.to_vec(),
        });
    }

    for (axis, expected) in [(1, FRAME_HEIGHT), (2, FRAME_WIDTH), (3, FRAME_CHANNELS)] {
        if shape[axis] != expected {
            return Err(KeyEstimationError::ShapeMismatch {
                check: ShapeCheck::Dim(axis),
                expected,
                shape: shape.to_vec(),
            });
        }
    }

    Ok(())
}

/// Validate a batch and normalize it into the model's input layout
///
/// Needs no model, so callers sharing one model across threads can run this
/// step outside the model lock.
///
/// # Errors
///
/// - `ShapeMismatch` if the input is not `(N, 168, 60, 1)`
/// - `InvalidInput` if `N == 0`
pub fn prepare_frames<S, D, A>(
    data: &ArrayBase<S, D>,
) -> Result<Array4<f16>, KeyEstimationError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
{
    validate_shape(data.shape())?;

    if data.shape()[0] == 0 {
        return Err(KeyEstimationError::InvalidInput(
            "Batch contains no frames".to_string(),
        ));
    }

    std_normalize(data)
        .into_dimensionality::<Ix4>()
        .map_err(|_| KeyEstimationError::ShapeMismatch {
            check: ShapeCheck::Rank,
            expected: BATCH_RANK,
            shape: data.shape().to_vec(),
        })
}

/// Run the model once over prepared frames and check its output shape
///
/// # Errors
///
/// `ModelError` if the model fails or returns a matrix that is not `(N, 24)`
pub fn predict_distributions<M>(
    frames: ArrayView4<'_, f16>,
    model: &mut M,
) -> Result<Array2<f32>, KeyEstimationError>
where
    M: PredictiveModel + ?Sized,
{
    let batch_size = frames.shape()[0];
    log::debug!("Estimating key distribution for {} frames", batch_size);
    let distributions = model.predict(frames, batch_size)?;

    if distributions.dim() != (batch_size, NUM_KEYS) {
        return Err(KeyEstimationError::ModelError(format!(
            "Model returned shape {:?}, expected [{}, {}]",
            distributions.shape(),
            batch_size,
            NUM_KEYS
        )));
    }

    Ok(distributions)
}

/// Estimate one key distribution per frame
///
/// # Arguments
///
/// * `data` - Batch of shape `(N, 168, 60, 1)`, any element convertible to `f64`
/// * `model` - Predictive model, called exactly once with the normalized batch
///
/// # Returns
///
/// Matrix of shape `(N, 24)`
///
/// # Errors
///
/// - `ShapeMismatch` if the input is not `(N, 168, 60, 1)`
/// - `InvalidInput` if `N == 0` (the model is not called)
/// - `ModelError` if the model fails or returns a matrix that is not `(N, 24)`
pub fn estimate_key_distribution<S, D, A, M>(
    data: &ArrayBase<S, D>,
    model: &mut M,
) -> Result<Array2<f32>, KeyEstimationError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
    M: PredictiveModel + ?Sized,
{
    let frames = prepare_frames(data)?;
    predict_distributions(frames.view(), model)
}

/// Estimate the predominant global key with the default configuration
///
/// # Example
///
/// ```
/// use half::f16;
/// use keyscribe::{estimate_key, KeyEstimationError, PredictiveModel};
/// use ndarray::{Array2, Array4, ArrayView4};
///
/// struct AlwaysGMajor;
///
/// impl PredictiveModel for AlwaysGMajor {
///     fn predict(&mut self, _: ArrayView4<'_, f16>, n: usize) -> Result<Array2<f32>, KeyEstimationError> {
///         let mut out = Array2::zeros((n, 24));
///         out.column_mut(7).fill(1.0);
///         Ok(out)
///     }
/// }
///
/// let frames = Array4::<f32>::zeros((2, 168, 60, 1));
/// let ranked = estimate_key(&frames, &mut AlwaysGMajor)?;
/// assert_eq!(ranked.top(), Some(("G Major", 1.0)));
/// # Ok::<(), KeyEstimationError>(())
/// ```
pub fn estimate_key<S, D, A, M>(
    data: &ArrayBase<S, D>,
    model: &mut M,
) -> Result<RankedKeyList, KeyEstimationError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
    M: PredictiveModel + ?Sized,
{
    estimate_key_with_config(data, model, &KeyEstimationConfig::default())
}

/// Estimate the predominant global key
///
/// Averages the per-frame distributions into one and ranks all 24 keys.
pub fn estimate_key_with_config<S, D, A, M>(
    data: &ArrayBase<S, D>,
    model: &mut M,
    config: &KeyEstimationConfig,
) -> Result<RankedKeyList, KeyEstimationError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
    M: PredictiveModel + ?Sized,
{
    let distributions = estimate_key_distribution(data, model)?;
    let averaged = average_distributions(&distributions)?;
    rank_keys(&averaged.to_vec(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Returns a fixed row for every frame and records what it saw
    struct StubModel {
        row: Vec<f32>,
        calls: usize,
        seen_batch_size: Option<usize>,
        seen_shape: Vec<usize>,
    }

    impl StubModel {
        fn new(row: Vec<f32>) -> Self {
            Self {
                row,
                calls: 0,
                seen_batch_size: None,
                seen_shape: vec![],
            }
        }
    }

    impl PredictiveModel for StubModel {
        fn predict(
            &mut self,
            frames: ArrayView4<'_, f16>,
            batch_size: usize,
        ) -> Result<Array2<f32>, KeyEstimationError> {
            self.calls += 1;
            self.seen_batch_size = Some(batch_size);
            self.seen_shape = frames.shape().to_vec();
            let n = frames.shape()[0];
            let flat: Vec<f32> = (0..n).flat_map(|_| self.row.iter().copied()).collect();
            Array2::from_shape_vec((n, self.row.len()), flat)
                .map_err(|e| KeyEstimationError::ModelError(e.to_string()))
        }
    }

    fn uniform_row() -> Vec<f32> {
        vec![1.0 / 24.0; NUM_KEYS]
    }

    fn expect_shape_error(shape: &[usize], check: ShapeCheck, expected: usize) {
        let data = Array::<f64, _>::zeros(IxDyn(shape));
        let mut model = StubModel::new(uniform_row());
        match estimate_key_distribution(&data, &mut model) {
            Err(KeyEstimationError::ShapeMismatch {
                check: got_check,
                expected: got_expected,
                shape: got_shape,
            }) => {
                assert_eq!(got_check, check);
                assert_eq!(got_expected, expected);
                assert_eq!(got_shape, shape.to_vec());
            }
            other => panic!("Expected ShapeMismatch for {:?}, got {:?}", shape, other),
        }
        assert_eq!(model.calls, 0, "model must not run on a rejected shape");
    }

    #[test]
    fn test_rank_must_be_four() {
        expect_shape_error(&[168, 60, 1], ShapeCheck::Rank, 4);
        expect_shape_error(&[1, 168, 60, 1, 1], ShapeCheck::Rank, 4);
    }

    #[test]
    fn test_dimension_1_must_be_168() {
        expect_shape_error(&[2, 167, 60, 1], ShapeCheck::Dim(1), 168);
    }

    #[test]
    fn test_dimension_2_must_be_60() {
        expect_shape_error(&[2, 168, 61, 1], ShapeCheck::Dim(2), 60);
    }

    #[test]
    fn test_dimension_3_must_be_1() {
        expect_shape_error(&[2, 168, 60, 3], ShapeCheck::Dim(3), 1);
    }

    #[test]
    fn test_model_receives_normalized_batch() {
        let data = Array4::from_shape_fn((3, 168, 60, 1), |(n, h, w, _)| (n + h + w) as f64);
        let mut model = StubModel::new(uniform_row());

        let distributions = estimate_key_distribution(&data, &mut model).unwrap();
        assert_eq!(distributions.dim(), (3, NUM_KEYS));
        assert_eq!(model.calls, 1);
        assert_eq!(model.seen_batch_size, Some(3));
        assert_eq!(model.seen_shape, vec![3, 168, 60, 1]);
    }

    #[test]
    fn test_dynamic_rank_input_is_accepted() {
        let data = Array::<f32, _>::ones(IxDyn(&[1, 168, 60, 1]));
        let mut model = StubModel::new(uniform_row());
        assert!(estimate_key_distribution(&data, &mut model).is_ok());
    }

    #[test]
    fn test_empty_batch_does_not_call_model() {
        let data = Array4::<f64>::zeros((0, 168, 60, 1));
        let mut model = StubModel::new(uniform_row());
        assert!(matches!(
            estimate_key_distribution(&data, &mut model),
            Err(KeyEstimationError::InvalidInput(_))
        ));
        assert_eq!(model.calls, 0);
    }

    #[test]
    fn test_wrong_model_output_shape() {
        let data = Array4::<f64>::zeros((2, 168, 60, 1));
        let mut model = StubModel::new(vec![0.5; 12]);
        assert!(matches!(
            estimate_key_distribution(&data, &mut model),
            Err(KeyEstimationError::ModelError(_))
        ));
    }

    #[test]
    fn test_estimate_key_averages_frames() {
        // Frame 0 says A minor, frame 1 splits between A minor and A major
        struct TwoFrames;
        impl PredictiveModel for TwoFrames {
            fn predict(
                &mut self,
                _: ArrayView4<'_, f16>,
                batch_size: usize,
            ) -> Result<Array2<f32>, KeyEstimationError> {
                let mut out = Array2::zeros((batch_size, NUM_KEYS));
                out[[0, 21]] = 1.0;
                out[[1, 21]] = 0.2;
                out[[1, 9]] = 0.8;
                Ok(out)
            }
        }

        let data = Array4::<f64>::zeros((2, 168, 60, 1));
        let ranked = estimate_key(&data, &mut TwoFrames).unwrap();

        assert_eq!(ranked.keys[0], "A Minor");
        assert_eq!(ranked.keys[1], "A Major");
        assert_eq!(ranked.probabilities[0], 0.6);
        assert_eq!(ranked.probabilities[1], 0.4);
    }

    #[test]
    fn test_model_errors_propagate() {
        struct Failing;
        impl PredictiveModel for Failing {
            fn predict(
                &mut self,
                _: ArrayView4<'_, f16>,
                _: usize,
            ) -> Result<Array2<f32>, KeyEstimationError> {
                Err(KeyEstimationError::ModelError("session closed".to_string()))
            }
        }

        let data = Array4::<f64>::zeros((1, 168, 60, 1));
        let err = estimate_key(&data, &mut Failing).unwrap_err();
        assert_eq!(err, KeyEstimationError::ModelError("session closed".to_string()));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_prepared_frames_match_single_call() {
        let data = Array4::from_shape_fn((2, 168, 60, 1), |(n, h, w, _)| (n * 3 + h + w) as f64);

        let frames = prepare_frames(&data).unwrap();
        assert_eq!(frames.shape(), &[2, 168, 60, 1]);
        let mean: f64 = frames.iter().map(|x| x.to_f64()).sum::<f64>() / frames.len() as f64;
        assert!(mean.abs() < 1e-2, "prepared frames should be normalized, mean={}", mean);

        let mut split_model = StubModel::new(uniform_row());
        let split = predict_distributions(frames.view(), &mut split_model).unwrap();
        let mut whole_model = StubModel::new(uniform_row());
        let whole = estimate_key_distribution(&data, &mut whole_model).unwrap();

        assert_eq!(split, whole);
        assert_eq!(split_model.calls, 1);
        assert_eq!(split_model.seen_batch_size, Some(2));
    }

    #[test]
    fn test_prepare_frames_rejects_before_any_model() {
        assert!(matches!(
            prepare_frames(&Array4::<f64>::zeros((0, 168, 60, 1))),
            Err(KeyEstimationError::InvalidInput(_))
        ));
        assert!(matches!(
            prepare_frames(&Array4::<f64>::zeros((1, 168, 59, 1))),
            Err(KeyEstimationError::ShapeMismatch { check: ShapeCheck::Dim(2), .. })
        ));
    }

    #[test]
    fn test_boxed_dyn_model() {
        let data = Array4::<f64>::zeros((1, 168, 60, 1));
        let mut model: Box<dyn PredictiveModel> = Box::new(StubModel::new(uniform_row()));
        let ranked = estimate_key(&data, &mut model).unwrap();
        assert_eq!(ranked.len(), NUM_KEYS);
        // Uniform distribution keeps index order
        assert_eq!(ranked.keys[0], "C Major");
        assert_eq!(ranked.probabilities[0], 0.04167);
    }
}
