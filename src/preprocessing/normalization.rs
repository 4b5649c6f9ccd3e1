//! Z-score normalization
//!
//! Rescales a whole tensor to zero mean and unit variance using one global
//! mean and one population standard deviation (not per frame), then
//! quantizes to 16-bit floats, which is the precision the key model expects.
//!
//! # Example
//!
//! ```
//! use keyscribe::preprocessing::normalization::std_normalize;
//! use ndarray::array;
//!
//! let data = array![[1.0f64, 2.0], [3.0, 4.0]];
//! let normalized = std_normalize(&data);
//!
//! assert_eq!(normalized.shape(), data.shape());
//! assert!(normalized[[0, 0]].to_f64() < 0.0);
//! assert!(normalized[[1, 1]].to_f64() > 0.0);
//! ```

use half::f16;
use ndarray::{Array, ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};

/// Global statistics of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Mean over all elements
    pub mean: f64,
    /// Population standard deviation (ddof = 0) over all elements
    pub std: f64,
}

/// Compute the global mean and population standard deviation in `f64`
///
/// Returns `None` for an empty tensor.
pub fn compute_stats<S, D, A>(data: &ArrayBase<S, D>) -> Option<NormalizationStats>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
{
    let upcast: Array<f64, D> = data.mapv(|x| x.into());
    stats_f64(&upcast)
}

fn stats_f64<D: Dimension>(data: &Array<f64, D>) -> Option<NormalizationStats> {
    let mean = data.mean()?;
    let std = data.std(0.0);
    Some(NormalizationStats { mean, std })
}

/// Normalize to zero mean / unit variance and quantize to `f16`
///
/// Elements are upcast to `f64` before any arithmetic. If the standard
/// deviation is exactly zero the values are left as they are (only
/// quantized). Values beyond the `f16` range saturate to infinity.
pub fn std_normalize<S, D, A>(data: &ArrayBase<S, D>) -> Array<f16, D>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: Copy + Into<f64>,
{
    let upcast: Array<f64, D> = data.mapv(|x| x.into());

    match stats_f64(&upcast) {
        Some(stats) if stats.std != 0.0 => {
            log::debug!(
                "Normalizing {} values (mean={:.6}, std={:.6})",
                upcast.len(),
                stats.mean,
                stats.std
            );
            upcast.mapv(|x| f16::from_f64((x - stats.mean) / stats.std))
        }
        Some(_) => {
            log::debug!("Zero standard deviation, leaving {} values unscaled", upcast.len());
            upcast.mapv(f16::from_f64)
        }
        None => {
            log::debug!("Empty tensor, nothing to normalize");
            upcast.mapv(f16::from_f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array4};

    /// f16 has a 10-bit mantissa, so ~1e-3 relative error per element
    const F16_TOLERANCE: f64 = 5e-3;

    fn stats_of(data: &Array<f16, ndarray::Ix4>) -> NormalizationStats {
        compute_stats(&data.mapv(f16::to_f64)).unwrap()
    }

    #[test]
    fn test_constant_tensor_is_unchanged() {
        let data = Array4::<f64>::from_elem((2, 168, 60, 1), 0.75);
        let normalized = std_normalize(&data);

        assert_eq!(normalized.shape(), &[2, 168, 60, 1]);
        assert!(normalized.iter().all(|&x| x == f16::from_f64(0.75)));
    }

    #[test]
    fn test_non_constant_tensor_has_zero_mean_unit_std() {
        let data = Array4::from_shape_fn((3, 168, 60, 1), |(n, h, w, _)| {
            ((n * 7 + h * 3 + w) % 17) as f64 * 12.5 - 40.0
        });
        let normalized = std_normalize(&data);
        let stats = stats_of(&normalized);

        assert!(stats.mean.abs() < F16_TOLERANCE, "mean = {}", stats.mean);
        assert!((stats.std - 1.0).abs() < F16_TOLERANCE, "std = {}", stats.std);
    }

    #[test]
    fn test_statistics_are_global_not_per_frame() {
        // Frame 0 is all 0.0, frame 1 is all 2.0: global mean 1, std 1
        let data = Array4::from_shape_fn((2, 4, 3, 1), |(n, _, _, _)| n as f64 * 2.0);
        let normalized = std_normalize(&data);

        assert!(normalized.index_axis(ndarray::Axis(0), 0).iter().all(|&x| x == f16::from_f64(-1.0)));
        assert!(normalized.index_axis(ndarray::Axis(0), 1).iter().all(|&x| x == f16::from_f64(1.0)));
    }

    #[test]
    fn test_population_standard_deviation() {
        let data = ndarray::array![2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = compute_stats(&data).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert!((stats.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_f32_input_is_upcast() {
        let data = Array2::<f32>::from_shape_fn((4, 4), |(i, j)| (i * 4 + j) as f32);
        let normalized = std_normalize(&data);
        let stats = compute_stats(&normalized.mapv(f16::to_f64)).unwrap();
        assert!(stats.mean.abs() < F16_TOLERANCE);
        assert!((stats.std - 1.0).abs() < F16_TOLERANCE);
    }

    #[test]
    fn test_out_of_range_values_saturate() {
        // Constant, so left unscaled, and 1e6 is beyond f16::MAX (65504)
        let data = Array2::<f64>::from_elem((2, 2), 1.0e6);
        let normalized = std_normalize(&data);
        assert!(normalized.iter().all(|x| x.is_infinite() && x.is_sign_positive()));
    }

    #[test]
    fn test_empty_tensor() {
        let data = Array4::<f64>::zeros((0, 168, 60, 1));
        assert!(compute_stats(&data).is_none());
        let normalized = std_normalize(&data);
        assert_eq!(normalized.shape(), &[0, 168, 60, 1]);
    }
}
