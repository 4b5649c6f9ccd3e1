//! # Keyscribe
//!
//! Musical key estimation on top of a pluggable key-classification model:
//! decode feature tensors from a compact binary format, normalize them, run
//! the model, and turn its output into a deterministic ranked list of keys.
//!
//! ## Features
//!
//! - **Tensor decoding**: length-prefixed big-endian `f64` tensors with explicit truncation checks
//! - **Normalization**: global z-score scaling, quantized to 16-bit floats for the model
//! - **Key ranking**: frame averaging, stable descending sort, "C♯ Minor"-style labels
//! - **ONNX backend**: optional ONNX Runtime model (`ml` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyscribe::{decode_and_estimate, PredictiveModel};
//!
//! # fn model() -> Box<dyn PredictiveModel> { unimplemented!() }
//! let bytes: Vec<u8> = std::fs::read("features.bin")?;
//! let mut model = model(); // e.g. keyscribe::ml::OnnxKeyModel with the `ml` feature
//!
//! let ranked = decode_and_estimate(&bytes, &mut model)?;
//! for (key, probability) in ranked.iter().take(3) {
//!     println!("{}: {:.5}", key, probability);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Bytes → Tensor Decoding → Batch (N, 168, 60, 1) → Normalization → Model → Averaging → Ranking
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod ml;
pub mod preprocessing;

// Re-export main types
pub use analysis::result::{Key, RankedKeyList, NUM_KEYS};
pub use config::{AccidentalStyle, KeyEstimationConfig};
pub use error::{KeyEstimationError, ShapeCheck};
pub use features::key::{estimate_key, estimate_key_distribution, estimate_key_with_config, rank};
pub use io::tensor_decoder::decode_tensor;
pub use ml::PredictiveModel;

/// Decode a binary tensor and estimate its key
///
/// The decoded `(N, 168, 60)` tensor gets a trailing channel axis and is
/// passed through [`estimate_key_with_config`].
///
/// # Arguments
///
/// * `bytes` - Tensor in the length-prefixed big-endian format (see [`io::tensor_decoder`])
/// * `model` - Key classification model
///
/// # Errors
///
/// Returns `KeyEstimationError` if the buffer is truncated, the decoded shape
/// is not `(N, 168, 60)`, or the model fails.
pub fn decode_and_estimate<M>(
    bytes: &[u8],
    model: &mut M,
) -> Result<RankedKeyList, KeyEstimationError>
where
    M: PredictiveModel + ?Sized,
{
    decode_and_estimate_with_config(bytes, model, &KeyEstimationConfig::default())
}

/// [`decode_and_estimate`] with an explicit configuration
pub fn decode_and_estimate_with_config<M>(
    bytes: &[u8],
    model: &mut M,
    config: &KeyEstimationConfig,
) -> Result<RankedKeyList, KeyEstimationError>
where
    M: PredictiveModel + ?Sized,
{
    use std::time::Instant;
    let start_time = Instant::now();

    let frames = decode_tensor(bytes)?;
    let batch = io::tensor_decoder::into_batch(frames);
    let ranked = estimate_key_with_config(&batch, model, config)?;

    log::debug!(
        "Estimated key {:?} in {:.2} ms",
        ranked.top(),
        start_time.elapsed().as_secs_f32() * 1000.0
    );

    Ok(ranked)
}
