//! Tensor preprocessing modules
//!
//! Prepares feature tensors before they reach the model:
//! - Global z-score normalization with 16-bit quantization

pub mod normalization;

pub use normalization::{compute_stats, std_normalize, NormalizationStats};
