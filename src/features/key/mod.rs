//! Key estimation modules
//!
//! Estimate the musical key from a batch of feature frames:
//! - Shape validation and model invocation (24-class distribution per frame)
//! - Averaging across frames
//! - Ranking and labelling of the 24 keys

pub mod estimator;
pub mod ranker;

pub use estimator::{
    estimate_key, estimate_key_distribution, estimate_key_with_config, predict_distributions,
    prepare_frames, validate_shape, BATCH_RANK, FRAME_CHANNELS, FRAME_HEIGHT, FRAME_WIDTH,
};
pub use ranker::{average_distributions, key_label, rank, rank_keys};
