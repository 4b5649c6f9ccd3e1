//! Key ranking
//!
//! Turns an averaged 24-class distribution into labelled keys ordered by
//! descending probability.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

use crate::analysis::result::{Key, RankedKeyList, NUM_KEYS};
use crate::config::{AccidentalStyle, KeyEstimationConfig};
use crate::error::KeyEstimationError;

/// Element-wise mean of a batch of distributions (one row per frame)
///
/// # Errors
///
/// Returns `InvalidInput` for an empty batch.
pub fn average_distributions<S, A>(
    batch: &ArrayBase<S, Ix2>,
) -> Result<Array1<f64>, KeyEstimationError>
where
    S: Data<Elem = A>,
    A: Copy + Into<f64>,
{
    if batch.nrows() == 0 {
        return Err(KeyEstimationError::InvalidInput(
            "Cannot average an empty batch of distributions".to_string(),
        ));
    }

    let upcast: Array2<f64> = batch.mapv(|p| p.into());
    upcast
        .mean_axis(Axis(0))
        .ok_or_else(|| KeyEstimationError::InvalidInput("Empty distribution batch".to_string()))
}

/// Rank the 24 keys with the default configuration
pub fn rank(distribution: &[f64]) -> Result<RankedKeyList, KeyEstimationError> {
    rank_keys(distribution, &KeyEstimationConfig::default())
}

/// Rank the 24 keys by descending probability
///
/// Ordering uses the unrounded probabilities. Equal probabilities keep
/// ascending index order. Probabilities are rounded to
/// `config.probability_decimals` places only after sorting.
///
/// # Errors
///
/// - `InvalidInput` if the distribution does not have 24 entries
/// - `NumericalError` if any probability is NaN
///
/// # Example
///
/// ```
/// use keyscribe::features::key::ranker::rank;
///
/// let mut distribution = vec![0.0; 24];
/// distribution[21] = 0.6;
/// distribution[9] = 0.4;
///
/// let ranked = rank(&distribution)?;
/// assert_eq!(ranked.keys[0], "A Minor");
/// assert_eq!(ranked.keys[1], "A Major");
/// # Ok::<(), keyscribe::KeyEstimationError>(())
/// ```
pub fn rank_keys(
    distribution: &[f64],
    config: &KeyEstimationConfig,
) -> Result<RankedKeyList, KeyEstimationError> {
    if distribution.len() != NUM_KEYS {
        return Err(KeyEstimationError::InvalidInput(format!(
            "Key distribution must have {} entries, got {}",
            NUM_KEYS,
            distribution.len()
        )));
    }

    if let Some(index) = distribution.iter().position(|p| p.is_nan()) {
        return Err(KeyEstimationError::NumericalError(format!(
            "Key distribution has NaN probability at index {}",
            index
        )));
    }

    // Stable sort: ties stay in ascending index order
    let mut order: Vec<usize> = (0..NUM_KEYS).collect();
    order.sort_by(|&a, &b| {
        distribution[b]
            .partial_cmp(&distribution[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut keys = Vec::with_capacity(NUM_KEYS);
    let mut probabilities = Vec::with_capacity(NUM_KEYS);
    for &index in &order {
        keys.push(key_label(index, config.accidental_style)?);
        probabilities.push(round_to(distribution[index], config.probability_decimals));
    }

    log::debug!("Ranked keys: top = {} ({:.5})", keys[0], probabilities[0]);

    Ok(RankedKeyList {
        keys,
        probabilities,
        indices: order,
    })
}

/// Label for a key distribution index (e.g. 21 -> "A Minor")
pub fn key_label(index: usize, style: AccidentalStyle) -> Result<String, KeyEstimationError> {
    Key::from_distribution_index(index)
        .map(|key| key.label(style))
        .ok_or_else(|| {
            KeyEstimationError::InvalidInput(format!(
                "Key distribution index {} out of range 0-{}",
                index,
                NUM_KEYS - 1
            ))
        })
}

/// Round the stored binary value to `decimals` places, ties to even
///
/// Goes through exact decimal formatting so e.g. 0.000155 (stored just
/// below the tie) becomes 0.00015 and 0.015625 becomes 0.01562.
fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}
