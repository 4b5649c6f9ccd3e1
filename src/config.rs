//! Configuration parameters for key estimation

use serde::{Deserialize, Serialize};

/// How sharps are written in key labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccidentalStyle {
    /// Unicode sharp sign (e.g. "C♯")
    Unicode,
    /// ASCII hash (e.g. "C#")
    Ascii,
}

/// Key estimation configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyEstimationConfig {
    /// Decimal places kept on ranked probabilities (default: 5)
    ///
    /// Rounding happens after sorting, so it never changes the order.
    pub probability_decimals: u32,

    /// Sharp rendering in key labels (default: Unicode)
    pub accidental_style: AccidentalStyle,
}

impl Default for KeyEstimationConfig {
    fn default() -> Self {
        Self {
            probability_decimals: 5,
            accidental_style: AccidentalStyle::Unicode,
        }
    }
}
