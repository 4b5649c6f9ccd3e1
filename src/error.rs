//! Error types for tensor decoding and key estimation

use std::fmt;

/// Which part of the batch shape failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeCheck {
    /// Number of axes
    Rank,
    /// Length of the given axis
    Dim(usize),
}

impl fmt::Display for ShapeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeCheck::Rank => write!(f, "rank"),
            ShapeCheck::Dim(axis) => write!(f, "dimension {}", axis),
        }
    }
}

/// Errors that can occur while decoding tensors or estimating keys
#[derive(Debug, Clone, PartialEq)]
pub enum KeyEstimationError {
    /// Tensor rank or a dimension does not match what the model accepts
    ShapeMismatch {
        /// The violated check
        check: ShapeCheck,
        /// Expected rank or dimension length
        expected: usize,
        /// Full shape of the rejected tensor
        shape: Vec<usize>,
    },

    /// Byte buffer is shorter than its header declares
    TruncatedBuffer {
        /// Bytes needed to decode the declared tensor
        required: usize,
        /// Bytes actually supplied
        actual: usize,
    },

    /// Invalid input parameters
    InvalidInput(String),

    /// Numerical error (NaN, overflow, etc.)
    NumericalError(String),

    /// The predictive model failed or returned something unusable
    ModelError(String),
}

impl KeyEstimationError {
    /// Whether the error was caused by the caller's input.
    ///
    /// A service layer maps these to a 4xx-class response; everything else is
    /// a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KeyEstimationError::ShapeMismatch { .. }
                | KeyEstimationError::TruncatedBuffer { .. }
                | KeyEstimationError::InvalidInput(_)
        )
    }
}

impl fmt::Display for KeyEstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEstimationError::ShapeMismatch {
                check: ShapeCheck::Rank,
                expected,
                shape,
            } => write!(
                f,
                "Shape mismatch: input data must have {} dimensions, actual shape was {:?}",
                expected, shape
            ),
            KeyEstimationError::ShapeMismatch {
                check,
                expected,
                shape,
            } => write!(
                f,
                "Shape mismatch: {} must be {}, actual shape was {:?}",
                check, expected, shape
            ),
            KeyEstimationError::TruncatedBuffer { required, actual } => write!(
                f,
                "Truncated buffer: need {} bytes, got {}",
                required, actual
            ),
            KeyEstimationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            KeyEstimationError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            KeyEstimationError::ModelError(msg) => write!(f, "Model error: {}", msg),
        }
    }
}

impl std::error::Error for KeyEstimationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let shape = KeyEstimationError::ShapeMismatch {
            check: ShapeCheck::Dim(1),
            expected: 168,
            shape: vec![2, 100, 60, 1],
        };
        assert!(shape.is_client_error());
        assert!(KeyEstimationError::TruncatedBuffer { required: 20, actual: 12 }.is_client_error());
        assert!(KeyEstimationError::InvalidInput("x".to_string()).is_client_error());
        assert!(!KeyEstimationError::ModelError("x".to_string()).is_client_error());
        assert!(!KeyEstimationError::NumericalError("x".to_string()).is_client_error());
    }

    #[test]
    fn test_shape_mismatch_message_names_dimension() {
        let err = KeyEstimationError::ShapeMismatch {
            check: ShapeCheck::Dim(2),
            expected: 60,
            shape: vec![1, 168, 59, 1],
        };
        let msg = err.to_string();
        assert!(msg.contains("dimension 2"), "{}", msg);
        assert!(msg.contains("60"), "{}", msg);
        assert!(msg.contains("[1, 168, 59, 1]"), "{}", msg);
    }

    #[test]
    fn test_rank_mismatch_message() {
        let err = KeyEstimationError::ShapeMismatch {
            check: ShapeCheck::Rank,
            expected: 4,
            shape: vec![168, 60],
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch: input data must have 4 dimensions, actual shape was [168, 60]"
        );
    }
}
