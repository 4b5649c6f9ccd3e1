//! Length-prefixed tensor decoding
//!
//! Reconstructs a 3-dimensional `f64` array from a flat byte stream. All
//! multi-byte values are big-endian:
//!
//! | Offset | Length | Meaning |
//! |--------|--------|---------|
//! | 0      | 4      | outer dimension (`u32`) |
//! | 4      | 4      | middle dimension (`u32`) |
//! | 8      | 4      | inner dimension (`u32`) |
//! | 12..   | 8 each | `outer * middle * inner` IEEE-754 doubles, row-major |
//!
//! Element `(i, j, k)` lives at byte offset
//! `12 + 8 * (i * middle * inner + j * inner + k)`.
//!
//! # Example
//!
//! ```
//! use keyscribe::io::tensor_decoder::decode_tensor;
//!
//! let mut bytes = Vec::new();
//! for dim in [1u32, 1, 2] {
//!     bytes.extend_from_slice(&dim.to_be_bytes());
//! }
//! bytes.extend_from_slice(&1.5f64.to_be_bytes());
//! bytes.extend_from_slice(&(-2.0f64).to_be_bytes());
//!
//! let tensor = decode_tensor(&bytes)?;
//! assert_eq!(tensor.shape(), &[1, 1, 2]);
//! assert_eq!(tensor[[0, 0, 1]], -2.0);
//! # Ok::<(), keyscribe::KeyEstimationError>(())
//! ```

use ndarray::{Array3, Array4, Axis};

use crate::error::KeyEstimationError;

/// Size of the dimension header in bytes
pub const HEADER_LEN: usize = 12;

/// Size of one encoded element in bytes
pub const ELEMENT_LEN: usize = 8;

/// Tensor dimensions declared in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Outer (slowest varying) dimension
    pub outer: u32,
    /// Middle dimension
    pub middle: u32,
    /// Inner (fastest varying) dimension
    pub inner: u32,
}

impl Dimensions {
    /// Read the three dimension fields from the first 12 bytes
    pub fn from_header(bytes: &[u8]) -> Result<Self, KeyEstimationError> {
        if bytes.len() < HEADER_LEN {
            return Err(KeyEstimationError::TruncatedBuffer {
                required: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            outer: read_u32_be(&bytes[0..4])?,
            middle: read_u32_be(&bytes[4..8])?,
            inner: read_u32_be(&bytes[8..12])?,
        })
    }

    /// Shape as `(outer, middle, inner)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.outer as usize, self.middle as usize, self.inner as usize)
    }

    /// Number of encoded elements
    pub fn element_count(&self) -> Result<usize, KeyEstimationError> {
        let (outer, middle, inner) = self.shape();
        outer
            .checked_mul(middle)
            .and_then(|n| n.checked_mul(inner))
            .ok_or_else(|| {
                KeyEstimationError::InvalidInput(format!(
                    "Tensor dimensions {}x{}x{} overflow the addressable size",
                    outer, middle, inner
                ))
            })
    }

    /// Total buffer length (header included) these dimensions require
    pub fn required_len(&self) -> Result<usize, KeyEstimationError> {
        self.element_count()?
            .checked_mul(ELEMENT_LEN)
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| {
                KeyEstimationError::InvalidInput(format!(
                    "Tensor dimensions {:?} overflow the addressable size",
                    self.shape()
                ))
            })
    }
}

/// Read a big-endian `u32` from the first 4 bytes
pub fn read_u32_be(bytes: &[u8]) -> Result<u32, KeyEstimationError> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(KeyEstimationError::TruncatedBuffer {
            required: 4,
            actual: bytes.len(),
        })?;
    Ok(u32::from_be_bytes(raw))
}

/// Read a big-endian IEEE-754 double from the first 8 bytes
pub fn read_f64_be(bytes: &[u8]) -> Result<f64, KeyEstimationError> {
    let raw: [u8; 8] = bytes
        .get(..ELEMENT_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(KeyEstimationError::TruncatedBuffer {
            required: ELEMENT_LEN,
            actual: bytes.len(),
        })?;
    Ok(f64::from_be_bytes(raw))
}

/// Decode a byte buffer into a row-major `(outer, middle, inner)` array
///
/// # Errors
///
/// - `TruncatedBuffer` if the buffer is shorter than the header, or shorter
///   than the header plus `outer * middle * inner` doubles
/// - `InvalidInput` if the declared dimensions overflow `usize`
///
/// Bytes past the last declared element are ignored.
pub fn decode_tensor(bytes: &[u8]) -> Result<Array3<f64>, KeyEstimationError> {
    let dims = Dimensions::from_header(bytes)?;
    let required = dims.required_len()?;

    log::debug!(
        "Decoding {}x{}x{} tensor from {} bytes",
        dims.outer,
        dims.middle,
        dims.inner,
        bytes.len()
    );

    if bytes.len() < required {
        return Err(KeyEstimationError::TruncatedBuffer {
            required,
            actual: bytes.len(),
        });
    }
    if bytes.len() > required {
        log::warn!(
            "Ignoring {} trailing bytes after {}-byte tensor",
            bytes.len() - required,
            required
        );
    }

    let values = bytes[HEADER_LEN..required]
        .chunks_exact(ELEMENT_LEN)
        .map(read_f64_be)
        .collect::<Result<Vec<f64>, _>>()?;

    Array3::from_shape_vec(dims.shape(), values)
        .map_err(|e| KeyEstimationError::InvalidInput(format!("Tensor shape error: {}", e)))
}

/// Append the trailing singleton channel axis: `(N, H, W)` becomes `(N, H, W, 1)`
pub fn into_batch<A>(frames: Array3<A>) -> Array4<A> {
    frames.insert_axis(Axis(3))
}
