//! Tensor I/O modules
//!
//! Decoding of the length-prefixed big-endian tensor format.

pub mod tensor_decoder;

pub use tensor_decoder::{decode_tensor, into_batch, Dimensions};
