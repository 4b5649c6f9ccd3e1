//! Analysis result modules
//!
//! Key classes, their labels, and the ranked output list.

pub mod result;

pub use result::{Key, RankedKeyList, NUM_KEYS};
