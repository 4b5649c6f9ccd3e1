//! Feature post-processing modules
//!
//! - Key estimation (model distribution to ranked keys)

pub mod key;
