//! Type signatures for locals and fields.
//!
//! Only the in-memory shape is modelled here. Slots created by the transform copy the declared
//! type of the local they replace, so the two signature kinds provide a lossless conversion.

mod types;

pub use types::*;
