//! In-memory metadata the transform reads and writes.
//!
//! - [`token`] - Metadata tokens
//! - [`signatures`] - Local and field type signatures
//! - [`field`] - Field declarations and attributes
//! - [`globaltype`] - The `<Module>` type that owns every storage slot
//! - [`method`] - Method bodies, locals and exception clauses

pub mod field;
pub mod globaltype;
pub mod method;
pub mod signatures;
pub mod token;
