//! CIL instructions and the macro normalizer.
//!
//! - [`Instruction`], [`Code`], [`Operand`] - The instruction model shared by every stage
//! - [`simplify_macros`] - Expansion of compact forms into the canonical, explicit-operand
//!   shape the locals-to-fields rewriter consumes

mod instruction;
mod macros;

pub use instruction::{Code, Immediate, Instruction, Operand};
pub use macros::simplify_macros;
