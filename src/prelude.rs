//! # cilslot Prelude
//!
//! The most commonly used types, for `use cilslot::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilslot operations
pub use crate::Error;

/// The result type used throughout cilslot
pub use crate::Result;

// ================================================================================================
// Instructions
// ================================================================================================

/// Instruction model
pub use crate::assembly::{Code, Immediate, Instruction, Operand};

/// Compact-form expansion
pub use crate::assembly::simplify_macros;

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Type signatures of locals and fields
pub use crate::metadata::signatures::{SignatureField, SignatureLocalVariable, TypeSignature};

/// Field declarations
pub use crate::metadata::field::{Field, FieldAttributes, FieldRc};

/// The `<Module>` type receiving every slot
pub use crate::metadata::globaltype::GlobalType;

/// Methods, bodies and locals
pub use crate::metadata::method::{Local, LocalId, Method, MethodBody};

// ================================================================================================
// Transform
// ================================================================================================

/// Rewriter, allocator and driver
pub use crate::transform::{
    LocalsToFieldsConfig, LocalsToFieldsPass, LocalsToFieldsRewriter, NamingStrategy, PassReport,
    RewriteOutcome, SlotAllocator,
};

/// Naming
pub use crate::transform::{NameGenerator, RandomNames, SequentialNames};

/// Events
pub use crate::transform::{EventKind, EventLog};
