//! The locals-to-fields transform.
//!
//! Every local variable a method reads, writes or takes the address of is replaced with a
//! dedicated `public static` field on the module's global type:
//!
//! | before   | after     |
//! |----------|-----------|
//! | `ldloc`  | `ldsfld`  |
//! | `ldloca` | `ldsflda` |
//! | `stloc`  | `stsfld`  |
//!
//! - [`SlotAllocator`] - Maps each local of one method to its slot, declaring it on first use
//! - [`LocalsToFieldsRewriter`] - Rewrites one normalized body and prunes its local table
//! - [`LocalsToFieldsPass`] - Runs normalization and the rewrite over many methods
//! - [`NameGenerator`] - Source of collision-free slot names
//! - [`EventLog`] - Record of what a run did
//!
//! # Example
//!
//! ```rust
//! use cilslot::prelude::*;
//!
//! let global = GlobalType::default();
//! let mut body = MethodBody::new();
//! let a = body.add_typed_local(TypeSignature::I4);
//! body.push(Instruction::ldc_i4(1))
//!     .push(Instruction::stloc(a))
//!     .push(Instruction::ldloc(a));
//!
//! let mut methods = vec![Method {
//!     token: Token::new(0x0600_0001),
//!     name: "Main".to_string(),
//!     parameter_count: 0,
//!     body: Some(body),
//! }];
//!
//! let pass = LocalsToFieldsPass::new(LocalsToFieldsConfig::default());
//! let report = pass.run(&global, &mut methods)?;
//! assert_eq!(report.slots_created, 1);
//! assert!(global.contains_name("f_a"));
//! # Ok::<(), cilslot::Error>(())
//! ```
//!
//! # Known limitation
//!
//! Slots are shared by every invocation of the rewritten method. Rewritten methods are not
//! re-entrant and not thread-safe.

mod access;
mod allocator;
mod config;
mod events;
mod names;
mod pass;
pub mod rewriter;

pub use access::{classify, LocalAccess, StaticAccess};
pub use allocator::SlotAllocator;
pub use config::{LocalsToFieldsConfig, NamingStrategy};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use names::{NameGenerator, RandomNames, SequentialNames, DEFAULT_ALPHABET};
pub use pass::{LocalsToFieldsPass, PassReport};
pub use rewriter::{LocalsToFieldsRewriter, RewriteOutcome};
