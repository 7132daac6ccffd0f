// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilslot
//!
//! A CIL bytecode transform that moves the local variables of .NET methods into static fields
//! of the module's global type (`<Module>`).
//!
//! Every `ldloc`, `ldloca` and `stloc` becomes `ldsfld`, `ldsflda` and `stsfld` of a dedicated,
//! uniquely named `public static` field whose type equals the type of the local it replaces.
//! Accessed locals are then removed from the method's local table. Decompilers and analysis
//! tools lose the local/temporary structure of the method, which is the purpose of the
//! transform.
//!
//! ## Features
//!
//! - **Macro normalizer** - Expands compact forms (`ldloc.0`, `stloc.s`, `ldc.i4.5`, `br.s`)
//!   into canonical instructions with explicit operands
//! - **Per-method slot allocation** - One slot per accessed local, memoized within the method
//! - **Concurrent declaration container** - Slots from many methods, and many threads, land on
//!   the same global type without lost updates or duplicate names
//! - **Pluggable naming** - Sequential or seeded random names via [`transform::NameGenerator`]
//! - **Event log** - A record of every slot, rewritten instruction and skipped method
//!
//! ## Quick Start
//!
//! ```rust
//! use cilslot::prelude::*;
//!
//! let global = GlobalType::default();
//!
//! let mut body = MethodBody::new();
//! let a = body.add_typed_local(TypeSignature::I4);
//! let b = body.add_typed_local(TypeSignature::I4);
//! body.push(Instruction::ldc_i4(1))
//!     .push(Instruction::simple(Code::Stloc0))
//!     .push(Instruction::simple(Code::Ldloc0))
//!     .push(Instruction::stloc(b))
//!     .push(Instruction::ldloca(b));
//!
//! let mut methods = vec![Method {
//!     token: Token::new(0x0600_0001),
//!     name: "Run".to_string(),
//!     parameter_count: 0,
//!     body: Some(body),
//! }];
//!
//! let report = LocalsToFieldsPass::default().run(&global, &mut methods)?;
//! assert_eq!(report.slots_created, 2);
//!
//! let body = methods[0].body.as_ref().unwrap();
//! assert!(body.locals.is_empty());
//! assert!(!body.references_locals());
//! # let _ = a;
//! # Ok::<(), cilslot::Error>(())
//! ```
//!
//! ## Known limitation
//!
//! A rewritten method stores its former locals in static fields shared by all of its
//! invocations. Recursive or concurrent calls of that method overwrite each other's values:
//! the transformed method is neither re-entrant nor thread-safe. This is inherent to the
//! transform and is not corrected.
//!
//! ## Architecture
//!
//! - [`assembly`] - Instruction model and the macro normalizer
//! - [`metadata`] - Tokens, signatures, fields, method bodies and the global type
//! - [`transform`] - Slot allocation, the operand rewriter and the pass driver
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug` per method, `trace` per rewritten
//! instruction, `warn` for methods that fail, `info` for the run summary. No logger is
//! installed by the library.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// CIL instruction model and the macro normalizer.
pub mod assembly;

/// In-memory metadata: tokens, signatures, fields, method bodies and the global type.
pub mod metadata;

/// The locals-to-fields transform.
pub mod transform;

/// `cilslot` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilslot` Error type
///
/// See [`Error`] for the failure categories of the normalizer, the rewriter and the pass.
pub use error::Error;
