//! Classification of local accesses and their static-field equivalents.
//!
//! The mapping is closed and total: each of the three local-access kinds has exactly one
//! static-field counterpart, and both sides are plain enums matched exhaustively, so adding a
//! kind without its counterpart does not compile.
//!
//! | local    | static    |
//! |----------|-----------|
//! | `ldloc`  | `ldsfld`  |
//! | `ldloca` | `ldsflda` |
//! | `stloc`  | `stsfld`  |

use crate::{
    assembly::{Code, Instruction, Operand},
    metadata::method::LocalId,
    Result,
};

/// How an instruction accesses a local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalAccess {
    /// `ldloc` - push the value
    Load,
    /// `ldloca` - push the address
    LoadAddress,
    /// `stloc` - pop into the local
    Store,
}

/// How an instruction accesses a static field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticAccess {
    /// `ldsfld` - push the value
    Load,
    /// `ldsflda` - push the address
    LoadAddress,
    /// `stsfld` - pop into the field
    Store,
}

impl LocalAccess {
    /// The access kind of a canonical local opcode, `None` for every other opcode.
    ///
    /// Compact forms such as `ldloc.0` are not classified; see [`classify`].
    #[must_use]
    pub fn from_code(code: Code) -> Option<LocalAccess> {
        match code {
            Code::Ldloc => Some(LocalAccess::Load),
            Code::Ldloca => Some(LocalAccess::LoadAddress),
            Code::Stloc => Some(LocalAccess::Store),
            _ => None,
        }
    }

    /// The canonical opcode of this access kind.
    #[must_use]
    pub fn code(self) -> Code {
        match self {
            LocalAccess::Load => Code::Ldloc,
            LocalAccess::LoadAddress => Code::Ldloca,
            LocalAccess::Store => Code::Stloc,
        }
    }

    /// The equivalent access to a static field.
    #[must_use]
    pub fn to_static(self) -> StaticAccess {
        match self {
            LocalAccess::Load => StaticAccess::Load,
            LocalAccess::LoadAddress => StaticAccess::LoadAddress,
            LocalAccess::Store => StaticAccess::Store,
        }
    }
}

impl StaticAccess {
    /// The opcode of this access kind.
    #[must_use]
    pub fn code(self) -> Code {
        match self {
            StaticAccess::Load => Code::Ldsfld,
            StaticAccess::LoadAddress => Code::Ldsflda,
            StaticAccess::Store => Code::Stsfld,
        }
    }
}

/// Classifies one instruction of a normalized body.
///
/// Returns the access kind and local for `ldloc`/`ldloca`/`stloc` with a local handle, and
/// `None` for instructions that do not touch a local.
///
/// # Errors
///
/// Returns [`crate::Error::ContractViolation`] if the instruction is a compact local form, a
/// local-access opcode without a local handle, or any other opcode carrying a local handle.
pub fn classify(instr: &Instruction) -> Result<Option<(LocalAccess, LocalId)>> {
    if instr.code.is_local_macro() {
        return Err(contract_violation!(
            "{} - compact local form in a body that was not normalized",
            instr
        ));
    }

    match (LocalAccess::from_code(instr.code), &instr.operand) {
        (Some(access), Operand::Local(id)) => Ok(Some((access, *id))),
        (Some(_), operand) => Err(contract_violation!(
            "{} - local access without a local handle ({:?})",
            instr,
            operand
        )),
        (None, Operand::Local(id)) => Err(contract_violation!(
            "{} - opcode {} cannot carry local {}",
            instr,
            instr.code,
            id
        )),
        (None, _) => Ok(None),
    }
}
