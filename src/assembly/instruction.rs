//! CIL instruction representation.
//!
//! An [`Instruction`] is an opcode from the closed [`Code`] enumeration plus a typed
//! [`Operand`]. Method bodies arrive in one of two shapes: *compact*, as decoded from the IL
//! stream, where locals and arguments are referenced by index or implied by the opcode
//! (`ldloc.0`, `stloc.s 4`), and *normalized*, produced by [`crate::assembly::simplify_macros`],
//! where every local access is `ldloc`/`ldloca`/`stloc` carrying an [`Operand::Local`] handle.
//!
//! # Thread Safety
//!
//! All types in this module are [`Send`] and [`Sync`]; resolved field operands share their
//! [`Field`](crate::metadata::field::Field) through an [`Arc`](std::sync::Arc).

use std::fmt;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::metadata::{field::FieldRc, method::LocalId, token::Token};

/// The CIL opcodes the transform and the macro normalizer reason about.
///
/// Discriminants are the ECMA-335 encodings; two-byte opcodes are stored as `0xFExx`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[repr(u16)]
pub enum Code {
    #[strum(serialize = "nop")]
    Nop = 0x00,
    #[strum(serialize = "ldarg.0")]
    Ldarg0 = 0x02,
    #[strum(serialize = "ldarg.1")]
    Ldarg1 = 0x03,
    #[strum(serialize = "ldarg.2")]
    Ldarg2 = 0x04,
    #[strum(serialize = "ldarg.3")]
    Ldarg3 = 0x05,
    #[strum(serialize = "ldloc.0")]
    Ldloc0 = 0x06,
    #[strum(serialize = "ldloc.1")]
    Ldloc1 = 0x07,
    #[strum(serialize = "ldloc.2")]
    Ldloc2 = 0x08,
    #[strum(serialize = "ldloc.3")]
    Ldloc3 = 0x09,
    #[strum(serialize = "stloc.0")]
    Stloc0 = 0x0A,
    #[strum(serialize = "stloc.1")]
    Stloc1 = 0x0B,
    #[strum(serialize = "stloc.2")]
    Stloc2 = 0x0C,
    #[strum(serialize = "stloc.3")]
    Stloc3 = 0x0D,
    #[strum(serialize = "ldarg.s")]
    LdargS = 0x0E,
    #[strum(serialize = "ldarga.s")]
    LdargaS = 0x0F,
    #[strum(serialize = "starg.s")]
    StargS = 0x10,
    #[strum(serialize = "ldloc.s")]
    LdlocS = 0x11,
    #[strum(serialize = "ldloca.s")]
    LdlocaS = 0x12,
    #[strum(serialize = "stloc.s")]
    StlocS = 0x13,
    #[strum(serialize = "ldnull")]
    Ldnull = 0x14,
    #[strum(serialize = "ldc.i4.m1")]
    LdcI4M1 = 0x15,
    #[strum(serialize = "ldc.i4.0")]
    LdcI40 = 0x16,
    #[strum(serialize = "ldc.i4.1")]
    LdcI41 = 0x17,
    #[strum(serialize = "ldc.i4.2")]
    LdcI42 = 0x18,
    #[strum(serialize = "ldc.i4.3")]
    LdcI43 = 0x19,
    #[strum(serialize = "ldc.i4.4")]
    LdcI44 = 0x1A,
    #[strum(serialize = "ldc.i4.5")]
    LdcI45 = 0x1B,
    #[strum(serialize = "ldc.i4.6")]
    LdcI46 = 0x1C,
    #[strum(serialize = "ldc.i4.7")]
    LdcI47 = 0x1D,
    #[strum(serialize = "ldc.i4.8")]
    LdcI48 = 0x1E,
    #[strum(serialize = "ldc.i4.s")]
    LdcI4S = 0x1F,
    #[strum(serialize = "ldc.i4")]
    LdcI4 = 0x20,
    #[strum(serialize = "ldc.i8")]
    LdcI8 = 0x21,
    #[strum(serialize = "ldc.r4")]
    LdcR4 = 0x22,
    #[strum(serialize = "ldc.r8")]
    LdcR8 = 0x23,
    #[strum(serialize = "dup")]
    Dup = 0x25,
    #[strum(serialize = "pop")]
    Pop = 0x26,
    #[strum(serialize = "call")]
    Call = 0x28,
    #[strum(serialize = "ret")]
    Ret = 0x2A,
    #[strum(serialize = "br.s")]
    BrS = 0x2B,
    #[strum(serialize = "brfalse.s")]
    BrfalseS = 0x2C,
    #[strum(serialize = "brtrue.s")]
    BrtrueS = 0x2D,
    #[strum(serialize = "beq.s")]
    BeqS = 0x2E,
    #[strum(serialize = "bge.s")]
    BgeS = 0x2F,
    #[strum(serialize = "bgt.s")]
    BgtS = 0x30,
    #[strum(serialize = "ble.s")]
    BleS = 0x31,
    #[strum(serialize = "blt.s")]
    BltS = 0x32,
    #[strum(serialize = "bne.un.s")]
    BneUnS = 0x33,
    #[strum(serialize = "br")]
    Br = 0x38,
    #[strum(serialize = "brfalse")]
    Brfalse = 0x39,
    #[strum(serialize = "brtrue")]
    Brtrue = 0x3A,
    #[strum(serialize = "beq")]
    Beq = 0x3B,
    #[strum(serialize = "bge")]
    Bge = 0x3C,
    #[strum(serialize = "bgt")]
    Bgt = 0x3D,
    #[strum(serialize = "ble")]
    Ble = 0x3E,
    #[strum(serialize = "blt")]
    Blt = 0x3F,
    #[strum(serialize = "bne.un")]
    BneUn = 0x40,
    #[strum(serialize = "switch")]
    Switch = 0x45,
    #[strum(serialize = "add")]
    Add = 0x58,
    #[strum(serialize = "sub")]
    Sub = 0x59,
    #[strum(serialize = "mul")]
    Mul = 0x5A,
    #[strum(serialize = "div")]
    Div = 0x5B,
    #[strum(serialize = "rem")]
    Rem = 0x5D,
    #[strum(serialize = "and")]
    And = 0x5F,
    #[strum(serialize = "or")]
    Or = 0x60,
    #[strum(serialize = "xor")]
    Xor = 0x61,
    #[strum(serialize = "shl")]
    Shl = 0x62,
    #[strum(serialize = "shr")]
    Shr = 0x63,
    #[strum(serialize = "neg")]
    Neg = 0x65,
    #[strum(serialize = "not")]
    Not = 0x66,
    #[strum(serialize = "callvirt")]
    Callvirt = 0x6F,
    #[strum(serialize = "ldstr")]
    Ldstr = 0x72,
    #[strum(serialize = "newobj")]
    Newobj = 0x73,
    #[strum(serialize = "throw")]
    Throw = 0x7A,
    #[strum(serialize = "ldfld")]
    Ldfld = 0x7B,
    #[strum(serialize = "ldflda")]
    Ldflda = 0x7C,
    #[strum(serialize = "stfld")]
    Stfld = 0x7D,
    #[strum(serialize = "ldsfld")]
    Ldsfld = 0x7E,
    #[strum(serialize = "ldsflda")]
    Ldsflda = 0x7F,
    #[strum(serialize = "stsfld")]
    Stsfld = 0x80,
    #[strum(serialize = "box")]
    Box = 0x8C,
    #[strum(serialize = "endfinally")]
    Endfinally = 0xDC,
    #[strum(serialize = "leave")]
    Leave = 0xDD,
    #[strum(serialize = "leave.s")]
    LeaveS = 0xDE,
    #[strum(serialize = "ceq")]
    Ceq = 0xFE01,
    #[strum(serialize = "cgt")]
    Cgt = 0xFE02,
    #[strum(serialize = "clt")]
    Clt = 0xFE04,
    #[strum(serialize = "ldarg")]
    Ldarg = 0xFE09,
    #[strum(serialize = "ldarga")]
    Ldarga = 0xFE0A,
    #[strum(serialize = "starg")]
    Starg = 0xFE0B,
    #[strum(serialize = "ldloc")]
    Ldloc = 0xFE0C,
    #[strum(serialize = "ldloca")]
    Ldloca = 0xFE0D,
    #[strum(serialize = "stloc")]
    Stloc = 0xFE0E,
}

impl Code {
    /// The ECMA-335 encoding, `0xFExx` for two-byte opcodes.
    #[must_use]
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Returns `true` for opcodes encoded behind the `0xFE` prefix.
    #[must_use]
    pub fn is_prefixed(self) -> bool {
        self.value() > 0xFF
    }

    /// Human-readable mnemonic, e.g. `"ldloc.s"`.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Returns `true` for the compact local forms that imply or index their local.
    ///
    /// These never reach the rewriter; the macro normalizer expands them first.
    #[must_use]
    pub fn is_local_macro(self) -> bool {
        matches!(
            self,
            Code::Ldloc0
                | Code::Ldloc1
                | Code::Ldloc2
                | Code::Ldloc3
                | Code::Stloc0
                | Code::Stloc1
                | Code::Stloc2
                | Code::Stloc3
                | Code::LdlocS
                | Code::LdlocaS
                | Code::StlocS
        )
    }
}

/// Immediate value embedded in an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
}

/// Operand of an [`Instruction`].
///
/// [`Operand::LocalIndex`] only appears in compact bodies; [`Operand::Local`] only in
/// normalized ones. A rewritten body holds [`Operand::Field`] where its locals used to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Immediate value (constant embedded in instruction)
    Immediate(Immediate),
    /// Branch target offset
    Target(u32),
    /// Switch table of branch target offsets
    Switch(Vec<u32>),
    /// Metadata token reference
    Token(Token),
    /// Method argument index
    Argument(u16),
    /// Local variable index, as encoded in the IL stream
    LocalIndex(u16),
    /// Local variable handle
    Local(LocalId),
    /// A resolved field
    Field(FieldRc),
}

impl Operand {
    /// The local handle, if this operand references a local.
    #[must_use]
    pub fn as_local(&self) -> Option<LocalId> {
        match self {
            Operand::Local(id) => Some(*id),
            _ => None,
        }
    }

    /// The resolved field, if this operand references one.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldRc> {
        match self {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(Immediate::Int8(v)) => write!(f, "{v}"),
            Operand::Immediate(Immediate::Int32(v)) => write!(f, "{v}"),
            Operand::Immediate(Immediate::Int64(v)) => write!(f, "{v}"),
            Operand::Immediate(Immediate::Float32(v)) => write!(f, "{v}"),
            Operand::Immediate(Immediate::Float64(v)) => write!(f, "{v}"),
            Operand::Target(t) => write!(f, "IL_{t:04x}"),
            Operand::Switch(targets) => {
                f.write_str("(")?;
                for (i, t) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "IL_{t:04x}")?;
                }
                f.write_str(")")
            }
            Operand::Token(t) => write!(f, "{t}"),
            Operand::Argument(a) => write!(f, "A_{a}"),
            Operand::LocalIndex(l) => write!(f, "V_{l}"),
            Operand::Local(id) => write!(f, "{id}"),
            Operand::Field(field) => f.write_str(&field.name),
        }
    }
}

/// A single CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of this instruction within the method body
    pub offset: u32,
    /// The opcode
    pub code: Code,
    /// The operand data for this instruction
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction at offset 0.
    #[must_use]
    pub fn new(code: Code, operand: Operand) -> Self {
        Instruction {
            offset: 0,
            code,
            operand,
        }
    }

    /// Creates an instruction without an operand.
    #[must_use]
    pub fn simple(code: Code) -> Self {
        Self::new(code, Operand::None)
    }

    /// `ldloc` of a local handle.
    #[must_use]
    pub fn ldloc(local: LocalId) -> Self {
        Self::new(Code::Ldloc, Operand::Local(local))
    }

    /// `ldloca` of a local handle.
    #[must_use]
    pub fn ldloca(local: LocalId) -> Self {
        Self::new(Code::Ldloca, Operand::Local(local))
    }

    /// `stloc` of a local handle.
    #[must_use]
    pub fn stloc(local: LocalId) -> Self {
        Self::new(Code::Stloc, Operand::Local(local))
    }

    /// `ldc.i4` of a 32-bit constant.
    #[must_use]
    pub fn ldc_i4(value: i32) -> Self {
        Self::new(Code::LdcI4, Operand::Immediate(Immediate::Int32(value)))
    }

    /// Sets the offset, builder style.
    #[must_use]
    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Returns `true` if the operand references a local handle.
    #[must_use]
    pub fn references_local(&self) -> bool {
        matches!(self.operand, Operand::Local(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.code)?;
        if !matches!(self.operand, Operand::None) {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_code_encoding() {
        assert_eq!(Code::Ldloc0.value(), 0x06);
        assert_eq!(Code::Ldsfld.value(), 0x7E);
        assert_eq!(Code::Stloc.value(), 0xFE0E);
        assert!(Code::Ldloca.is_prefixed());
        assert!(!Code::Stsfld.is_prefixed());
    }

    #[test]
    fn test_code_mnemonics_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in Code::iter() {
            assert!(seen.insert(code.mnemonic()), "duplicate {}", code);
        }
        assert_eq!(Code::LdlocaS.mnemonic(), "ldloca.s");
        assert_eq!(Code::LdcI4M1.to_string(), "ldc.i4.m1");
    }

    #[test]
    fn test_local_macro_forms() {
        let macros: Vec<Code> = Code::iter().filter(|c| c.is_local_macro()).collect();
        assert_eq!(macros.len(), 11);
        assert!(!Code::Ldloc.is_local_macro());
        assert!(!Code::Ldsfld.is_local_macro());
    }

    #[test]
    fn test_instruction_display() {
        let instr = Instruction::new(Code::LdlocS, Operand::LocalIndex(4)).at(0x12);
        assert_eq!(instr.to_string(), "IL_0012: ldloc.s V_4");
        assert_eq!(Instruction::simple(Code::Ret).at(3).to_string(), "IL_0003: ret");
        assert_eq!(Instruction::ldc_i4(-7).to_string(), "IL_0000: ldc.i4 -7");
    }

    #[test]
    fn test_instruction_references_local() {
        let local = LocalId::new(0);
        assert!(Instruction::stloc(local).references_local());
        assert_eq!(Instruction::ldloca(local).operand.as_local(), Some(local));
        assert!(!Instruction::new(Code::LdlocS, Operand::LocalIndex(0)).references_local());
        assert!(Operand::None.as_field().is_none());
    }
}
