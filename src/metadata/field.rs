//! Field declarations.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

use crate::metadata::{signatures::SignatureField, token::Token};

/// A reference to a field
pub type FieldRc = Arc<Field>;

bitflags! {
    /// Field attribute flags (II.23.1.5)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u32 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this Assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessibly by anyone in the Assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessibly by sub-types anywhere, plus anyone in assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessibly by anyone who has visibility to this scope
        const PUBLIC = 0x0006;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Field can only be initialized, not written to after init
        const INIT_ONLY = 0x0020;
        /// Value is compile time constant
        const LITERAL = 0x0040;
        /// Reserved (to indicate this field should not be serialized when type is remoted)
        const NOT_SERIALIZED = 0x0080;
        /// Field is special
        const SPECIAL_NAME = 0x0200;
    }
}

impl FieldAttributes {
    /// Mask of the 3 access bits.
    pub const FIELD_ACCESS_MASK: u32 = 0x0007;

    /// The access bits only, e.g. `PUBLIC` for a public static field.
    #[must_use]
    pub fn access(&self) -> FieldAttributes {
        FieldAttributes::from_bits_truncate(self.bits() & Self::FIELD_ACCESS_MASK)
    }

    /// Returns `true` for a public field declared on its type.
    #[must_use]
    pub fn is_public_static(&self) -> bool {
        self.access() == FieldAttributes::PUBLIC && self.contains(FieldAttributes::STATIC)
    }
}

/// A field declared on a type.
///
/// Storage slots created by the transform are `PUBLIC | STATIC` fields of the module's global
/// type whose signature equals the declared type of the local they replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The token of this field
    pub token: Token,
    /// The field flags
    pub flags: FieldAttributes,
    /// The name of this field
    pub name: String,
    /// The signature of this field
    pub signature: SignatureField,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.signature.base, self.name)
    }
}
