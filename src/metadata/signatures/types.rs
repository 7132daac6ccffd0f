use std::fmt;

use crate::metadata::token::Token;

/// Element types of a signature (II.23.1.16), limited to what local and field declarations use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// System.String
    String,
    /// System.Object
    Object,
    /// A pointer to a type
    Ptr(Box<TypeSignature>),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// A pinned type
    Pinned(Box<TypeSignature>),
    /// CIL value-type
    ValueType(Token),
    /// CIL Class
    Class(Token),
    /// Single dimension array
    SzArray(Box<TypeSignature>),
    /// Generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Generic type parameter
    GenericParamType(u32),
    /// Generic method parameter
    GenericParamMethod(u32),
    /// Type is referenced during runtime
    TypedByRef,
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Unknown => f.write_str("?"),
            TypeSignature::Boolean => f.write_str("bool"),
            TypeSignature::Char => f.write_str("char"),
            TypeSignature::I1 => f.write_str("int8"),
            TypeSignature::U1 => f.write_str("uint8"),
            TypeSignature::I2 => f.write_str("int16"),
            TypeSignature::U2 => f.write_str("uint16"),
            TypeSignature::I4 => f.write_str("int32"),
            TypeSignature::U4 => f.write_str("uint32"),
            TypeSignature::I8 => f.write_str("int64"),
            TypeSignature::U8 => f.write_str("uint64"),
            TypeSignature::R4 => f.write_str("float32"),
            TypeSignature::R8 => f.write_str("float64"),
            TypeSignature::I => f.write_str("native int"),
            TypeSignature::U => f.write_str("native uint"),
            TypeSignature::String => f.write_str("string"),
            TypeSignature::Object => f.write_str("object"),
            TypeSignature::Ptr(inner) => write!(f, "{inner}*"),
            TypeSignature::ByRef(inner) => write!(f, "{inner}&"),
            TypeSignature::Pinned(inner) => write!(f, "{inner} pinned"),
            TypeSignature::ValueType(token) => write!(f, "valuetype {token}"),
            TypeSignature::Class(token) => write!(f, "class {token}"),
            TypeSignature::SzArray(inner) => write!(f, "{inner}[]"),
            TypeSignature::GenericInst(base, args) => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            TypeSignature::GenericParamType(index) => write!(f, "!{index}"),
            TypeSignature::GenericParamMethod(index) => write!(f, "!!{index}"),
            TypeSignature::TypedByRef => f.write_str("typedref"),
        }
    }
}

/// Represents a local variable in a method body (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureLocalVariable {
    /// Custom modifiers
    pub modifiers: Vec<Token>,
    /// Is passed by reference
    pub is_byref: bool,
    /// This variable is pinned
    pub is_pinned: bool,
    /// The signature of this variable
    pub base: TypeSignature,
}

impl SignatureLocalVariable {
    /// A plain local of the given type, no modifiers.
    #[must_use]
    pub fn new(base: TypeSignature) -> Self {
        SignatureLocalVariable {
            modifiers: Vec::new(),
            is_byref: false,
            is_pinned: false,
            base,
        }
    }

    /// The full declared type, with the by-ref and pinned markers folded back into the
    /// signature the way they are encoded in the blob.
    #[must_use]
    pub fn declared_type(&self) -> TypeSignature {
        let mut ty = self.base.clone();
        if self.is_byref {
            ty = TypeSignature::ByRef(Box::new(ty));
        }
        if self.is_pinned {
            ty = TypeSignature::Pinned(Box::new(ty));
        }
        ty
    }
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureField {
    /// The custom modifiers for this field - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<Token>,
    /// The signature of this type
    pub base: TypeSignature,
}

impl SignatureField {
    /// Builds the field signature that declares exactly the type of `local`.
    ///
    /// Modifiers are carried over and the by-ref/pinned markers stay part of the type, so
    /// [`SignatureField::matches_local`] holds for the result.
    #[must_use]
    pub fn from_local(local: &SignatureLocalVariable) -> Self {
        SignatureField {
            modifiers: local.modifiers.clone(),
            base: local.declared_type(),
        }
    }

    /// Returns `true` if this field declares the same type as `local`.
    #[must_use]
    pub fn matches_local(&self, local: &SignatureLocalVariable) -> bool {
        self.modifiers == local.modifiers && self.base == local.declared_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_plain_local() {
        let local = SignatureLocalVariable::new(TypeSignature::I4);
        let field = SignatureField::from_local(&local);
        assert_eq!(field.base, TypeSignature::I4);
        assert!(field.modifiers.is_empty());
        assert!(field.matches_local(&local));
    }

    #[test]
    fn test_field_keeps_byref_and_pinned() {
        let local = SignatureLocalVariable {
            modifiers: vec![Token::new(0x01000003)],
            is_byref: true,
            is_pinned: true,
            base: TypeSignature::U1,
        };
        let field = SignatureField::from_local(&local);
        assert_eq!(
            field.base,
            TypeSignature::Pinned(Box::new(TypeSignature::ByRef(Box::new(TypeSignature::U1))))
        );
        assert_eq!(field.modifiers, vec![Token::new(0x01000003)]);
        assert!(field.matches_local(&local));
        assert!(!field.matches_local(&SignatureLocalVariable::new(TypeSignature::U1)));
    }

    #[test]
    fn test_signature_display() {
        let generic = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(Token::new(0x01000010))),
            vec![TypeSignature::I4, TypeSignature::String],
        );
        assert_eq!(generic.to_string(), "class 0x01000010<int32, string>");
        assert_eq!(
            TypeSignature::SzArray(Box::new(TypeSignature::U1)).to_string(),
            "uint8[]"
        );
    }
}
