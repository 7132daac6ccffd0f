//! Metadata tokens identifying methods and fields.
//!
//! A token packs the metadata table id into the high byte and the 1-based row into the low
//! 24 bits, exactly as ECMA-335 II.22 encodes them. The transform only needs two tables:
//! `MethodDef` to name the method being rewritten and `Field` for every storage slot it creates.

use std::fmt;

/// A 32-bit metadata token (`table << 24 | row`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Table id of the `Field` table.
    pub const FIELD_TABLE: u8 = 0x04;
    /// Table id of the `MethodDef` table.
    pub const METHODDEF_TABLE: u8 = 0x06;
    /// Largest row a token can address.
    pub const MAX_ROW: u32 = 0x00FF_FFFF;

    /// Creates a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Builds a token from a table id and a row.
    ///
    /// Rows wider than 24 bits are truncated.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & Self::MAX_ROW))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id (high byte).
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row (low 24 bits).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & Self::MAX_ROW
    }

    /// Returns `true` for the null token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_parts() {
        let token = Token::from_parts(Token::FIELD_TABLE, 7);
        assert_eq!(token.value(), 0x0400_0007);
        assert_eq!(token.table(), Token::FIELD_TABLE);
        assert_eq!(token.row(), 7);
        assert!(!token.is_null());
    }

    #[test]
    fn test_token_row_truncated() {
        let token = Token::from_parts(Token::METHODDEF_TABLE, 0x0100_0001);
        assert_eq!(token.table(), Token::METHODDEF_TABLE);
        assert_eq!(token.row(), 1);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token(0x06000001)), "0x06000001");
        let debug_str = format!("{:?}", Token(0x04000002));
        assert!(debug_str.contains("table: 0x04"));
        assert!(debug_str.contains("row: 2"));
    }

    #[test]
    fn test_token_conversion() {
        let token: Token = 0x06000003u32.into();
        let raw: u32 = token.into();
        assert_eq!(raw, 0x06000003);
        assert!(Token::new(0).is_null());
    }
}
