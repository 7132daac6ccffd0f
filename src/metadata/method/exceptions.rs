use bitflags::bitflags;

use crate::metadata::token::Token;

bitflags! {
    /// Kind of an exception handling clause (II.25.4.6)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause
        const FILTER = 0x0001;
        /// A finally clause
        const FINALLY = 0x0002;
        /// Fault clause (finally that is called on exception only)
        const FAULT = 0x0004;
    }
}

/// One exception handling clause of a method body.
///
/// Offsets refer to [`crate::assembly::Instruction::offset`] values of the same body. The
/// locals-to-fields transform never touches these regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Flags describing the type of exception handler (catch, filter, finally, fault)
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body
    pub try_offset: u32,
    /// Length in bytes of the try block
    pub try_length: u32,
    /// Location of the handler for this try block
    pub handler_offset: u32,
    /// Size of the handler code in bytes
    pub handler_length: u32,
    /// If flags == EXCEPTION, the type this handler catches
    pub class_token: Option<Token>,
    /// Offset in method body for filter-based exception handler
    pub filter_offset: u32,
}
