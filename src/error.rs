use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! contract_violation {
    // Single string version
    ($msg:expr) => {
        crate::Error::ContractViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::ContractViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// None of these errors is retried by the library. A failure while rewriting a method aborts the
/// rewrite of that method only and is handed back to the caller, which decides whether to stop the
/// whole run or to skip the method (see [`crate::transform::LocalsToFieldsConfig::fail_fast`]).
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::ContractViolation`] - A method body was not in the normalized form the rewriter expects
/// - [`Error::Malformed`] - A compact instruction form references a local or argument that does not exist
///
/// ## Naming Errors
/// - [`Error::NameExhausted`] - The name generator could not produce a fresh name
/// - [`Error::DuplicateName`] - The declaration container already holds a field with that name
///
/// ## Declaration Errors
/// - [`Error::DuplicateToken`] - The declaration container already holds a field with that token
/// - [`Error::RowsExhausted`] - The `Field` table has no row left for another slot
///
/// ## Runtime Errors
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::MethodFailed`] - A method-level error annotated with the method it came from
///
/// # Examples
///
/// ```rust
/// use cilslot::Error;
///
/// fn describe(err: &Error) -> &'static str {
///     match err {
///         Error::ContractViolation { .. } => "body was not normalized",
///         Error::NameExhausted(_) | Error::DuplicateName(_) => "naming failed",
///         _ => "other",
///     }
/// }
/// # let _ = describe;
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An instruction did not match the shape the rewriter requires.
    ///
    /// Raised for a local operand on an opcode outside the three local-access kinds, a
    /// local-access opcode without a local operand, a compact macro form that should have been
    /// expanded before the rewrite, or a local operand naming a local the body does not declare.
    /// This is a programming error upstream of the rewriter and is never recovered from.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the offending instruction
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Contract violation - {file}:{line}: {message}")]
    ContractViolation {
        /// The message to be printed for the ContractViolation error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The method body is damaged and could not be normalized.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The name generator gave up after the given number of attempts.
    #[error("Failed to generate a fresh name after {0} attempts")]
    NameExhausted(usize),

    /// A field with this name is already declared on the global type.
    #[error("A field named '{0}' is already declared")]
    DuplicateName(String),

    /// A field with this token is already declared on the global type.
    #[error("A field with token {0} is already declared")]
    DuplicateToken(Token),

    /// Every row a token can address is taken.
    #[error("No Field row left after {:#x}", Token::MAX_ROW)]
    RowsExhausted,

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,

    /// Rewriting a specific method failed.
    ///
    /// Produced by the pass driver to tie the underlying error to the method token.
    #[error("Method {method} - {source}")]
    MethodFailed {
        /// The method whose rewrite failed
        method: Token,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}
