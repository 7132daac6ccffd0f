//! Method bodies, locals and exception handling clauses.

mod body;
mod exceptions;

pub use body::{Local, LocalId, Method, MethodBody};
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
