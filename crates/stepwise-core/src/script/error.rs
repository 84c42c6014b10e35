//! Errors raised by the block language.

use thiserror::Error;

/// A failure while parsing or running a code block.
///
/// Parse and runtime failures share one type: blocks are parsed lazily, right
/// before they run, so both surface at the same point of a render.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The block source is not valid. `line` is relative to the block body.
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A name was read before any block assigned it.
    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    /// A call named something that is not a built-in.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// An operator or built-in received values of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic left the 64-bit range.
    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    /// A built-in was called with the wrong number of arguments.
    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
}
