//! Evaluation error types.

use std::fmt;

/// An error that occurred while evaluating a compiled expression.
#[derive(Debug, Clone)]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Division or modulo by zero.
    DivisionByZero,
    /// Integer overflow.
    Overflow,
    /// Member access or method call on a null receiver.
    NullReference,
    /// A dynamic member lookup failed on an instance that bound as
    /// dynamic-capable.
    DynamicBinding,
    /// A runtime conversion (cast, downcast) failed.
    InvalidConversion,
    /// Index outside the bounds of the target.
    IndexOutOfBounds,
    /// Invalid argument passed to a host member.
    InvalidArgument,
    /// An error raised by host code.
    Host,
    /// Internal error (unexpected state).
    Internal,
}

impl EvalError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Create a division by zero error.
    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    /// Create an overflow error.
    pub fn overflow(op: &str) -> Self {
        Self::new(
            EvalErrorKind::Overflow,
            format!("arithmetic overflow in '{}'", op),
        )
    }

    /// Create a null reference error.
    pub fn null_reference(what: &str) -> Self {
        Self::new(
            EvalErrorKind::NullReference,
            format!("null reference in {}", what),
        )
    }

    /// Create a dynamic binding error.
    pub fn dynamic_binding(name: &str, type_name: &str) -> Self {
        Self::new(
            EvalErrorKind::DynamicBinding,
            format!("no dynamic member '{}' on '{}'", name, type_name),
        )
    }

    /// Create an invalid conversion error.
    pub fn invalid_conversion(from: &str, to: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidConversion,
            format!("cannot convert '{}' to '{}'", from, to),
        )
    }

    /// Create an index out of bounds error.
    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} out of bounds for length {}", index, len),
        )
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    /// Create a host error. Used by host members to surface their own
    /// failures; the message passes through unchanged.
    pub fn host(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Host, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<&str> for EvalError {
    fn from(s: &str) -> Self {
        Self::new(EvalErrorKind::Host, s)
    }
}

impl From<String> for EvalError {
    fn from(s: String) -> Self {
        Self::new(EvalErrorKind::Host, s)
    }
}
