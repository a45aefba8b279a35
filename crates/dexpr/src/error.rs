//! Error types for parsing, configuration and invocation.

use std::fmt;

use dexpr_parser::Span;
use thiserror::Error;

use crate::eval::{EvalError, EvalErrorKind};
use crate::types::Type;

/// A parse or binding error at a known byte position.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The source span where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an unknown identifier error.
    pub fn unknown_identifier(name: &str, span: Span) -> Self {
        Self::new(ParseErrorKind::UnknownIdentifier(name.to_string()), span)
    }

    /// Create an unknown type error.
    pub fn unknown_type(name: &str, span: Span) -> Self {
        Self::new(ParseErrorKind::UnknownType(name.to_string()), span)
    }

    /// Create an unknown member error.
    pub fn unknown_member(ty: &Type, name: &str, span: Span) -> Self {
        Self::new(
            ParseErrorKind::UnknownMember {
                type_name: ty.display_name(),
                member: name.to_string(),
            },
            span,
        )
    }

    /// Create a no applicable method error.
    pub fn no_applicable_method(name: &str, args: &[Type], span: Span) -> Self {
        Self::new(
            ParseErrorKind::NoApplicableMethod {
                method: name.to_string(),
                arg_types: args.to_vec(),
            },
            span,
        )
    }

    /// Create an ambiguous method error.
    pub fn ambiguous_method(name: &str, candidates: Vec<String>, span: Span) -> Self {
        Self::new(
            ParseErrorKind::AmbiguousMethod {
                method: name.to_string(),
                candidates,
            },
            span,
        )
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: &Type, actual: &Type, span: Span) -> Self {
        Self::new(
            ParseErrorKind::TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
            span,
        )
    }

    /// Create an incompatible operands error.
    pub fn incompatible_operands(op: &str, left: &Type, right: &Type, span: Span) -> Self {
        Self::new(
            ParseErrorKind::IncompatibleOperands {
                op: op.to_string(),
                left: left.clone(),
                right: right.clone(),
            },
            span,
        )
    }

    /// Create an incompatible operand error for a unary operator.
    pub fn incompatible_operand(op: &str, operand: &Type, span: Span) -> Self {
        Self::new(
            ParseErrorKind::IncompatibleOperand {
                op: op.to_string(),
                operand: operand.clone(),
            },
            span,
        )
    }

    /// The error message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.kind, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

impl From<dexpr_parser::ParseError> for ParseError {
    fn from(e: dexpr_parser::ParseError) -> Self {
        Self::new(ParseErrorKind::Syntax(e.message), e.span)
    }
}

/// The kind of parse or binding error.
#[derive(Debug, Clone)]
pub enum ParseErrorKind {
    /// Lexing or grammar failure.
    Syntax(String),
    /// A bare name that is no parameter, identifier or type alias.
    UnknownIdentifier(String),
    /// A type name that is not registered.
    UnknownType(String),
    /// No member with this name on the receiver type.
    UnknownMember { type_name: String, member: String },
    /// No overload accepts the argument types.
    NoApplicableMethod { method: String, arg_types: Vec<Type> },
    /// More than one overload is best.
    AmbiguousMethod {
        method: String,
        candidates: Vec<String>,
    },
    /// The expression type does not conform to the expected type.
    TypeMismatch { expected: Type, actual: Type },
    /// A binary operator rejects its operand types.
    IncompatibleOperands { op: String, left: Type, right: Type },
    /// A unary operator rejects its operand type.
    IncompatibleOperand { op: String, operand: Type },
    /// The conditional branches have no common type.
    NoCommonType { left: Type, right: Type },
    /// A non-function value is being called.
    NotCallable(Type),
    /// A type alias used where a value is required.
    TypeNameAsValue(String),
    /// `=` used while assignment is disabled.
    AssignmentDisabled,
    /// Assignment target is not an l-value.
    NotAnLValue,
    /// Assignment to a registered identifier.
    AssignmentToConstant(String),
    /// The expression reaches the reflection surface while the
    /// reflection-disabling visitor is active.
    ReflectionDisabled,
    /// A numeric literal that fits no lane.
    InvalidLiteral(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Syntax(msg) => write!(f, "{}", msg),
            ParseErrorKind::UnknownIdentifier(name) => {
                write!(f, "unknown identifier '{}'", name)
            }
            ParseErrorKind::UnknownType(name) => write!(f, "unknown type '{}'", name),
            ParseErrorKind::UnknownMember { type_name, member } => {
                write!(f, "no member '{}' on type '{}'", member, type_name)
            }
            ParseErrorKind::NoApplicableMethod { method, arg_types } => {
                let types: Vec<_> = arg_types.iter().map(Type::display_name).collect();
                write!(
                    f,
                    "no applicable overload for '{}' with argument types ({})",
                    method,
                    types.join(", ")
                )
            }
            ParseErrorKind::AmbiguousMethod { method, candidates } => write!(
                f,
                "ambiguous call to '{}' between {}",
                method,
                candidates.join(" and ")
            ),
            ParseErrorKind::TypeMismatch { expected, actual } => write!(
                f,
                "expected type '{}' but found '{}'",
                expected.display_name(),
                actual.display_name()
            ),
            ParseErrorKind::IncompatibleOperands { op, left, right } => write!(
                f,
                "operator '{}' cannot be applied to '{}' and '{}'",
                op,
                left.display_name(),
                right.display_name()
            ),
            ParseErrorKind::IncompatibleOperand { op, operand } => write!(
                f,
                "operator '{}' cannot be applied to '{}'",
                op,
                operand.display_name()
            ),
            ParseErrorKind::NoCommonType { left, right } => write!(
                f,
                "no common type between '{}' and '{}'",
                left.display_name(),
                right.display_name()
            ),
            ParseErrorKind::NotCallable(ty) => {
                write!(f, "value of type '{}' is not callable", ty.display_name())
            }
            ParseErrorKind::TypeNameAsValue(name) => {
                write!(f, "type '{}' cannot be used as a value", name)
            }
            ParseErrorKind::AssignmentDisabled => {
                write!(f, "assignment operators are disabled")
            }
            ParseErrorKind::NotAnLValue => {
                write!(f, "the assignment target is not assignable")
            }
            ParseErrorKind::AssignmentToConstant(name) => {
                write!(f, "cannot assign to the registered identifier '{}'", name)
            }
            ParseErrorKind::ReflectionDisabled => {
                write!(f, "reflection is disabled in this interpreter")
            }
            ParseErrorKind::InvalidLiteral(lit) => {
                write!(f, "invalid literal '{}'", lit)
            }
        }
    }
}

/// Caller misuse of the registration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    pub kind: ConfigurationErrorKind,
}

/// The kind of configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    /// Empty name passed to a registration method.
    EmptyName,
    /// A reserved keyword used as a name.
    ReservedName(String),
    /// Declared parameter count does not match the supplied arguments.
    ArgumentCount { expected: usize, actual: usize },
    /// Two declared parameters share a name.
    DuplicateParameter(String),
}

impl ConfigurationError {
    pub fn empty_name() -> Self {
        Self {
            kind: ConfigurationErrorKind::EmptyName,
        }
    }

    pub fn reserved_name(name: &str) -> Self {
        Self {
            kind: ConfigurationErrorKind::ReservedName(name.to_string()),
        }
    }

    pub fn argument_count(expected: usize, actual: usize) -> Self {
        Self {
            kind: ConfigurationErrorKind::ArgumentCount { expected, actual },
        }
    }

    pub fn duplicate_parameter(name: &str) -> Self {
        Self {
            kind: ConfigurationErrorKind::DuplicateParameter(name.to_string()),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigurationErrorKind::EmptyName => write!(f, "name must not be empty"),
            ConfigurationErrorKind::ReservedName(name) => {
                write!(f, "'{}' is a reserved word", name)
            }
            ConfigurationErrorKind::ArgumentCount { expected, actual } => write!(
                f,
                "expected {} argument(s), got {}",
                expected, actual
            ),
            ConfigurationErrorKind::DuplicateParameter(name) => {
                write!(f, "duplicate parameter '{}'", name)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// A failure during execution of a compiled expression. The original
/// evaluation error propagates unchanged.
#[derive(Debug, Clone)]
pub struct InvocationError {
    /// The underlying evaluation error.
    pub error: EvalError,
}

impl InvocationError {
    /// True when the failure was a dynamic member lookup on an instance
    /// that bound as dynamic-capable.
    pub fn is_dynamic_binding(&self) -> bool {
        self.error.kind == EvalErrorKind::DynamicBinding
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for InvocationError {}

impl From<EvalError> for InvocationError {
    fn from(error: EvalError) -> Self {
        Self { error }
    }
}

/// Any error the interpreter surface can return.
#[derive(Debug, Clone, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl InterpreterError {
    /// The parse error, if this is one.
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            InterpreterError::Parse(e) => Some(e),
            _ => None,
        }
    }

    /// The invocation error, if this is one.
    pub fn as_invocation(&self) -> Option<&InvocationError> {
        match self {
            InterpreterError::Invocation(e) => Some(e),
            _ => None,
        }
    }
}
