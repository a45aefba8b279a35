//! dexpr: an embeddable expression interpreter.
//!
//! Expressions are written in a C-family surface syntax, bound against
//! host-provided values and types, and compiled into a reusable
//! [`Lambda`].
//!
//! # Quick Start
//!
//! ```
//! use dexpr::Interpreter;
//! use dexpr::Value;
//!
//! let mut interpreter = Interpreter::new();
//! interpreter.set_variable("x", 8).unwrap();
//!
//! let result = interpreter.eval("x + 2", &[]).unwrap();
//! assert_eq!(result, Value::Int32(10));
//! ```
//!
//! # Reusable lambdas
//!
//! ```
//! use dexpr::{Interpreter, Parameter, Type, Value};
//!
//! let interpreter = Interpreter::new();
//! let lambda = interpreter
//!     .parse("a * 2 + 1", &[Parameter::new("a", Type::Int32)])
//!     .unwrap();
//!
//! assert_eq!(lambda.invoke(&[Value::Int32(20)]).unwrap(), Value::Int32(41));
//! let double = lambda.as_fn1::<i32, i32>();
//! assert_eq!(double(5).unwrap(), 11);
//! ```
//!
//! # Architecture
//!
//! - `dexpr-parser` lexes and parses the text into an untyped AST
//! - the binder resolves names, members, overloads and conversions
//!   against the registries and produces a typed expression tree
//! - the visitor pipeline rewrites/validates the tree (the default
//!   pipeline forbids the reflection surface)
//! - the tree-walking evaluator executes the tree over a parameter frame
//!
//! Host objects implement [`HostObject`]; objects with ad-hoc property
//! bags also implement [`DynamicObject`] and register their type as
//! dynamic-capable, which makes unresolved member accesses late-bound.

mod binder;
mod detect;
mod error;
mod eval;
mod interpreter;
mod lambda;
mod reflect;
mod registry;
mod stdlib;
mod tree;
mod types;
mod visitors;

pub use binder::{bind, ParserArguments};
pub use detect::IdentifiersInfo;
pub use error::{
    ConfigurationError, ConfigurationErrorKind, InterpreterError, InvocationError, ParseError,
    ParseErrorKind,
};
pub use eval::{
    evaluate, Decimal, EvalError, EvalErrorKind, FunctionValue, HostRef, NativeFn, Value,
    ValueError,
};
pub use interpreter::{Interpreter, InterpreterOptions};
pub use lambda::{Lambda, Parameter};
pub use reflect::{
    DynamicObject, Getter, HostObject, IndexGetter, IndexSetter, Indexer, Member, Method,
    MethodBody, Property, ReferenceType, Reflection, Setter,
};
pub use registry::{AssignmentPolicy, Identifier, Settings, RESERVED_WORDS};
pub use tree::{AssignTarget, BinOp, CallTarget, CastKind, ExprKind, TypedExpr, UnOp};
pub use types::{conversion, promote_numeric, Conversion, FunctionSig, Type};
pub use visitors::{DisableReflection, Visitor, VisitorSet, DISABLE_REFLECTION};

// The overload resolver is part of the reflection capability surface.
pub use binder::overload::{resolve_overload, OverloadError};
