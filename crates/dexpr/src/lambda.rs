//! The compiled artifact: a bound expression tree over a parameter set.

use std::sync::Arc;

use crate::error::{ConfigurationError, InterpreterError, InvocationError};
use crate::eval::{evaluate, Value};
use crate::tree::TypedExpr;
use crate::types::{Conversion, Type};

/// A declared parameter: name, static type, and (for `eval`) a value.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Arc<str>,
    pub ty: Type,
    pub value: Option<Value>,
}

impl Parameter {
    /// Declare a parameter by name and type, for `parse`.
    pub fn new(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
        }
    }

    /// Declare a parameter with a value, for `eval`; the static type is
    /// the value's runtime type.
    pub fn with_value(name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.runtime_type();
        Self {
            name: name.into(),
            ty,
            value: Some(value),
        }
    }
}

/// A parsed, bound, reusable expression.
///
/// Immutable after construction; `invoke` is safe to call concurrently.
#[derive(Debug, Clone)]
pub struct Lambda {
    tree: Arc<TypedExpr>,
    text: Arc<str>,
    declared: Arc<[Parameter]>,
    used_parameters: Arc<[Parameter]>,
    used_types: Arc<[String]>,
    used_identifiers: Arc<[String]>,
    return_type: Type,
}

impl Lambda {
    pub(crate) fn new(
        tree: TypedExpr,
        text: &str,
        declared: Vec<Parameter>,
        used_parameters: Vec<Parameter>,
        used_types: Vec<String>,
        used_identifiers: Vec<String>,
    ) -> Self {
        let return_type = tree.ty.clone();
        Self {
            tree: Arc::new(tree),
            text: Arc::from(text),
            declared: declared.into(),
            used_parameters: used_parameters.into(),
            used_types: used_types.into(),
            used_identifiers: used_identifiers.into(),
            return_type,
        }
    }

    /// The source text this lambda was parsed from.
    pub fn expression_text(&self) -> &str {
        &self.text
    }

    /// The static type of the expression root.
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// The parameters declared at parse time, in declaration order.
    pub fn declared_parameters(&self) -> &[Parameter] {
        &self.declared
    }

    /// The declared parameters the expression actually references. Always
    /// a subset of `declared_parameters`.
    pub fn used_parameters(&self) -> &[Parameter] {
        &self.used_parameters
    }

    /// Aliases of the registered types the expression references.
    pub fn used_types(&self) -> &[String] {
        &self.used_types
    }

    /// Names of the registered identifiers the expression references.
    pub fn used_identifiers(&self) -> &[String] {
        &self.used_identifiers
    }

    /// Invoke with one value per declared parameter, in declaration
    /// order. Each argument must convert implicitly to the declared type.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, InterpreterError> {
        if args.len() != self.declared.len() {
            return Err(
                ConfigurationError::argument_count(self.declared.len(), args.len()).into(),
            );
        }

        let mut frame = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(self.declared.iter()) {
            frame.push(coerce_argument(arg, param)?);
        }

        self.invoke_frame(&mut frame)
    }

    /// Invoke using the values the declared parameters carry. Parameters
    /// without a value invoke as null.
    pub fn invoke_with_declared(&self) -> Result<Value, InterpreterError> {
        let mut frame: Vec<Value> = self
            .declared
            .iter()
            .map(|p| p.value.clone().unwrap_or(Value::Null))
            .collect();
        self.invoke_frame(&mut frame)
    }

    fn invoke_frame(&self, frame: &mut [Value]) -> Result<Value, InterpreterError> {
        evaluate(&self.tree, frame)
            .map_err(|e| InterpreterError::Invocation(InvocationError::from(e)))
    }

    /// A typed nullary closure over this lambda.
    pub fn as_fn0<R>(&self) -> impl Fn() -> Result<R, InterpreterError>
    where
        R: TryFrom<Value>,
    {
        let lambda = self.clone();
        move || extract(lambda.invoke(&[])?)
    }

    /// A typed unary closure over this lambda.
    pub fn as_fn1<A, R>(&self) -> impl Fn(A) -> Result<R, InterpreterError>
    where
        A: Into<Value>,
        R: TryFrom<Value>,
    {
        let lambda = self.clone();
        move |a| extract(lambda.invoke(&[a.into()])?)
    }

    /// A typed binary closure over this lambda.
    pub fn as_fn2<A, B, R>(&self) -> impl Fn(A, B) -> Result<R, InterpreterError>
    where
        A: Into<Value>,
        B: Into<Value>,
        R: TryFrom<Value>,
    {
        let lambda = self.clone();
        move |a, b| extract(lambda.invoke(&[a.into(), b.into()])?)
    }

    /// A typed ternary closure over this lambda.
    pub fn as_fn3<A, B, C, R>(&self) -> impl Fn(A, B, C) -> Result<R, InterpreterError>
    where
        A: Into<Value>,
        B: Into<Value>,
        C: Into<Value>,
        R: TryFrom<Value>,
    {
        let lambda = self.clone();
        move |a, b, c| extract(lambda.invoke(&[a.into(), b.into(), c.into()])?)
    }
}

/// Convert an invocation argument to the declared parameter type.
fn coerce_argument(arg: &Value, param: &Parameter) -> Result<Value, InterpreterError> {
    let actual = arg.runtime_type();
    match crate::types::conversion(&actual, &param.ty) {
        Conversion::Identity => Ok(arg.clone()),
        Conversion::Implicit => arg
            .convert_to(&param.ty)
            .map_err(|e| InterpreterError::Invocation(InvocationError::from(e))),
        _ => Err(InterpreterError::Invocation(InvocationError::from(
            crate::eval::EvalError::invalid_conversion(
                &actual.display_name(),
                &param.ty.display_name(),
            ),
        ))),
    }
}

fn extract<R: TryFrom<Value>>(value: Value) -> Result<R, InterpreterError> {
    R::try_from(value.clone()).map_err(|_| {
        InterpreterError::Invocation(InvocationError::from(
            crate::eval::EvalError::invalid_conversion(&value.type_name(), "requested type"),
        ))
    })
}
