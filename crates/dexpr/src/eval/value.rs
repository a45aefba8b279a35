//! Runtime values.
//!
//! `Value` represents every value that can exist during evaluation:
//! primitives, strings, host objects, callable values, and type handles.
//!
//! # Creating Values
//!
//! Use Rust's standard `Into` trait to create values from native types:
//!
//! ```rust
//! use dexpr::Value;
//!
//! let v: Value = 42.into();       // i32 -> Value::Int32
//! let v: Value = 42i64.into();    // i64 -> Value::Int64
//! let v: Value = true.into();
//! let v: Value = "hello".into();
//! ```
//!
//! # Extracting Values
//!
//! Use `TryFrom` to extract native types:
//!
//! ```rust
//! use dexpr::Value;
//!
//! let v = Value::Int32(42);
//! let i = i32::try_from(v).unwrap();
//! assert_eq!(i, 42);
//! ```

use std::fmt;
use std::sync::Arc;

use super::error::EvalError;
use crate::reflect::HostObject;
use crate::types::{FunctionSig, Type};

/// Error returned when converting from Value to a specific type fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    /// The expected type name.
    pub expected: &'static str,
    /// The actual type name found.
    pub found: String,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueError {}

/// A shared host object instance.
pub type HostRef = Arc<dyn HostObject>;

/// Body of a callable value.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A callable value: a registered function identifier or a host-supplied
/// closure, together with its signature.
#[derive(Clone)]
pub struct FunctionValue {
    pub name: Arc<str>,
    pub sig: Arc<FunctionSig>,
    pub body: NativeFn,
}

impl FunctionValue {
    /// Create a callable value from a name, signature and closure.
    pub fn new(
        name: impl Into<Arc<str>>,
        params: Vec<Type>,
        result: Type,
        body: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sig: Arc::new(FunctionSig { params, result }),
            body: Arc::new(body),
        }
    }

    /// Call the function with the given arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.body)(args)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .finish_non_exhaustive()
    }
}

/// The decimal runtime form: a distinct lane over an f64 representation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Decimal(pub f64);

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    /// A host object instance.
    Object(HostRef),
    /// A callable value.
    Function(Arc<FunctionValue>),
    /// A type handle (the result of `typeof`).
    Type(Type),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create a host object value.
    pub fn object(obj: impl HostObject + 'static) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Create a host object value from a shared reference.
    pub fn object_ref(obj: HostRef) -> Self {
        Value::Object(obj)
    }

    /// Create a callable value.
    pub fn function(func: FunctionValue) -> Self {
        Value::Function(Arc::new(func))
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The static type this value inhabits at runtime.
    pub fn runtime_type(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Char(_) => Type::Char,
            Value::Int32(_) => Type::Int32,
            Value::Int64(_) => Type::Int64,
            Value::UInt32(_) => Type::UInt32,
            Value::UInt64(_) => Type::UInt64,
            Value::Single(_) => Type::Single,
            Value::Double(_) => Type::Double,
            Value::Decimal(_) => Type::Decimal,
            Value::String(_) => Type::String,
            Value::Object(obj) => Type::Host(Arc::from(obj.type_name())),
            Value::Function(func) => Type::Function(func.sig.clone()),
            Value::Type(_) => Type::Meta,
        }
    }

    /// Name of the runtime type, for error messages.
    pub fn type_name(&self) -> String {
        self.runtime_type().display_name()
    }

    /// The text form of the value; backs the universal `ToString()` method
    /// and string concatenation.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Int64(n) => n.to_string(),
            Value::UInt32(n) => n.to_string(),
            Value::UInt64(n) => n.to_string(),
            Value::Single(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.to_string(),
            Value::Object(obj) => obj.to_text(),
            Value::Function(func) => func.name.to_string(),
            Value::Type(ty) => ty.display_name(),
        }
    }

    /// Convert the value to the given static type at runtime.
    ///
    /// Implements both the implicit conversions the binder inserts and the
    /// explicit ones a cast requests. Fails with an `EvalError` when the
    /// value does not fit.
    pub fn convert_to(&self, to: &Type) -> Result<Value, EvalError> {
        if self.runtime_type() == *to {
            return Ok(self.clone());
        }

        match to {
            // Boxing: the value itself is the object representation.
            Type::Object => return Ok(self.clone()),
            // null flows into any reference type.
            _ if self.is_null() && to.is_reference() => return Ok(Value::Null),
            Type::Host(name) => {
                // Downcast from object: the runtime type must match.
                if let Value::Object(obj) = self {
                    if obj.type_name() == name.as_ref() {
                        return Ok(self.clone());
                    }
                }
                return Err(EvalError::invalid_conversion(
                    &self.type_name(),
                    name.as_ref(),
                ));
            }
            _ => {}
        }

        if to.is_numeric() {
            if let Some(converted) = self.convert_scalar(to) {
                return converted;
            }
        }

        Err(EvalError::invalid_conversion(
            &self.type_name(),
            &to.display_name(),
        ))
    }

    /// Numeric/char lane conversions. Returns None when the source is not
    /// a scalar the target lane understands.
    fn convert_scalar(&self, to: &Type) -> Option<Result<Value, EvalError>> {
        // Chars convert through their code point.
        let from_char = |c: &char| *c as u32 as f64;

        let (as_f64, as_i128): (f64, Option<i128>) = match self {
            Value::Char(c) => (from_char(c), Some(*c as u32 as i128)),
            Value::Int32(n) => (*n as f64, Some(*n as i128)),
            Value::Int64(n) => (*n as f64, Some(*n as i128)),
            Value::UInt32(n) => (*n as f64, Some(*n as i128)),
            Value::UInt64(n) => (*n as f64, Some(*n as i128)),
            Value::Single(n) => (*n as f64, float_to_i128(*n as f64)),
            Value::Double(n) => (*n, float_to_i128(*n)),
            Value::Decimal(d) => (d.0, float_to_i128(d.0)),
            _ => return None,
        };

        let out = match to {
            Type::Char => {
                return Some(
                    as_i128
                        .and_then(|i| u32::try_from(i).ok())
                        .and_then(char::from_u32)
                        .map(Value::Char)
                        .ok_or_else(|| {
                            EvalError::invalid_conversion(&self.type_name(), "char")
                        }),
                )
            }
            Type::Int32 => int_lane(as_i128, i128::from(i32::MIN), i128::from(i32::MAX))
                .map(|i| Value::Int32(i as i32)),
            Type::Int64 => int_lane(as_i128, i128::from(i64::MIN), i128::from(i64::MAX))
                .map(|i| Value::Int64(i as i64)),
            Type::UInt32 => int_lane(as_i128, 0, i128::from(u32::MAX)).map(|i| Value::UInt32(i as u32)),
            Type::UInt64 => {
                int_lane(as_i128, 0, i128::from(u64::MAX)).map(|i| Value::UInt64(i as u64))
            }
            Type::Single => Some(Value::Single(as_f64 as f32)),
            Type::Double => Some(Value::Double(as_f64)),
            Type::Decimal => Some(Value::Decimal(Decimal(as_f64))),
            _ => return None,
        };

        Some(out.ok_or_else(|| {
            EvalError::invalid_conversion(&self.type_name(), &to.display_name())
        }))
    }
}

/// Truncate a float towards zero, if it fits an i128.
fn float_to_i128(f: f64) -> Option<i128> {
    if f.is_finite() && f > i128::MIN as f64 && f < i128::MAX as f64 {
        Some(f.trunc() as i128)
    } else {
        None
    }
}

/// Range-check an integer conversion.
fn int_lane(value: Option<i128>, min: i128, max: i128) -> Option<i128> {
    value.filter(|v| (min..=max).contains(v))
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Value::Int32(v) => f.debug_tuple("Int32").field(v).finish(),
            Value::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Value::UInt32(v) => f.debug_tuple("UInt32").field(v).finish(),
            Value::UInt64(v) => f.debug_tuple("UInt64").field(v).finish(),
            Value::Single(v) => f.debug_tuple("Single").field(v).finish(),
            Value::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Value::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Value::String(v) => f.debug_tuple("String").field(v).finish(),
            Value::Object(obj) => f.debug_tuple("Object").field(&obj.type_name()).finish(),
            Value::Function(func) => f.debug_tuple("Function").field(&func.name).finish(),
            Value::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Host objects compare by identity.
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

// === Into conversions ===

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Single(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v.as_str()))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::String(v)
    }
}

impl From<FunctionValue> for Value {
    fn from(v: FunctionValue) -> Self {
        Value::Function(Arc::new(v))
    }
}

// === TryFrom extractions ===

macro_rules! value_try_from {
    ($native:ty, $variant:ident, $expected:literal) => {
        impl TryFrom<Value> for $native {
            type Error = ValueError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ValueError {
                        expected: $expected,
                        found: other.type_name(),
                    }),
                }
            }
        }
    };
}

value_try_from!(bool, Bool, "bool");
value_try_from!(char, Char, "char");
value_try_from!(i32, Int32, "int");
value_try_from!(i64, Int64, "long");
value_try_from!(u32, UInt32, "uint");
value_try_from!(u64, UInt64, "ulong");
value_try_from!(f32, Single, "float");
value_try_from!(f64, Double, "double");
value_try_from!(Decimal, Decimal, "decimal");

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(ValueError {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}
