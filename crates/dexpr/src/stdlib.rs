//! Seed registrations: primitive type aliases, the literal identifiers
//! `true`/`false`/`null`, and the common-types group (`string` members,
//! `Math`, `Convert`).
//!
//! Each group is a plain batch registration with no special semantics
//! afterwards. The tables are built once and shared between interpreters,
//! which keeps default construction cheap.

use std::sync::{Arc, OnceLock};

use crate::eval::{EvalError, Value};
use crate::reflect::{Indexer, Method, Property, ReferenceType};
use crate::registry::Identifier;
use crate::types::Type;

/// The primitive type aliases.
pub fn primitive_types() -> &'static [Arc<ReferenceType>] {
    static CELL: OnceLock<Vec<Arc<ReferenceType>>> = OnceLock::new();
    CELL.get_or_init(|| {
        [
            ("object", Type::Object),
            ("bool", Type::Bool),
            ("char", Type::Char),
            ("string", Type::String),
            ("int", Type::Int32),
            ("uint", Type::UInt32),
            ("long", Type::Int64),
            ("ulong", Type::UInt64),
            ("float", Type::Single),
            ("double", Type::Double),
            ("decimal", Type::Decimal),
        ]
        .into_iter()
        .map(|(alias, target)| Arc::new(ReferenceType::new(alias, target)))
        .collect()
    })
}

/// The literal identifiers `true`, `false` and `null`.
pub fn literal_identifiers() -> &'static [Identifier] {
    static CELL: OnceLock<Vec<Identifier>> = OnceLock::new();
    CELL.get_or_init(|| {
        vec![
            Identifier::new("true", true),
            Identifier::new("false", false),
            Identifier::typed("null", Value::Null, Type::Null),
        ]
    })
}

/// The common-types group: the `string` member set, `Math` and `Convert`.
pub fn common_types() -> &'static [Arc<ReferenceType>] {
    static CELL: OnceLock<Vec<Arc<ReferenceType>>> = OnceLock::new();
    CELL.get_or_init(|| {
        vec![
            Arc::new(string_members()),
            Arc::new(math_type()),
            Arc::new(convert_type()),
        ]
    })
}

fn expect_string(value: &Value) -> Result<&str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::invalid_argument(format!(
            "expected string receiver, got {}",
            other.type_name()
        ))),
    }
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, EvalError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EvalError::invalid_argument(format!(
            "expected string argument, got {}",
            other.type_name()
        ))),
        None => Err(EvalError::invalid_argument("missing argument")),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, EvalError> {
    match args.get(index) {
        Some(Value::Int32(n)) => Ok(*n),
        Some(other) => Err(EvalError::invalid_argument(format!(
            "expected int argument, got {}",
            other.type_name()
        ))),
        None => Err(EvalError::invalid_argument("missing argument")),
    }
}

/// Member table for the `string` primitive.
fn string_members() -> ReferenceType {
    ReferenceType::new("String", Type::String)
        .with_property(Property::readonly("Length", Type::Int32, |recv| {
            Ok(Value::Int32(expect_string(recv)?.chars().count() as i32))
        }))
        .with_indexer(Indexer::readonly(Type::Int32, Type::Char, |recv, key| {
            let s = expect_string(recv)?;
            let index = match key {
                Value::Int32(n) => *n,
                other => {
                    return Err(EvalError::invalid_argument(format!(
                        "expected int index, got {}",
                        other.type_name()
                    )))
                }
            };
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| EvalError::index_out_of_bounds(index as i64, s.chars().count()))
        }))
        .with_method(Method::instance("ToUpper", vec![], Type::String, |recv, _| {
            Ok(Value::string(expect_string(recv)?.to_uppercase()))
        }))
        .with_method(Method::instance("ToLower", vec![], Type::String, |recv, _| {
            Ok(Value::string(expect_string(recv)?.to_lowercase()))
        }))
        .with_method(Method::instance("Trim", vec![], Type::String, |recv, _| {
            Ok(Value::string(expect_string(recv)?.trim()))
        }))
        .with_method(Method::instance(
            "Contains",
            vec![Type::String],
            Type::Bool,
            |recv, args| Ok(Value::Bool(expect_string(recv)?.contains(string_arg(args, 0)?))),
        ))
        .with_method(Method::instance(
            "StartsWith",
            vec![Type::String],
            Type::Bool,
            |recv, args| {
                Ok(Value::Bool(
                    expect_string(recv)?.starts_with(string_arg(args, 0)?),
                ))
            },
        ))
        .with_method(Method::instance(
            "EndsWith",
            vec![Type::String],
            Type::Bool,
            |recv, args| {
                Ok(Value::Bool(
                    expect_string(recv)?.ends_with(string_arg(args, 0)?),
                ))
            },
        ))
        .with_method(Method::instance(
            "IndexOf",
            vec![Type::String],
            Type::Int32,
            |recv, args| {
                let s = expect_string(recv)?;
                let needle = string_arg(args, 0)?;
                let index = s
                    .find(needle)
                    .map(|byte| s[..byte].chars().count() as i32)
                    .unwrap_or(-1);
                Ok(Value::Int32(index))
            },
        ))
        .with_method(Method::instance(
            "Replace",
            vec![Type::String, Type::String],
            Type::String,
            |recv, args| {
                Ok(Value::string(
                    expect_string(recv)?.replace(string_arg(args, 0)?, string_arg(args, 1)?),
                ))
            },
        ))
        .with_method(Method::instance(
            "Substring",
            vec![Type::Int32],
            Type::String,
            |recv, args| {
                let s = expect_string(recv)?;
                let start = int_arg(args, 0)?;
                substring(s, start, None)
            },
        ))
        .with_method(Method::instance(
            "Substring",
            vec![Type::Int32, Type::Int32],
            Type::String,
            |recv, args| {
                let s = expect_string(recv)?;
                let start = int_arg(args, 0)?;
                let length = int_arg(args, 1)?;
                substring(s, start, Some(length))
            },
        ))
}

/// Char-indexed substring. Errors when the range falls outside the string.
fn substring(s: &str, start: i32, length: Option<i32>) -> Result<Value, EvalError> {
    let total = s.chars().count();
    let start_usize =
        usize::try_from(start).map_err(|_| EvalError::index_out_of_bounds(start as i64, total))?;
    if start_usize > total {
        return Err(EvalError::index_out_of_bounds(start as i64, total));
    }

    let taken: String = match length {
        Some(len) => {
            let len_usize = usize::try_from(len)
                .map_err(|_| EvalError::invalid_argument("length must not be negative"))?;
            if start_usize + len_usize > total {
                return Err(EvalError::index_out_of_bounds(
                    (start_usize + len_usize) as i64,
                    total,
                ));
            }
            s.chars().skip(start_usize).take(len_usize).collect()
        }
        None => s.chars().skip(start_usize).collect(),
    };

    Ok(Value::string(taken))
}

/// The `Math` static class.
fn math_type() -> ReferenceType {
    fn double_arg(args: &[Value], index: usize) -> Result<f64, EvalError> {
        match args.get(index) {
            Some(Value::Double(n)) => Ok(*n),
            Some(other) => Err(EvalError::invalid_argument(format!(
                "expected double argument, got {}",
                other.type_name()
            ))),
            None => Err(EvalError::invalid_argument("missing argument")),
        }
    }

    ReferenceType::host("Math")
        .with_property(Property::static_readonly("PI", Value::Double(std::f64::consts::PI)))
        .with_property(Property::static_readonly("E", Value::Double(std::f64::consts::E)))
        .with_method(Method::static_fn("Abs", vec![Type::Int32], Type::Int32, |args| {
            int_arg(args, 0)?
                .checked_abs()
                .map(Value::Int32)
                .ok_or_else(|| EvalError::overflow("Abs"))
        }))
        .with_method(Method::static_fn(
            "Abs",
            vec![Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.abs())),
        ))
        .with_method(Method::static_fn(
            "Min",
            vec![Type::Int32, Type::Int32],
            Type::Int32,
            |args| Ok(Value::Int32(int_arg(args, 0)?.min(int_arg(args, 1)?))),
        ))
        .with_method(Method::static_fn(
            "Min",
            vec![Type::Double, Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.min(double_arg(args, 1)?))),
        ))
        .with_method(Method::static_fn(
            "Max",
            vec![Type::Int32, Type::Int32],
            Type::Int32,
            |args| Ok(Value::Int32(int_arg(args, 0)?.max(int_arg(args, 1)?))),
        ))
        .with_method(Method::static_fn(
            "Max",
            vec![Type::Double, Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.max(double_arg(args, 1)?))),
        ))
        .with_method(Method::static_fn(
            "Pow",
            vec![Type::Double, Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.powf(double_arg(args, 1)?))),
        ))
        .with_method(Method::static_fn(
            "Sqrt",
            vec![Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.sqrt())),
        ))
        .with_method(Method::static_fn(
            "Floor",
            vec![Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.floor())),
        ))
        .with_method(Method::static_fn(
            "Ceiling",
            vec![Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.ceil())),
        ))
        .with_method(Method::static_fn(
            "Round",
            vec![Type::Double],
            Type::Double,
            |args| Ok(Value::Double(double_arg(args, 0)?.round())),
        ))
}

/// The `Convert` static class.
fn convert_type() -> ReferenceType {
    fn only_arg(args: &[Value]) -> Result<&Value, EvalError> {
        args.first()
            .ok_or_else(|| EvalError::invalid_argument("missing argument"))
    }

    ReferenceType::host("Convert")
        .with_method(Method::static_fn(
            "ToInt32",
            vec![Type::Object],
            Type::Int32,
            |args| only_arg(args)?.convert_to(&Type::Int32),
        ))
        .with_method(Method::static_fn(
            "ToInt64",
            vec![Type::Object],
            Type::Int64,
            |args| only_arg(args)?.convert_to(&Type::Int64),
        ))
        .with_method(Method::static_fn(
            "ToDouble",
            vec![Type::Object],
            Type::Double,
            |args| only_arg(args)?.convert_to(&Type::Double),
        ))
        .with_method(Method::static_fn(
            "ToDecimal",
            vec![Type::Object],
            Type::Decimal,
            |args| only_arg(args)?.convert_to(&Type::Decimal),
        ))
        .with_method(Method::static_fn(
            "ToChar",
            vec![Type::Object],
            Type::Char,
            |args| only_arg(args)?.convert_to(&Type::Char),
        ))
        .with_method(Method::static_fn(
            "ToString",
            vec![Type::Object],
            Type::String,
            |args| Ok(Value::string(only_arg(args)?.to_text())),
        ))
        .with_method(Method::static_fn(
            "ToBoolean",
            vec![Type::Object],
            Type::Bool,
            |args| match only_arg(args)? {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) => s
                    .trim()
                    .to_lowercase()
                    .parse::<bool>()
                    .map(Value::Bool)
                    .map_err(|_| EvalError::invalid_conversion("string", "bool")),
                other => Err(EvalError::invalid_conversion(&other.type_name(), "bool")),
            },
        ))
}
