//! Tree-walking evaluator.
//!
//! Executes a bound expression tree over a frame of parameter values. The
//! binder has already inserted every conversion, so arithmetic only ever
//! sees operands of the same lane; anything else is an internal error.

use crate::tree::{AssignTarget, BinOp, CallTarget, CastKind, ExprKind, TypedExpr, UnOp};
use crate::types::Type;

use super::error::EvalError;
use super::value::{Decimal, Value};

/// Evaluate an expression over a mutable parameter frame.
///
/// The frame holds one slot per declared parameter, in declaration order;
/// assignment to a parameter writes its slot.
pub fn evaluate(expr: &TypedExpr, frame: &mut [Value]) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Constant(value) => Ok(value.clone()),

        ExprKind::Param { index, .. } => Ok(frame[*index].clone()),

        ExprKind::Member { target, property } => {
            let receiver = match target {
                Some(target) => {
                    let value = evaluate(target, frame)?;
                    if value.is_null() {
                        return Err(EvalError::null_reference(&format!(
                            "member '{}'",
                            property.name
                        )));
                    }
                    value
                }
                None => Value::Null,
            };
            (property.getter)(&receiver)
        }

        ExprKind::Call {
            target,
            receiver,
            args,
        } => {
            let receiver_value = match receiver {
                Some(receiver) => Some(evaluate(receiver, frame)?),
                None => None,
            };
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(evaluate(arg, frame)?);
            }
            eval_call(target, receiver_value, arg_values)
        }

        ExprKind::Binary { op, left, right } => eval_binary(*op, left, right, frame),

        ExprKind::Unary { op, expr } => {
            let value = evaluate(expr, frame)?;
            eval_unary(*op, value)
        }

        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            if as_bool(evaluate(cond, frame)?)? {
                evaluate(then_expr, frame)
            } else {
                evaluate(else_expr, frame)
            }
        }

        ExprKind::Cast {
            kind,
            expr,
            target,
        } => {
            let value = evaluate(expr, frame)?;
            match kind {
                CastKind::Convert => value.convert_to(target),
                CastKind::TryRef => Ok(if matches_type(&value, target) {
                    value
                } else {
                    Value::Null
                }),
                CastKind::Test => Ok(Value::Bool(matches_type(&value, target))),
            }
        }

        ExprKind::Lambda { body } => evaluate(body, frame),

        ExprKind::DynamicGet { receiver, name } => {
            let value = evaluate(receiver, frame)?;
            dynamic_member(&value, name)
        }

        ExprKind::DynamicCall {
            receiver,
            name,
            args,
        } => {
            let value = evaluate(receiver, frame)?;
            let member = dynamic_member(&value, name)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for arg in args {
                arg_values.push(evaluate(arg, frame)?);
            }
            match member {
                Value::Function(func) => func.call(&arg_values),
                other => Err(EvalError::invalid_argument(format!(
                    "dynamic member '{}' of type '{}' is not callable",
                    name,
                    other.type_name()
                ))),
            }
        }

        ExprKind::Assign { target, value } => {
            let value = evaluate(value, frame)?;
            match target {
                AssignTarget::Param { index, .. } => {
                    frame[*index] = value.clone();
                    Ok(value)
                }
                AssignTarget::Member { target, property } => {
                    let receiver = match target {
                        Some(target) => {
                            let receiver = evaluate(target, frame)?;
                            if receiver.is_null() {
                                return Err(EvalError::null_reference(&format!(
                                    "member '{}'",
                                    property.name
                                )));
                            }
                            receiver
                        }
                        None => Value::Null,
                    };
                    let setter = property
                        .setter
                        .as_ref()
                        .ok_or_else(|| EvalError::internal("assignment to read-only member"))?;
                    setter(&receiver, value.clone())?;
                    Ok(value)
                }
                AssignTarget::Index {
                    target,
                    index,
                    indexer,
                } => {
                    let receiver = evaluate(target, frame)?;
                    if receiver.is_null() {
                        return Err(EvalError::null_reference("indexer"));
                    }
                    let key = evaluate(index, frame)?;
                    let setter = indexer
                        .setter
                        .as_ref()
                        .ok_or_else(|| EvalError::internal("assignment to read-only indexer"))?;
                    setter(&receiver, &key, value.clone())?;
                    Ok(value)
                }
            }
        }
    }
}

fn eval_call(
    target: &CallTarget,
    receiver: Option<Value>,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    match target {
        CallTarget::Method(method) => {
            if method.is_extension {
                // Extensions are statics with the receiver as first
                // argument. Called through their holder type they have no
                // receiver and the arguments are already complete.
                match receiver {
                    Some(receiver) => {
                        let mut full = Vec::with_capacity(args.len() + 1);
                        full.push(receiver);
                        full.extend(args);
                        (method.body)(&Value::Null, &full)
                    }
                    None => (method.body)(&Value::Null, &args),
                }
            } else if method.is_static {
                (method.body)(&Value::Null, &args)
            } else {
                let receiver = receiver
                    .ok_or_else(|| EvalError::internal("instance call without receiver"))?;
                if receiver.is_null() {
                    return Err(EvalError::null_reference(&format!(
                        "method '{}'",
                        method.name
                    )));
                }
                (method.body)(&receiver, &args)
            }
        }
        CallTarget::Indexer(indexer) => {
            let receiver =
                receiver.ok_or_else(|| EvalError::internal("indexer without receiver"))?;
            if receiver.is_null() {
                return Err(EvalError::null_reference("indexer"));
            }
            (indexer.getter)(&receiver, &args[0])
        }
        CallTarget::Invoke => {
            let callee = receiver.ok_or_else(|| EvalError::internal("invoke without callee"))?;
            match callee {
                Value::Function(func) => func.call(&args),
                Value::Null => Err(EvalError::null_reference("function call")),
                other => Err(EvalError::invalid_argument(format!(
                    "value of type '{}' is not callable",
                    other.type_name()
                ))),
            }
        }
        CallTarget::ToText => {
            let receiver =
                receiver.ok_or_else(|| EvalError::internal("ToString without receiver"))?;
            Ok(Value::string(receiver.to_text()))
        }
    }
}

/// Probe the dynamic member surface of a value. Name matching is exact:
/// the property bag is case-sensitive regardless of interpreter settings.
fn dynamic_member(receiver: &Value, name: &str) -> Result<Value, EvalError> {
    match receiver {
        Value::Null => Err(EvalError::null_reference(&format!("member '{}'", name))),
        Value::Object(obj) => match obj.as_dynamic() {
            Some(bag) => bag
                .get_member(name)
                .ok_or_else(|| EvalError::dynamic_binding(name, obj.type_name())),
            None => Err(EvalError::dynamic_binding(name, obj.type_name())),
        },
        other => Err(EvalError::dynamic_binding(name, &other.type_name())),
    }
}

/// Runtime type test backing `is` and `as`.
fn matches_type(value: &Value, target: &Type) -> bool {
    if value.is_null() {
        return false;
    }
    if *target == Type::Object {
        return true;
    }
    value.runtime_type() == *target
}

fn as_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::internal(format!(
            "expected bool, got {}",
            other.type_name()
        ))),
    }
}

fn eval_binary(
    op: BinOp,
    left: &TypedExpr,
    right: &TypedExpr,
    frame: &mut [Value],
) -> Result<Value, EvalError> {
    // Short-circuit forms evaluate the right operand lazily.
    match op {
        BinOp::And => {
            return Ok(Value::Bool(
                as_bool(evaluate(left, frame)?)? && as_bool(evaluate(right, frame)?)?,
            ));
        }
        BinOp::Or => {
            return Ok(Value::Bool(
                as_bool(evaluate(left, frame)?)? || as_bool(evaluate(right, frame)?)?,
            ));
        }
        BinOp::Coalesce => {
            let left = evaluate(left, frame)?;
            return if left.is_null() {
                evaluate(right, frame)
            } else {
                Ok(left)
            };
        }
        _ => {}
    }

    let l = evaluate(left, frame)?;
    let r = evaluate(right, frame)?;

    match op {
        BinOp::Concat => Ok(Value::string(format!("{}{}", l.to_text(), r.to_text()))),
        BinOp::Add => arith(op, l, r),
        BinOp::Sub => arith(op, l, r),
        BinOp::Mul => arith(op, l, r),
        BinOp::Div => arith(op, l, r),
        BinOp::Mod => arith(op, l, r),
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, l, r),
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => bitwise(op, l, r),
        BinOp::Shl | BinOp::Shr => shift(op, l, r),
        BinOp::And | BinOp::Or | BinOp::Coalesce => unreachable!("handled above"),
    }
}

macro_rules! checked_int_op {
    ($op:expr, $a:expr, $b:expr, $wrap:expr) => {{
        let result = match $op {
            BinOp::Add => $a.checked_add($b),
            BinOp::Sub => $a.checked_sub($b),
            BinOp::Mul => $a.checked_mul($b),
            BinOp::Div => {
                if $b == 0 {
                    return Err(EvalError::division_by_zero());
                }
                $a.checked_div($b)
            }
            BinOp::Mod => {
                if $b == 0 {
                    return Err(EvalError::division_by_zero());
                }
                $a.checked_rem($b)
            }
            _ => unreachable!("arithmetic operator"),
        };
        result
            .map($wrap)
            .ok_or_else(|| EvalError::overflow(op_symbol($op)))
    }};
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        _ => "?",
    }
}

fn arith(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int32(a), Value::Int32(b)) => {
            checked_int_op!(op, a, b, Value::Int32)
        }
        (Value::Int64(a), Value::Int64(b)) => {
            checked_int_op!(op, a, b, Value::Int64)
        }
        (Value::UInt32(a), Value::UInt32(b)) => {
            checked_int_op!(op, a, b, Value::UInt32)
        }
        (Value::UInt64(a), Value::UInt64(b)) => {
            checked_int_op!(op, a, b, Value::UInt64)
        }
        (Value::Single(a), Value::Single(b)) => Ok(Value::Single(float_op(op, a as f64, b as f64) as f32)),
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(float_op(op, a, b))),
        (Value::Decimal(a), Value::Decimal(b)) => {
            if matches!(op, BinOp::Div | BinOp::Mod) && b.0 == 0.0 {
                return Err(EvalError::division_by_zero());
            }
            Ok(Value::Decimal(Decimal(float_op(op, a.0, b.0))))
        }
        (l, r) => Err(EvalError::internal(format!(
            "mixed operand lanes {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        _ => unreachable!("arithmetic operator"),
    }
}

fn compare(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    let ordering = match (&l, &r) {
        (Value::Int32(a), Value::Int32(b)) => a.partial_cmp(b),
        (Value::Int64(a), Value::Int64(b)) => a.partial_cmp(b),
        (Value::UInt32(a), Value::UInt32(b)) => a.partial_cmp(b),
        (Value::UInt64(a), Value::UInt64(b)) => a.partial_cmp(b),
        (Value::Single(a), Value::Single(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
        _ => {
            return Err(EvalError::internal(format!(
                "mixed comparison lanes {} and {}",
                l.type_name(),
                r.type_name()
            )))
        }
    };

    let result = match (op, ordering) {
        // NaN comparisons are false.
        (_, None) => false,
        (BinOp::Lt, Some(o)) => o.is_lt(),
        (BinOp::Le, Some(o)) => o.is_le(),
        (BinOp::Gt, Some(o)) => o.is_gt(),
        (BinOp::Ge, Some(o)) => o.is_ge(),
        _ => unreachable!("comparison operator"),
    };

    Ok(Value::Bool(result))
}

fn bitwise(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    macro_rules! apply {
        ($a:expr, $b:expr, $wrap:expr) => {
            Ok($wrap(match op {
                BinOp::BitAnd => $a & $b,
                BinOp::BitOr => $a | $b,
                BinOp::BitXor => $a ^ $b,
                _ => unreachable!("bitwise operator"),
            }))
        };
    }

    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => apply!(a, b, Value::Bool),
        (Value::Int32(a), Value::Int32(b)) => apply!(a, b, Value::Int32),
        (Value::Int64(a), Value::Int64(b)) => apply!(a, b, Value::Int64),
        (Value::UInt32(a), Value::UInt32(b)) => apply!(a, b, Value::UInt32),
        (Value::UInt64(a), Value::UInt64(b)) => apply!(a, b, Value::UInt64),
        (l, r) => Err(EvalError::internal(format!(
            "mixed bitwise lanes {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

/// Shifts mask the count to the operand width.
fn shift(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    let count = match r {
        Value::Int32(n) => n,
        other => {
            return Err(EvalError::internal(format!(
                "shift count must be int, got {}",
                other.type_name()
            )))
        }
    };

    macro_rules! apply {
        ($a:expr, $mask:expr, $wrap:expr) => {{
            let count = (count & $mask) as u32;
            Ok($wrap(match op {
                BinOp::Shl => $a << count,
                BinOp::Shr => $a >> count,
                _ => unreachable!("shift operator"),
            }))
        }};
    }

    match l {
        Value::Int32(a) => apply!(a, 31, Value::Int32),
        Value::UInt32(a) => apply!(a, 31, Value::UInt32),
        Value::Int64(a) => apply!(a, 63, Value::Int64),
        Value::UInt64(a) => apply!(a, 63, Value::UInt64),
        other => Err(EvalError::internal(format!(
            "cannot shift {}",
            other.type_name()
        ))),
    }
}

fn eval_unary(op: UnOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Neg, Value::Int32(n)) => n
            .checked_neg()
            .map(Value::Int32)
            .ok_or_else(|| EvalError::overflow("-")),
        (UnOp::Neg, Value::Int64(n)) => n
            .checked_neg()
            .map(Value::Int64)
            .ok_or_else(|| EvalError::overflow("-")),
        (UnOp::Neg, Value::Single(n)) => Ok(Value::Single(-n)),
        (UnOp::Neg, Value::Double(n)) => Ok(Value::Double(-n)),
        (UnOp::Neg, Value::Decimal(d)) => Ok(Value::Decimal(Decimal(-d.0))),
        (UnOp::BitNot, Value::Int32(n)) => Ok(Value::Int32(!n)),
        (UnOp::BitNot, Value::Int64(n)) => Ok(Value::Int64(!n)),
        (UnOp::BitNot, Value::UInt32(n)) => Ok(Value::UInt32(!n)),
        (UnOp::BitNot, Value::UInt64(n)) => Ok(Value::UInt64(!n)),
        (op, value) => Err(EvalError::internal(format!(
            "operator {:?} on {}",
            op,
            value.type_name()
        ))),
    }
}
