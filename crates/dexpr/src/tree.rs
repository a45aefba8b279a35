//! The typed expression tree.
//!
//! Built by the binder, rewritten by visitors, executed by the evaluator.
//! Every node carries its static type and source span and is immutable
//! after emission. `DynamicGet` and `DynamicCall` are distinct from their
//! statically bound counterparts: they carry only the receiver and the
//! literal member name, and their static type is `object`.

use std::sync::Arc;

use dexpr_parser::Span;

use crate::eval::Value;
use crate::reflect::{Indexer, Method, Property};
use crate::types::Type;

/// A typed expression node.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

impl TypedExpr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// Pre-order walk over this node and all children.
    pub fn walk(&self, f: &mut impl FnMut(&TypedExpr)) {
        f(self);
        match &self.kind {
            ExprKind::Constant(_) | ExprKind::Param { .. } => {}
            ExprKind::Member { target, .. } => {
                if let Some(target) = target {
                    target.walk(f);
                }
            }
            ExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    receiver.walk(f);
                }
                for arg in args {
                    arg.walk(f);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            ExprKind::Unary { expr, .. } => expr.walk(f),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.walk(f);
                then_expr.walk(f);
                else_expr.walk(f);
            }
            ExprKind::Cast { expr, .. } => expr.walk(f),
            ExprKind::Lambda { body } => body.walk(f),
            ExprKind::DynamicGet { receiver, .. } => receiver.walk(f),
            ExprKind::DynamicCall { receiver, args, .. } => {
                receiver.walk(f);
                for arg in args {
                    arg.walk(f);
                }
            }
            ExprKind::Assign { target, value } => {
                match target {
                    AssignTarget::Param { .. } => {}
                    AssignTarget::Member { target, .. } => {
                        if let Some(target) = target {
                            target.walk(f);
                        }
                    }
                    AssignTarget::Index { target, index, .. } => {
                        target.walk(f);
                        index.walk(f);
                    }
                }
                value.walk(f);
            }
        }
    }
}

/// The node variants.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal or registered-identifier value.
    Constant(Value),
    /// A declared parameter, addressed by frame slot.
    Param { name: Arc<str>, index: usize },
    /// A statically bound property read. `target` is `None` for statics.
    Member {
        target: Option<Box<TypedExpr>>,
        property: Property,
    },
    /// A statically bound invocation.
    Call {
        target: CallTarget,
        receiver: Option<Box<TypedExpr>>,
        args: Vec<TypedExpr>,
    },
    Binary {
        op: BinOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Unary {
        op: UnOp,
        expr: Box<TypedExpr>,
    },
    Conditional {
        cond: Box<TypedExpr>,
        then_expr: Box<TypedExpr>,
        else_expr: Box<TypedExpr>,
    },
    /// A conversion or type test; `target` is the named type operand.
    Cast {
        kind: CastKind,
        expr: Box<TypedExpr>,
        target: Type,
    },
    /// Root wrapper binding the expression over its parameter set.
    Lambda { body: Box<TypedExpr> },
    /// Late-bound member read on a dynamic-capable receiver.
    DynamicGet {
        receiver: Box<TypedExpr>,
        name: Arc<str>,
    },
    /// Late-bound invocation on a dynamic-capable receiver.
    DynamicCall {
        receiver: Box<TypedExpr>,
        name: Arc<str>,
        args: Vec<TypedExpr>,
    },
    Assign {
        target: AssignTarget,
        value: Box<TypedExpr>,
    },
}

/// What a `Call` node invokes.
#[derive(Debug, Clone)]
pub enum CallTarget {
    /// A bound host method (instance, static or extension).
    Method(Method),
    /// A bound indexer; the key is the single argument.
    Indexer(Indexer),
    /// The receiver expression evaluates to a callable value.
    Invoke,
    /// The universal `ToString()`.
    ToText,
}

/// Conversion family of a `Cast` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// `(T) expr` and binder-inserted implicit conversions; fails at
    /// runtime when the value does not fit.
    Convert,
    /// `expr as T`: yields null instead of failing.
    TryRef,
    /// `expr is T`: yields a bool.
    Test,
}

/// L-value forms an assignment may write to.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Param { name: Arc<str>, index: usize },
    Member {
        target: Option<Box<TypedExpr>>,
        property: Property,
    },
    Index {
        target: Box<TypedExpr>,
        index: Box<TypedExpr>,
        indexer: Indexer,
    },
}

/// Binary operators of the typed tree. `Concat` is the string form of `+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

/// Unary operators of the typed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}
