//! Semantic binder: untyped AST to typed expression tree.
//!
//! The binder resolves names against the declared parameters and the
//! registries, selects members and overloads, inserts the implicit
//! conversions the C-family rules allow, and records which parameters,
//! types and identifiers the expression actually uses.
//!
//! Name resolution order for a bare identifier: declared parameter, then
//! registered identifier, then type alias. Member resolution order on a
//! value: static members, then extension methods, then the universal
//! `ToString()`, then the dynamic fallback for dynamic-capable types.

pub mod overload;

use indexmap::IndexSet;
use std::sync::Arc;

use dexpr_parser::ast::{self, Expr as Ast, SpannedExpr};
use dexpr_parser::{IntSuffix, RealSuffix, Span};

use crate::error::{ParseError, ParseErrorKind};
use crate::eval::{Decimal, Value};
use crate::lambda::Parameter;
use crate::reflect::{names_match, Member, Reflection, ReferenceType};
use crate::registry::{AssignmentPolicy, Settings};
use crate::tree::{AssignTarget, BinOp, CallTarget, CastKind, ExprKind, TypedExpr, UnOp};
use crate::types::{promote_numeric, Conversion, Type};

use overload::OverloadError;

/// Per-parse state: the inputs of a bind plus the accumulators that end up
/// on the resulting `Lambda`.
pub struct ParserArguments<'a> {
    pub text: &'a str,
    pub settings: &'a Settings,
    pub reflection: &'a dyn Reflection,
    pub expected: Option<Type>,
    pub parameters: &'a [Parameter],
    /// Indices of `parameters` the expression referenced.
    pub used_parameters: IndexSet<usize>,
    /// Aliases of registered types the expression referenced.
    pub used_types: IndexSet<String>,
    /// Names of registered identifiers the expression referenced.
    pub used_identifiers: IndexSet<String>,
}

impl<'a> ParserArguments<'a> {
    pub fn new(
        text: &'a str,
        settings: &'a Settings,
        reflection: &'a dyn Reflection,
        expected: Option<Type>,
        parameters: &'a [Parameter],
    ) -> Self {
        Self {
            text,
            settings,
            reflection,
            expected,
            parameters,
            used_parameters: IndexSet::new(),
            used_types: IndexSet::new(),
            used_identifiers: IndexSet::new(),
        }
    }
}

/// Bind an AST against the parse arguments, producing the root `Lambda`
/// node. The root is converted to the expected type when one is set.
pub fn bind(ast: &SpannedExpr, args: &mut ParserArguments<'_>) -> Result<TypedExpr, ParseError> {
    let mut binder = Binder { args };
    let mut body = binder.bind_expr(ast)?;

    if let Some(expected) = binder.args.expected.clone() {
        body = binder.convert(body, &expected)?;
    }

    let ty = body.ty.clone();
    let span = body.span.clone();
    Ok(TypedExpr::new(
        ExprKind::Lambda {
            body: Box::new(body),
        },
        ty,
        span,
    ))
}

/// An intermediate binding: either a value expression or a type reference,
/// which is only legal as a member/call/static prefix.
enum Bound {
    Expr(TypedExpr),
    TypeRef(Arc<ReferenceType>, Span),
}

struct Binder<'b, 'a> {
    args: &'b mut ParserArguments<'a>,
}

impl Binder<'_, '_> {
    fn ignore_case(&self) -> bool {
        !self.args.settings.case_sensitive()
    }

    /// Convert an expression to `to`, inserting a conversion node when the
    /// conversion is implicit but not identity. Fails otherwise.
    fn convert(&self, expr: TypedExpr, to: &Type) -> Result<TypedExpr, ParseError> {
        match self.args.reflection.conversion(&expr.ty, to) {
            Conversion::Identity => Ok(expr),
            Conversion::Implicit => {
                let span = expr.span.clone();
                Ok(TypedExpr::new(
                    ExprKind::Cast {
                        kind: CastKind::Convert,
                        expr: Box::new(expr),
                        target: to.clone(),
                    },
                    to.clone(),
                    span,
                ))
            }
            _ => Err(ParseError::type_mismatch(to, &expr.ty, expr.span)),
        }
    }

    /// Resolve a type alias, recording the use.
    fn resolve_type(&mut self, name: &str, span: &Span) -> Result<Arc<ReferenceType>, ParseError> {
        let settings = self.args.settings;
        match settings.lookup_type(name) {
            Some(rt) => {
                let rt = rt.clone();
                self.args.used_types.insert(rt.alias().to_string());
                Ok(rt)
            }
            None => Err(ParseError::unknown_type(name, span.clone())),
        }
    }

    /// Bind to a value expression; a bare type reference is an error here.
    fn bind_expr(&mut self, ast: &SpannedExpr) -> Result<TypedExpr, ParseError> {
        match self.bind_inner(ast)? {
            Bound::Expr(expr) => Ok(expr),
            Bound::TypeRef(rt, span) => Err(ParseError::new(
                ParseErrorKind::TypeNameAsValue(rt.alias().to_string()),
                span,
            )),
        }
    }

    fn bind_inner(&mut self, ast: &SpannedExpr) -> Result<Bound, ParseError> {
        let span = ast.span.clone();
        let expr = match &ast.node {
            Ast::Int { value, suffix } => self.bind_int_literal(*value, *suffix, span)?,
            Ast::Real { value, suffix } => bind_real_literal(*value, *suffix, span),
            Ast::Char(c) => TypedExpr::new(ExprKind::Constant(Value::Char(*c)), Type::Char, span),
            Ast::String(s) => TypedExpr::new(
                ExprKind::Constant(Value::string(s.as_str())),
                Type::String,
                span,
            ),
            Ast::Ident(name) => return self.bind_ident(name, span),
            Ast::Unary { op, expr } => self.bind_unary(*op, expr, span)?,
            Ast::Binary { op, left, right } => self.bind_binary(*op, left, right, span)?,
            Ast::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.bind_conditional(cond, then_expr, else_expr, span)?,
            Ast::Member { expr, name } => self.bind_member(expr, name, span)?,
            Ast::Index { expr, index } => self.bind_index(expr, index, span)?,
            Ast::Call { expr, args } => self.bind_call(expr, args, span)?,
            Ast::Cast { type_name, expr } => self.bind_cast(type_name, expr, span)?,
            Ast::TypeOf { type_name } => self.bind_typeof(type_name, span)?,
            Ast::DefaultOf { type_name } => self.bind_default(type_name, span)?,
            Ast::Is { expr, type_name } => self.bind_type_test(expr, type_name, span)?,
            Ast::As { expr, type_name } => self.bind_try_cast(expr, type_name, span)?,
            Ast::Assign { target, value } => self.bind_assign(target, value, span)?,
        };
        Ok(Bound::Expr(expr))
    }

    // === Names ===

    fn bind_ident(&mut self, name: &str, span: Span) -> Result<Bound, ParseError> {
        let ignore_case = self.ignore_case();
        let settings = self.args.settings;
        let parameters = self.args.parameters;

        // Declared parameters win over the registries.
        if let Some(index) = parameters
            .iter()
            .position(|p| names_match(&p.name, name, ignore_case))
        {
            self.args.used_parameters.insert(index);
            let param = &parameters[index];
            return Ok(Bound::Expr(TypedExpr::new(
                ExprKind::Param {
                    name: param.name.clone(),
                    index,
                },
                param.ty.clone(),
                span,
            )));
        }

        if let Some(ident) = settings.lookup_identifier(name) {
            self.args.used_identifiers.insert(ident.name.to_string());
            return Ok(Bound::Expr(TypedExpr::new(
                ExprKind::Constant(ident.value.clone()),
                ident.ty.clone(),
                span,
            )));
        }

        if let Some(rt) = settings.lookup_type(name) {
            let rt = rt.clone();
            self.args.used_types.insert(rt.alias().to_string());
            return Ok(Bound::TypeRef(rt, span));
        }

        Err(ParseError::unknown_identifier(name, span))
    }

    // === Literals ===

    fn bind_int_literal(
        &self,
        value: u64,
        suffix: IntSuffix,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let (value, ty) = match suffix {
            IntSuffix::None => {
                if value <= i32::MAX as u64 {
                    (Value::Int32(value as i32), Type::Int32)
                } else if value <= i64::MAX as u64 {
                    (Value::Int64(value as i64), Type::Int64)
                } else {
                    (Value::UInt64(value), Type::UInt64)
                }
            }
            IntSuffix::Unsigned => {
                if value <= u32::MAX as u64 {
                    (Value::UInt32(value as u32), Type::UInt32)
                } else {
                    (Value::UInt64(value), Type::UInt64)
                }
            }
            IntSuffix::Long => {
                if value <= i64::MAX as u64 {
                    (Value::Int64(value as i64), Type::Int64)
                } else {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidLiteral(format!("{}L", value)),
                        span,
                    ));
                }
            }
            IntSuffix::UnsignedLong => (Value::UInt64(value), Type::UInt64),
        };

        Ok(TypedExpr::new(ExprKind::Constant(value), ty, span))
    }

    // === Operators ===

    fn bind_unary(
        &mut self,
        op: ast::UnaryOp,
        operand: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let expr = self.bind_expr(operand)?;

        let (op, expr) = match op {
            ast::UnaryOp::Not => {
                if expr.ty != Type::Bool {
                    return Err(ParseError::incompatible_operand("!", &expr.ty, span));
                }
                (UnOp::Not, expr)
            }
            ast::UnaryOp::Neg => {
                let expr = match &expr.ty {
                    Type::Int32 | Type::Int64 | Type::Single | Type::Double | Type::Decimal => expr,
                    Type::Char => self.convert(expr, &Type::Int32)?,
                    // Negating uint widens to long.
                    Type::UInt32 => self.convert(expr, &Type::Int64)?,
                    other => {
                        return Err(ParseError::incompatible_operand("-", other, span));
                    }
                };
                (UnOp::Neg, expr)
            }
            ast::UnaryOp::BitNot => {
                let expr = match &expr.ty {
                    Type::Int32 | Type::Int64 | Type::UInt32 | Type::UInt64 => expr,
                    Type::Char => self.convert(expr, &Type::Int32)?,
                    other => {
                        return Err(ParseError::incompatible_operand("~", other, span));
                    }
                };
                (UnOp::BitNot, expr)
            }
        };

        let ty = expr.ty.clone();
        Ok(TypedExpr::new(
            ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            ty,
            span,
        ))
    }

    fn bind_binary(
        &mut self,
        op: ast::BinaryOp,
        left: &SpannedExpr,
        right: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        use ast::BinaryOp as P;

        let left = self.bind_expr(left)?;
        let right = self.bind_expr(right)?;

        match op {
            P::Add if left.ty == Type::String || right.ty == Type::String => {
                Ok(binary(BinOp::Concat, Type::String, left, right, span))
            }
            P::Add | P::Sub | P::Mul | P::Div | P::Mod => {
                self.bind_arithmetic(op, left, right, span)
            }
            P::Eq | P::Ne => self.bind_equality(op, left, right, span),
            P::Lt | P::Le | P::Gt | P::Ge => self.bind_comparison(op, left, right, span),
            P::And | P::Or => {
                let op_str = if op == P::And { "&&" } else { "||" };
                if left.ty != Type::Bool || right.ty != Type::Bool {
                    return Err(ParseError::incompatible_operands(
                        op_str, &left.ty, &right.ty, span,
                    ));
                }
                let op = if op == P::And { BinOp::And } else { BinOp::Or };
                Ok(binary(op, Type::Bool, left, right, span))
            }
            P::BitAnd | P::BitOr | P::BitXor => self.bind_bitwise(op, left, right, span),
            P::Shl | P::Shr => self.bind_shift(op, left, right, span),
            P::Coalesce => self.bind_coalesce(left, right, span),
        }
    }

    fn bind_arithmetic(
        &mut self,
        op: ast::BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        use ast::BinaryOp as P;

        let promoted = promote_numeric(&left.ty, &right.ty).ok_or_else(|| {
            ParseError::incompatible_operands(&op.to_string(), &left.ty, &right.ty, span.clone())
        })?;

        let left = self.convert(left, &promoted)?;
        let right = self.convert(right, &promoted)?;

        let op = match op {
            P::Add => BinOp::Add,
            P::Sub => BinOp::Sub,
            P::Mul => BinOp::Mul,
            P::Div => BinOp::Div,
            P::Mod => BinOp::Mod,
            _ => unreachable!("arithmetic operator"),
        };

        Ok(binary(op, promoted, left, right, span))
    }

    fn bind_equality(
        &mut self,
        op: ast::BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let op_kind = if op == ast::BinaryOp::Eq {
            BinOp::Eq
        } else {
            BinOp::Ne
        };

        if let Some(promoted) = promote_numeric(&left.ty, &right.ty) {
            let left = self.convert(left, &promoted)?;
            let right = self.convert(right, &promoted)?;
            return Ok(binary(op_kind, Type::Bool, left, right, span));
        }

        // Same non-numeric type, or reference-compatible operands
        // (including null literals): compared by value for primitives and
        // strings, by identity for host objects.
        let compatible = left.ty == right.ty
            || (left.ty.is_reference()
                && right.ty.is_reference()
                && (self.args.reflection.conversion(&left.ty, &right.ty).is_implicit()
                    || self.args.reflection.conversion(&right.ty, &left.ty).is_implicit()));

        if compatible {
            Ok(binary(op_kind, Type::Bool, left, right, span))
        } else {
            Err(ParseError::incompatible_operands(
                &op.to_string(),
                &left.ty,
                &right.ty,
                span,
            ))
        }
    }

    fn bind_comparison(
        &mut self,
        op: ast::BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        use ast::BinaryOp as P;

        let promoted = promote_numeric(&left.ty, &right.ty).ok_or_else(|| {
            ParseError::incompatible_operands(&op.to_string(), &left.ty, &right.ty, span.clone())
        })?;

        let left = self.convert(left, &promoted)?;
        let right = self.convert(right, &promoted)?;

        let op = match op {
            P::Lt => BinOp::Lt,
            P::Le => BinOp::Le,
            P::Gt => BinOp::Gt,
            P::Ge => BinOp::Ge,
            _ => unreachable!("comparison operator"),
        };

        Ok(binary(op, Type::Bool, left, right, span))
    }

    fn bind_bitwise(
        &mut self,
        op: ast::BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        use ast::BinaryOp as P;

        let op_kind = match op {
            P::BitAnd => BinOp::BitAnd,
            P::BitOr => BinOp::BitOr,
            P::BitXor => BinOp::BitXor,
            _ => unreachable!("bitwise operator"),
        };

        // Bool & bool is the non-short-circuit form.
        if left.ty == Type::Bool && right.ty == Type::Bool {
            return Ok(binary(op_kind, Type::Bool, left, right, span));
        }

        let promoted = promote_numeric(&left.ty, &right.ty)
            .filter(Type::is_integer)
            .ok_or_else(|| {
                ParseError::incompatible_operands(
                    &op.to_string(),
                    &left.ty,
                    &right.ty,
                    span.clone(),
                )
            })?;

        let left = self.convert(left, &promoted)?;
        let right = self.convert(right, &promoted)?;
        Ok(binary(op_kind, promoted, left, right, span))
    }

    fn bind_shift(
        &mut self,
        op: ast::BinaryOp,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let op_kind = if op == ast::BinaryOp::Shl {
            BinOp::Shl
        } else {
            BinOp::Shr
        };

        let left = match &left.ty {
            Type::Int32 | Type::Int64 | Type::UInt32 | Type::UInt64 => left,
            Type::Char => self.convert(left, &Type::Int32)?,
            other => {
                return Err(ParseError::incompatible_operands(
                    &op.to_string(),
                    other,
                    &right.ty,
                    span,
                ));
            }
        };

        // The shift count is an int.
        let right_ty = right.ty.clone();
        let right = self.convert(right, &Type::Int32).map_err(|_| {
            ParseError::incompatible_operands(&op.to_string(), &left.ty, &right_ty, span.clone())
        })?;

        let ty = left.ty.clone();
        Ok(binary(op_kind, ty, left, right, span))
    }

    fn bind_coalesce(
        &mut self,
        left: TypedExpr,
        right: TypedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        if !left.ty.is_reference() {
            return Err(ParseError::incompatible_operands(
                "??", &left.ty, &right.ty, span,
            ));
        }

        if left.ty == Type::Null {
            let ty = right.ty.clone();
            return Ok(binary(BinOp::Coalesce, ty, left, right, span));
        }

        let refl = self.args.reflection;
        if refl.conversion(&right.ty, &left.ty).is_implicit() {
            let ty = left.ty.clone();
            let right = self.convert(right, &ty)?;
            Ok(binary(BinOp::Coalesce, ty, left, right, span))
        } else if refl.conversion(&left.ty, &right.ty).is_implicit() {
            let ty = right.ty.clone();
            let left = self.convert(left, &ty)?;
            Ok(binary(BinOp::Coalesce, ty, left, right, span))
        } else {
            Err(ParseError::new(
                ParseErrorKind::NoCommonType {
                    left: left.ty.clone(),
                    right: right.ty.clone(),
                },
                span,
            ))
        }
    }

    fn bind_conditional(
        &mut self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let cond = self.bind_expr(cond)?;
        let cond = self.convert(cond, &Type::Bool)?;

        let then_expr = self.bind_expr(then_expr)?;
        let else_expr = self.bind_expr(else_expr)?;

        // The branches converge: the narrower implicitly converts to the
        // wider.
        let refl = self.args.reflection;
        let (ty, then_expr, else_expr) = if then_expr.ty == else_expr.ty {
            (then_expr.ty.clone(), then_expr, else_expr)
        } else if let Some(promoted) = promote_numeric(&then_expr.ty, &else_expr.ty) {
            let then_expr = self.convert(then_expr, &promoted)?;
            let else_expr = self.convert(else_expr, &promoted)?;
            (promoted, then_expr, else_expr)
        } else if refl.conversion(&then_expr.ty, &else_expr.ty).is_implicit() {
            let ty = else_expr.ty.clone();
            let then_expr = self.convert(then_expr, &ty)?;
            (ty, then_expr, else_expr)
        } else if refl.conversion(&else_expr.ty, &then_expr.ty).is_implicit() {
            let ty = then_expr.ty.clone();
            let else_expr = self.convert(else_expr, &ty)?;
            (ty, then_expr, else_expr)
        } else {
            return Err(ParseError::new(
                ParseErrorKind::NoCommonType {
                    left: then_expr.ty.clone(),
                    right: else_expr.ty.clone(),
                },
                span,
            ));
        };

        Ok(TypedExpr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            ty,
            span,
        ))
    }

    // === Members, indexing, calls ===

    fn bind_member(
        &mut self,
        base: &SpannedExpr,
        name: &str,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let ignore_case = self.ignore_case();

        match self.bind_inner(base)? {
            Bound::TypeRef(rt, _) => {
                let members =
                    self.args
                        .reflection
                        .find_members(rt.target(), name, ignore_case);
                for member in &members {
                    if let Member::Property(p) = member {
                        if p.is_static {
                            return Ok(TypedExpr::new(
                                ExprKind::Member {
                                    target: None,
                                    property: p.clone(),
                                },
                                p.ty.clone(),
                                span,
                            ));
                        }
                    }
                }
                Err(ParseError::unknown_member(rt.target(), name, span))
            }
            Bound::Expr(target) => {
                let members = self
                    .args
                    .reflection
                    .find_members(&target.ty, name, ignore_case);
                for member in &members {
                    if let Member::Property(p) = member {
                        if !p.is_static {
                            return Ok(TypedExpr::new(
                                ExprKind::Member {
                                    target: Some(Box::new(target)),
                                    property: p.clone(),
                                },
                                p.ty.clone(),
                                span,
                            ));
                        }
                    }
                }

                // Static resolution found nothing at all: dynamic-capable
                // receivers fall back to a late-bound read. Static
                // precedence is absolute, so any static member of this
                // name suppresses the fallback.
                if members.is_empty() && self.args.reflection.is_dynamic(&target.ty) {
                    return Ok(TypedExpr::new(
                        ExprKind::DynamicGet {
                            receiver: Box::new(target),
                            name: Arc::from(name),
                        },
                        Type::Object,
                        span,
                    ));
                }

                Err(ParseError::unknown_member(&target.ty, name, span))
            }
        }
    }

    fn bind_index(
        &mut self,
        base: &SpannedExpr,
        index: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let target = self.bind_expr(base)?;
        let index = self.bind_expr(index)?;

        let members = self
            .args
            .reflection
            .find_members(&target.ty, "", self.ignore_case());

        for member in &members {
            if let Member::Indexer(indexer) = member {
                if self
                    .args
                    .reflection
                    .conversion(&index.ty, &indexer.key)
                    .is_implicit()
                {
                    let index = self.convert(index, &indexer.key.clone())?;
                    return Ok(TypedExpr::new(
                        ExprKind::Call {
                            target: CallTarget::Indexer(indexer.clone()),
                            receiver: Some(Box::new(target)),
                            args: vec![index],
                        },
                        indexer.value.clone(),
                        span,
                    ));
                }
            }
        }

        Err(ParseError::unknown_member(&target.ty, "[index]", span))
    }

    fn bind_call(
        &mut self,
        callee: &SpannedExpr,
        args: &[SpannedExpr],
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let bound_args: Vec<TypedExpr> = args
            .iter()
            .map(|a| self.bind_expr(a))
            .collect::<Result<_, _>>()?;

        if let Ast::Member { expr: base, name } = &callee.node {
            return self.bind_method_call(base, name, bound_args, span);
        }

        // Calling a plain expression: the callee must be a function value.
        let callee = self.bind_expr(callee)?;
        let sig = match &callee.ty {
            Type::Function(sig) => sig.clone(),
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::NotCallable(other.clone()),
                    span,
                ));
            }
        };

        if sig.params.len() != bound_args.len() {
            let arg_types: Vec<Type> = bound_args.iter().map(|a| a.ty.clone()).collect();
            return Err(ParseError::no_applicable_method(
                &callee_name(&callee),
                &arg_types,
                span,
            ));
        }

        let mut converted = Vec::with_capacity(bound_args.len());
        for (arg, param) in bound_args.into_iter().zip(sig.params.iter()) {
            converted.push(self.convert(arg, param)?);
        }

        Ok(TypedExpr::new(
            ExprKind::Call {
                target: CallTarget::Invoke,
                receiver: Some(Box::new(callee)),
                args: converted,
            },
            sig.result.clone(),
            span,
        ))
    }

    fn bind_method_call(
        &mut self,
        base: &SpannedExpr,
        name: &str,
        args: Vec<TypedExpr>,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let ignore_case = self.ignore_case();
        let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();

        match self.bind_inner(base)? {
            Bound::TypeRef(rt, _) => {
                let candidates: Vec<_> = self
                    .args
                    .reflection
                    .find_members(rt.target(), name, ignore_case)
                    .into_iter()
                    .filter_map(|m| match m {
                        Member::Method(m) if m.is_static => Some(m),
                        _ => None,
                    })
                    .collect();

                if candidates.is_empty() {
                    return Err(ParseError::unknown_member(rt.target(), name, span));
                }

                match overload::resolve_overload(candidates, &arg_types, self.args.reflection) {
                    Ok(method) => self.finish_method_call(method, None, args, span),
                    Err(e) => Err(overload_error(e, name, &arg_types, span)),
                }
            }
            Bound::Expr(receiver) => self.bind_instance_call(receiver, name, args, span),
        }
    }

    fn bind_instance_call(
        &mut self,
        receiver: TypedExpr,
        name: &str,
        args: Vec<TypedExpr>,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let ignore_case = self.ignore_case();
        let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();

        let members = self
            .args
            .reflection
            .find_members(&receiver.ty, name, ignore_case);
        let instance_methods: Vec<_> = members
            .iter()
            .filter_map(|m| match m {
                Member::Method(m) if !m.is_static => Some(m.clone()),
                _ => None,
            })
            .collect();
        let any_static_member = !members.is_empty();

        let mut ambiguous = None;
        if !instance_methods.is_empty() {
            match overload::resolve_overload(instance_methods, &arg_types, self.args.reflection) {
                Ok(method) => {
                    return self.finish_method_call(method, Some(receiver), args, span);
                }
                Err(OverloadError::Ambiguous { candidates }) => {
                    ambiguous = Some(candidates);
                }
                Err(OverloadError::NoMatch) => {}
            }
        }

        // Extension methods are searched only after instance resolution
        // fails.
        let extensions =
            self.args
                .reflection
                .extension_methods(&receiver.ty, name, ignore_case);
        if !extensions.is_empty() {
            let mut ext_arg_types = Vec::with_capacity(arg_types.len() + 1);
            ext_arg_types.push(receiver.ty.clone());
            ext_arg_types.extend(arg_types.iter().cloned());

            match overload::resolve_overload(extensions, &ext_arg_types, self.args.reflection) {
                Ok(method) => {
                    return self.finish_extension_call(method, receiver, args, span);
                }
                Err(OverloadError::Ambiguous { candidates }) => {
                    ambiguous.get_or_insert(candidates);
                }
                Err(OverloadError::NoMatch) => {}
            }
        }

        if let Some(candidates) = ambiguous {
            return Err(ParseError::ambiguous_method(name, candidates, span));
        }

        // The universal ToString() applies to every type.
        if args.is_empty() && names_match(name, "ToString", ignore_case) {
            return Ok(TypedExpr::new(
                ExprKind::Call {
                    target: CallTarget::ToText,
                    receiver: Some(Box::new(receiver)),
                    args: Vec::new(),
                },
                Type::String,
                span,
            ));
        }

        // No static member of this name at all: dynamic-capable receivers
        // get a late-bound invocation.
        if !any_static_member && self.args.reflection.is_dynamic(&receiver.ty) {
            return Ok(TypedExpr::new(
                ExprKind::DynamicCall {
                    receiver: Box::new(receiver),
                    name: Arc::from(name),
                    args,
                },
                Type::Object,
                span,
            ));
        }

        if any_static_member {
            Err(ParseError::no_applicable_method(name, &arg_types, span))
        } else {
            Err(ParseError::unknown_member(&receiver.ty, name, span))
        }
    }

    fn finish_method_call(
        &mut self,
        method: crate::reflect::Method,
        receiver: Option<TypedExpr>,
        args: Vec<TypedExpr>,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let params = method.sig.params.clone();
        let mut converted = Vec::with_capacity(args.len());
        for (arg, param) in args.into_iter().zip(params.iter()) {
            converted.push(self.convert(arg, param)?);
        }

        let ty = method.sig.result.clone();
        Ok(TypedExpr::new(
            ExprKind::Call {
                target: CallTarget::Method(method),
                receiver: receiver.map(Box::new),
                args: converted,
            },
            ty,
            span,
        ))
    }

    fn finish_extension_call(
        &mut self,
        method: crate::reflect::Method,
        receiver: TypedExpr,
        args: Vec<TypedExpr>,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let params = method.sig.params.clone();
        let receiver = self.convert(receiver, &params[0])?;

        let mut converted = Vec::with_capacity(args.len());
        for (arg, param) in args.into_iter().zip(params[1..].iter()) {
            converted.push(self.convert(arg, param)?);
        }

        let ty = method.sig.result.clone();
        Ok(TypedExpr::new(
            ExprKind::Call {
                target: CallTarget::Method(method),
                receiver: Some(Box::new(receiver)),
                args: converted,
            },
            ty,
            span,
        ))
    }

    // === Type operations ===

    fn bind_cast(
        &mut self,
        type_name: &str,
        operand: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let rt = self.resolve_type(type_name, &span)?;
        let target = rt.target().clone();
        let expr = self.bind_expr(operand)?;

        match self.args.reflection.conversion(&expr.ty, &target) {
            Conversion::Identity => Ok(expr),
            Conversion::Implicit | Conversion::Explicit => Ok(TypedExpr::new(
                ExprKind::Cast {
                    kind: CastKind::Convert,
                    expr: Box::new(expr),
                    target: target.clone(),
                },
                target,
                span,
            )),
            Conversion::None => Err(ParseError::type_mismatch(&target, &expr.ty, span)),
        }
    }

    fn bind_type_test(
        &mut self,
        operand: &SpannedExpr,
        type_name: &str,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let expr = self.bind_expr(operand)?;
        let rt = self.resolve_type(type_name, &span)?;

        Ok(TypedExpr::new(
            ExprKind::Cast {
                kind: CastKind::Test,
                expr: Box::new(expr),
                target: rt.target().clone(),
            },
            Type::Bool,
            span,
        ))
    }

    fn bind_try_cast(
        &mut self,
        operand: &SpannedExpr,
        type_name: &str,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        let expr = self.bind_expr(operand)?;
        let rt = self.resolve_type(type_name, &span)?;
        let target = rt.target().clone();

        // `as` produces null on failure, so the target must admit null.
        if !target.is_reference() {
            return Err(ParseError::incompatible_operand("as", &target, span));
        }

        Ok(TypedExpr::new(
            ExprKind::Cast {
                kind: CastKind::TryRef,
                expr: Box::new(expr),
                target: target.clone(),
            },
            target,
            span,
        ))
    }

    fn bind_typeof(&mut self, type_name: &str, span: Span) -> Result<TypedExpr, ParseError> {
        let rt = self.resolve_type(type_name, &span)?;
        Ok(TypedExpr::new(
            ExprKind::Constant(Value::Type(rt.target().clone())),
            Type::Meta,
            span,
        ))
    }

    fn bind_default(&mut self, type_name: &str, span: Span) -> Result<TypedExpr, ParseError> {
        let rt = self.resolve_type(type_name, &span)?;
        let target = rt.target().clone();
        let value = default_value(&target);
        Ok(TypedExpr::new(ExprKind::Constant(value), target, span))
    }

    // === Assignment ===

    fn bind_assign(
        &mut self,
        target: &SpannedExpr,
        value: &SpannedExpr,
        span: Span,
    ) -> Result<TypedExpr, ParseError> {
        if self.args.settings.assignment() == AssignmentPolicy::None {
            return Err(ParseError::new(ParseErrorKind::AssignmentDisabled, span));
        }

        let value = self.bind_expr(value)?;

        match &target.node {
            Ast::Ident(name) => {
                let bound = self.bind_ident(name, target.span.clone())?;
                match bound {
                    Bound::Expr(expr) => match expr.kind {
                        ExprKind::Param { name, index } => {
                            let ty = expr.ty;
                            let value = self.convert(value, &ty)?;
                            Ok(TypedExpr::new(
                                ExprKind::Assign {
                                    target: AssignTarget::Param { name, index },
                                    value: Box::new(value),
                                },
                                ty,
                                span,
                            ))
                        }
                        // Registered identifiers are constants.
                        _ => Err(ParseError::new(
                            ParseErrorKind::AssignmentToConstant(name.clone()),
                            span,
                        )),
                    },
                    Bound::TypeRef(..) => {
                        Err(ParseError::new(ParseErrorKind::NotAnLValue, span))
                    }
                }
            }
            Ast::Member { expr: base, name } => {
                let bound = self.bind_member(base, name, target.span.clone())?;
                match bound.kind {
                    ExprKind::Member {
                        target: member_target,
                        property,
                    } if property.setter.is_some() => {
                        let ty = property.ty.clone();
                        let value = self.convert(value, &ty)?;
                        Ok(TypedExpr::new(
                            ExprKind::Assign {
                                target: AssignTarget::Member {
                                    target: member_target,
                                    property,
                                },
                                value: Box::new(value),
                            },
                            ty,
                            span,
                        ))
                    }
                    // Read-only members and dynamic fallbacks are not
                    // assignable.
                    _ => Err(ParseError::new(ParseErrorKind::NotAnLValue, span)),
                }
            }
            Ast::Index { expr: base, index } => {
                let bound = self.bind_index(base, index, target.span.clone())?;
                match bound.kind {
                    ExprKind::Call {
                        target: CallTarget::Indexer(indexer),
                        receiver: Some(receiver),
                        mut args,
                    } if indexer.setter.is_some() => {
                        let ty = indexer.value.clone();
                        let value = self.convert(value, &ty)?;
                        let index = args.pop().expect("bound indexer has a key");
                        Ok(TypedExpr::new(
                            ExprKind::Assign {
                                target: AssignTarget::Index {
                                    target: receiver,
                                    index: Box::new(index),
                                    indexer,
                                },
                                value: Box::new(value),
                            },
                            ty,
                            span,
                        ))
                    }
                    _ => Err(ParseError::new(ParseErrorKind::NotAnLValue, span)),
                }
            }
            _ => Err(ParseError::new(ParseErrorKind::NotAnLValue, span)),
        }
    }
}

/// Build a binary node.
fn binary(op: BinOp, ty: Type, left: TypedExpr, right: TypedExpr, span: Span) -> TypedExpr {
    TypedExpr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        span,
    )
}

fn bind_real_literal(value: f64, suffix: RealSuffix, span: Span) -> TypedExpr {
    let (value, ty) = match suffix {
        RealSuffix::None | RealSuffix::Double => (Value::Double(value), Type::Double),
        RealSuffix::Single => (Value::Single(value as f32), Type::Single),
        RealSuffix::Decimal => (Value::Decimal(Decimal(value)), Type::Decimal),
    };
    TypedExpr::new(ExprKind::Constant(value), ty, span)
}

/// The default value of a type: zero for the numeric lanes, false for
/// bool, NUL for char, null for reference types.
fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Bool => Value::Bool(false),
        Type::Char => Value::Char('\0'),
        Type::Int32 => Value::Int32(0),
        Type::Int64 => Value::Int64(0),
        Type::UInt32 => Value::UInt32(0),
        Type::UInt64 => Value::UInt64(0),
        Type::Single => Value::Single(0.0),
        Type::Double => Value::Double(0.0),
        Type::Decimal => Value::Decimal(Decimal(0.0)),
        _ => Value::Null,
    }
}

/// Best-effort name for a callee, used in error messages.
fn callee_name(callee: &TypedExpr) -> String {
    match &callee.kind {
        ExprKind::Param { name, .. } => name.to_string(),
        ExprKind::Constant(Value::Function(f)) => f.name.to_string(),
        _ => "<function>".to_string(),
    }
}

fn overload_error(e: OverloadError, name: &str, arg_types: &[Type], span: Span) -> ParseError {
    match e {
        OverloadError::NoMatch => ParseError::no_applicable_method(name, arg_types, span),
        OverloadError::Ambiguous { candidates } => {
            ParseError::ambiguous_method(name, candidates, span)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Identifier;

    fn bind_text(
        text: &str,
        settings: &Settings,
        parameters: &[Parameter],
    ) -> Result<TypedExpr, ParseError> {
        let ast = dexpr_parser::parse(text, settings).map_err(ParseError::from)?;
        let mut args = ParserArguments::new(text, settings, settings, None, parameters);
        bind(&ast, &mut args)
    }

    fn settings() -> Settings {
        let mut settings = Settings::empty(true);
        settings
            .set_identifier(Identifier::new("answer", 42))
            .unwrap();
        settings
    }

    #[test]
    fn literal_types() {
        let settings = settings();
        assert_eq!(bind_text("1", &settings, &[]).unwrap().ty, Type::Int32);
        assert_eq!(bind_text("1L", &settings, &[]).unwrap().ty, Type::Int64);
        assert_eq!(bind_text("1u", &settings, &[]).unwrap().ty, Type::UInt32);
        assert_eq!(bind_text("1.0", &settings, &[]).unwrap().ty, Type::Double);
        assert_eq!(bind_text("1f", &settings, &[]).unwrap().ty, Type::Single);
        assert_eq!(bind_text("1m", &settings, &[]).unwrap().ty, Type::Decimal);
        assert_eq!(bind_text("'c'", &settings, &[]).unwrap().ty, Type::Char);
        assert_eq!(
            bind_text("\"s\"", &settings, &[]).unwrap().ty,
            Type::String
        );
    }

    #[test]
    fn unsuffixed_literal_widens_by_magnitude() {
        let settings = settings();
        assert_eq!(
            bind_text("2147483648", &settings, &[]).unwrap().ty,
            Type::Int64
        );
        assert_eq!(
            bind_text("9223372036854775808", &settings, &[]).unwrap().ty,
            Type::UInt64
        );
    }

    #[test]
    fn mixed_arithmetic_promotes() {
        let settings = settings();
        assert_eq!(
            bind_text("1 + 2L", &settings, &[]).unwrap().ty,
            Type::Int64
        );
        assert_eq!(
            bind_text("1 + 0.5", &settings, &[]).unwrap().ty,
            Type::Double
        );
    }

    #[test]
    fn identifier_resolution_records_use() {
        let settings = settings();
        let ast = dexpr_parser::parse("answer + 1", &settings).unwrap();
        let mut args = ParserArguments::new("answer + 1", &settings, &settings, None, &[]);
        bind(&ast, &mut args).unwrap();
        assert!(args.used_identifiers.contains("answer"));
    }

    #[test]
    fn parameter_beats_identifier() {
        let settings = settings();
        let params = [Parameter::new("answer", Type::String)];
        let bound = bind_text("answer", &settings, &params).unwrap();
        assert_eq!(bound.ty, Type::String);
    }

    #[test]
    fn unknown_identifier_fails_with_span() {
        let settings = settings();
        let err = bind_text("1 + mystery", &settings, &[]).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownIdentifier(_)));
        assert_eq!(err.span, 4..11);
    }

    #[test]
    fn assignment_requires_policy() {
        let settings = settings();
        let params = [Parameter::new("x", Type::Int32)];
        let err = bind_text("x = 1", &settings, &params).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::AssignmentDisabled));

        let mut enabled = settings.clone();
        enabled.set_assignment(AssignmentPolicy::Equal);
        assert!(bind_text("x = 1", &enabled, &params).is_ok());
    }

    #[test]
    fn root_is_lambda_node() {
        let settings = settings();
        let bound = bind_text("1 + 1", &settings, &[]).unwrap();
        assert!(matches!(bound.kind, ExprKind::Lambda { .. }));
    }

    #[test]
    fn expected_type_inserts_conversion() {
        let settings = settings();
        let ast = dexpr_parser::parse("1", &settings).unwrap();
        let mut args =
            ParserArguments::new("1", &settings, &settings, Some(Type::Double), &[]);
        let bound = bind(&ast, &mut args).unwrap();
        assert_eq!(bound.ty, Type::Double);
    }
}
