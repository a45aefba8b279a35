//! Visitor pipeline: ordered tree rewrites applied after binding.
//!
//! Visitors run in insertion order and are de-duplicated by name. The
//! default pipeline holds the reflection-disabling pass; removing it is an
//! explicit opt-in on the interpreter.

use std::sync::Arc;

use crate::error::{ParseError, ParseErrorKind};
use crate::tree::TypedExpr;
use crate::types::Type;

/// A tree-to-tree transform applied post-bind, pre-invoke. May fail the
/// parse.
pub trait Visitor: Send + Sync {
    /// Stable name; a second visitor with the same name is not added.
    fn name(&self) -> &str;

    /// Rewrite or validate the tree.
    fn visit(&self, expr: TypedExpr) -> Result<TypedExpr, ParseError>;
}

/// The ordered, de-duplicated visitor collection.
#[derive(Clone, Default)]
pub struct VisitorSet {
    visitors: Vec<Arc<dyn Visitor>>,
}

impl VisitorSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default pipeline: the reflection-disabling pass.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.add(Arc::new(DisableReflection));
        set
    }

    /// Append a visitor unless one with the same name is present.
    pub fn add(&mut self, visitor: Arc<dyn Visitor>) {
        if !self.contains(visitor.name()) {
            self.visitors.push(visitor);
        }
    }

    /// Remove a visitor by name.
    pub fn remove(&mut self, name: &str) {
        self.visitors.retain(|v| v.name() != name);
    }

    /// True when a visitor with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.visitors.iter().any(|v| v.name() == name)
    }

    /// Apply all visitors in insertion order.
    pub fn apply(&self, mut expr: TypedExpr) -> Result<TypedExpr, ParseError> {
        for visitor in &self.visitors {
            expr = visitor.visit(expr)?;
        }
        Ok(expr)
    }
}

impl std::fmt::Debug for VisitorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.visitors.iter().map(|v| v.name()).collect();
        f.debug_tuple("VisitorSet").field(&names).finish()
    }
}

/// Name of the built-in reflection-disabling visitor.
pub const DISABLE_REFLECTION: &str = "disable-reflection";

/// Fails the parse when the tree reaches the introspection surface:
/// any node whose static type is the type-handle type (`typeof` results,
/// members returning type handles).
pub struct DisableReflection;

impl Visitor for DisableReflection {
    fn name(&self) -> &str {
        DISABLE_REFLECTION
    }

    fn visit(&self, expr: TypedExpr) -> Result<TypedExpr, ParseError> {
        let mut offending_span = None;
        expr.walk(&mut |node| {
            if node.ty == Type::Meta && offending_span.is_none() {
                offending_span = Some(node.span.clone());
            }
        });

        match offending_span {
            Some(span) => Err(ParseError::new(ParseErrorKind::ReflectionDisabled, span)),
            None => Ok(expr),
        }
    }
}
