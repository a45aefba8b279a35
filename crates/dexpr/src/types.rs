//! Static type model for bound expressions.
//!
//! Every node of the typed expression tree carries a `Type`. Host types are
//! identified by the alias under which they were registered; primitives map
//! onto the C-family numeric lanes.

use std::fmt;
use std::sync::Arc;

/// The static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The type of the `null` literal before it converts to a reference type.
    Null,
    Bool,
    Char,
    String,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Single,
    Double,
    /// The decimal lane. Distinct from the float lanes: no implicit mixing.
    Decimal,
    /// The top reference type; every value converts to it.
    Object,
    /// A registered host type, identified by its registered alias.
    Host(Arc<str>),
    /// A callable value.
    Function(Arc<FunctionSig>),
    /// A type handle: the static type of `typeof(T)`. This is the
    /// introspection surface the default visitor pipeline forbids.
    Meta,
}

/// Signature of a callable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    pub params: Vec<Type>,
    pub result: Type,
}

/// Classification of a conversion between two static types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Same type.
    Identity,
    /// Applies without a cast: numeric widening, boxing, null to reference.
    Implicit,
    /// Requires a cast: narrowing, unboxing, decimal/float crossing.
    Explicit,
    /// No conversion exists.
    None,
}

impl Conversion {
    /// True for identity and implicit conversions.
    pub fn is_implicit(self) -> bool {
        matches!(self, Conversion::Identity | Conversion::Implicit)
    }

    /// True for any existing conversion.
    pub fn exists(self) -> bool {
        !matches!(self, Conversion::None)
    }
}

impl Type {
    /// Create a host type from a registered alias.
    pub fn host(alias: impl Into<Arc<str>>) -> Self {
        Type::Host(alias.into())
    }

    /// Create a function type.
    pub fn function(params: Vec<Type>, result: Type) -> Self {
        Type::Function(Arc::new(FunctionSig { params, result }))
    }

    /// True for the numeric lanes (including `Char`, which promotes to
    /// `Int32` in arithmetic).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Char
                | Type::Int32
                | Type::Int64
                | Type::UInt32
                | Type::UInt64
                | Type::Single
                | Type::Double
                | Type::Decimal
        )
    }

    /// True for the integer lanes (including `Char`).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Char | Type::Int32 | Type::Int64 | Type::UInt32 | Type::UInt64
        )
    }

    /// True for reference types: values that can be `null`.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Null | Type::String | Type::Object | Type::Host(_) | Type::Function(_)
        )
    }

    /// Human-readable name, used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            Type::Null => "null".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Char => "char".to_string(),
            Type::String => "string".to_string(),
            Type::Int32 => "int".to_string(),
            Type::Int64 => "long".to_string(),
            Type::UInt32 => "uint".to_string(),
            Type::UInt64 => "ulong".to_string(),
            Type::Single => "float".to_string(),
            Type::Double => "double".to_string(),
            Type::Decimal => "decimal".to_string(),
            Type::Object => "object".to_string(),
            Type::Host(name) => name.to_string(),
            Type::Function(sig) => {
                let params: Vec<_> = sig.params.iter().map(Type::display_name).collect();
                format!("({}) -> {}", params.join(", "), sig.result.display_name())
            }
            Type::Meta => "type".to_string(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Classify the conversion from `from` to `to`.
pub fn conversion(from: &Type, to: &Type) -> Conversion {
    if from == to {
        return Conversion::Identity;
    }

    // Everything converts up to object.
    if *to == Type::Object {
        return Conversion::Implicit;
    }

    // null converts to any reference type.
    if *from == Type::Null && to.is_reference() {
        return Conversion::Implicit;
    }

    // object converts down to anything, checked at runtime.
    if *from == Type::Object {
        return Conversion::Explicit;
    }

    if from.is_numeric() && to.is_numeric() {
        return numeric_conversion(from, to);
    }

    Conversion::None
}

/// Conversion between two (distinct) numeric lanes.
fn numeric_conversion(from: &Type, to: &Type) -> Conversion {
    use Type::*;

    let implicit = match from {
        Char => matches!(to, Int32 | Int64 | UInt32 | UInt64 | Single | Double | Decimal),
        Int32 => matches!(to, Int64 | Single | Double | Decimal),
        UInt32 => matches!(to, Int64 | UInt64 | Single | Double | Decimal),
        Int64 => matches!(to, Single | Double | Decimal),
        UInt64 => matches!(to, Single | Double | Decimal),
        Single => matches!(to, Double),
        _ => false,
    };

    if implicit {
        Conversion::Implicit
    } else {
        // Every remaining numeric pair is an explicit narrowing or a
        // decimal/float lane crossing.
        Conversion::Explicit
    }
}

/// Result type of a binary numeric operation over the two operand types,
/// or `None` when the lanes cannot mix without an explicit cast.
pub fn promote_numeric(left: &Type, right: &Type) -> Option<Type> {
    use Type::*;

    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }

    // Char computes as int.
    let l = if *left == Char { Int32 } else { left.clone() };
    let r = if *right == Char { Int32 } else { right.clone() };

    if l == Decimal || r == Decimal {
        // Decimal mixes with the integer lanes only.
        let other = if l == Decimal { &r } else { &l };
        return if *other == Decimal || other.is_integer() {
            Some(Decimal)
        } else {
            None
        };
    }

    if l == Double || r == Double {
        return Some(Double);
    }
    if l == Single || r == Single {
        return Some(Single);
    }

    if l == UInt64 || r == UInt64 {
        // A signed operand cannot implicitly reach ulong.
        let other = if l == UInt64 { &r } else { &l };
        return if matches!(other, UInt64 | UInt32) {
            Some(UInt64)
        } else {
            None
        };
    }

    if l == Int64 || r == Int64 {
        return Some(Int64);
    }

    if l == UInt32 || r == UInt32 {
        let other = if l == UInt32 { &r } else { &l };
        return if *other == UInt32 {
            Some(UInt32)
        } else {
            // uint with int computes as long.
            Some(Int64)
        };
    }

    Some(Int32)
}
