//! Overload resolution for method calls.
//!
//! Selects the best applicable overload for a set of argument types using
//! conversion-cost ordering: an exact parameter match beats a numeric
//! widening, which beats any other implicit conversion. A tie between
//! candidates neither of which is better is an ambiguity error.

use crate::reflect::{Method, Reflection};
use crate::types::{Conversion, Type};

/// Failure modes of overload resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    /// No candidate accepts the argument types.
    NoMatch,
    /// More than one candidate is best; names the tied signatures.
    Ambiguous { candidates: Vec<String> },
}

/// Conversion cost of a single argument.
///
/// Lower is better; the order is exact match, numeric widening, then any
/// other implicit conversion (boxing, null to reference).
fn arg_cost(from: &Type, to: &Type, conv: Conversion) -> Option<u8> {
    match conv {
        Conversion::Identity => Some(0),
        Conversion::Implicit => {
            if from.is_numeric() && to.is_numeric() {
                Some(1)
            } else {
                Some(2)
            }
        }
        _ => None,
    }
}

/// An applicable candidate with its per-argument costs.
struct Applicable {
    method: Method,
    costs: Vec<u8>,
}

/// True when `a` is better than `b`: at least as cheap for every argument
/// and strictly cheaper for one.
fn is_better(a: &[u8], b: &[u8]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y) && a.iter().zip(b).any(|(x, y)| x < y)
}

/// Resolve the best matching overload for the argument types.
///
/// Candidates whose arity differs or whose parameters do not implicitly
/// accept the arguments are discarded; the survivors are ranked by
/// per-argument conversion cost.
pub fn resolve_overload(
    candidates: Vec<Method>,
    args: &[Type],
    reflection: &dyn Reflection,
) -> Result<Method, OverloadError> {
    let mut applicable = Vec::new();

    'candidates: for method in candidates {
        if method.sig.params.len() != args.len() {
            continue;
        }

        let mut costs = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(method.sig.params.iter()) {
            let conv = reflection.conversion(arg, param);
            match arg_cost(arg, param, conv) {
                Some(cost) => costs.push(cost),
                None => continue 'candidates,
            }
        }

        applicable.push(Applicable { method, costs });
    }

    if applicable.is_empty() {
        return Err(OverloadError::NoMatch);
    }
    if applicable.len() == 1 {
        return Ok(applicable.swap_remove(0).method);
    }

    // Keep the candidates no other candidate beats.
    let undominated: Vec<usize> = (0..applicable.len())
        .filter(|&i| {
            !applicable
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && is_better(&other.costs, &applicable[i].costs))
        })
        .collect();

    match undominated.as_slice() {
        [single] => Ok(applicable.swap_remove(*single).method),
        best => {
            // Identical cost vectors from a re-registered duplicate
            // signature resolve to the most recent registration.
            let first = &applicable[best[0]];
            if best
                .iter()
                .all(|&i| applicable[i].costs == first.costs
                    && applicable[i].method.sig == first.method.sig)
            {
                let last = best[best.len() - 1];
                return Ok(applicable.swap_remove(last).method);
            }

            Err(OverloadError::Ambiguous {
                candidates: best
                    .iter()
                    .map(|&i| describe(&applicable[i].method))
                    .collect(),
            })
        }
    }
}

/// Human-readable signature for ambiguity messages.
fn describe(method: &Method) -> String {
    let params: Vec<_> = method
        .sig
        .params
        .iter()
        .map(Type::display_name)
        .collect();
    format!("{}({})", method.name, params.join(", "))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::eval::Value;
    use crate::registry::Settings;

    fn method(name: &str, params: Vec<Type>, result: Type) -> Method {
        Method::static_fn(name, params, result, |_| Ok(Value::Null))
    }

    fn reflection() -> Settings {
        Settings::empty(true)
    }

    #[test]
    fn exact_match_beats_widening() {
        let refl = reflection();
        let resolved = resolve_overload(
            vec![
                method("f", vec![Type::Double], Type::Double),
                method("f", vec![Type::Int32], Type::Int32),
            ],
            &[Type::Int32],
            &refl,
        )
        .unwrap();
        assert_eq!(resolved.sig.params, vec![Type::Int32]);
    }

    #[test]
    fn widening_beats_boxing() {
        let refl = reflection();
        let resolved = resolve_overload(
            vec![
                method("f", vec![Type::Object], Type::Object),
                method("f", vec![Type::Int64], Type::Int64),
            ],
            &[Type::Int32],
            &refl,
        )
        .unwrap();
        assert_eq!(resolved.sig.params, vec![Type::Int64]);
    }

    #[test]
    fn arity_mismatch_is_no_match() {
        let refl = reflection();
        let err = resolve_overload(
            vec![method("f", vec![Type::Int32, Type::Int32], Type::Int32)],
            &[Type::Int32],
            &refl,
        )
        .unwrap_err();
        assert_eq!(err, OverloadError::NoMatch);
    }

    #[test]
    fn explicit_conversion_is_not_applicable() {
        let refl = reflection();
        let err = resolve_overload(
            vec![method("f", vec![Type::Int32], Type::Int32)],
            &[Type::Int64],
            &refl,
        )
        .unwrap_err();
        assert_eq!(err, OverloadError::NoMatch);
    }

    #[test]
    fn incomparable_candidates_are_ambiguous() {
        let refl = reflection();
        // int32 arg fits both (int64, double) and (double, int64) at the
        // same mixed cost on different positions.
        let err = resolve_overload(
            vec![
                method("f", vec![Type::Int64, Type::Double], Type::Int32),
                method("f", vec![Type::Double, Type::Int64], Type::Int32),
            ],
            &[Type::Int32, Type::Int32],
            &refl,
        )
        .unwrap_err();
        assert!(matches!(err, OverloadError::Ambiguous { .. }));
    }

    #[test]
    fn duplicate_signature_prefers_latest() {
        let refl = reflection();
        let first = method("f", vec![Type::Int32], Type::Int32);
        let second = method("f", vec![Type::Int32], Type::Int32);
        let second_body = Arc::as_ptr(&second.body);
        let resolved = resolve_overload(
            vec![first, second],
            &[Type::Int32],
            &refl,
        )
        .unwrap();
        assert!(std::ptr::eq(
            Arc::as_ptr(&resolved.body) as *const (),
            second_body as *const ()
        ));
    }

    #[test]
    fn same_params_different_result_is_ambiguous() {
        let refl = reflection();
        let resolved = resolve_overload(
            vec![
                method("f", vec![Type::Int32], Type::Int32),
                method("f", vec![Type::Int32], Type::Double),
            ],
            &[Type::Int32],
            &refl,
        );
        assert!(matches!(resolved, Err(OverloadError::Ambiguous { .. })));
    }

    #[test]
    fn null_argument_matches_reference_parameter() {
        let refl = reflection();
        let resolved = resolve_overload(
            vec![method("f", vec![Type::String], Type::Int32)],
            &[Type::Null],
            &refl,
        );
        assert!(resolved.is_ok());
    }
}
