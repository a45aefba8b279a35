//! Evaluation: runtime values, the tree-walking evaluator, and its
//! error types.

mod error;
mod evaluator;
mod value;

pub use error::{EvalError, EvalErrorKind};
pub use evaluator::evaluate;
pub use value::{Decimal, FunctionValue, HostRef, NativeFn, Value, ValueError};
