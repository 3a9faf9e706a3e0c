//! Tree walking evaluator.
//!
//! Nothing in here raises. Runtime failures come back as `Value::Error` and stop the enclosing
//! statement list, and every step returns the environment it leaves behind instead of mutating
//! the one it was given.

#[allow(clippy::module_inception)]
mod eval;
mod value;

pub use eval::{evaluate, Evaluation};
pub use value::{EvalError, Value};
