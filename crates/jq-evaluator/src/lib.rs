//! The tree-walking evaluator: takes a compiled expression and an input
//! value and produces the result, dispatching over the AST arena node by
//! node. See [`eval`] for the entry point and [`context`] for the state
//! threaded through the walk.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod concurrency;
mod context;
mod eval;
mod ordering;
mod signature;

pub use context::{Clock, EvalContext, SharedState, SystemClock};
pub use eval::{apply_function, eval};

use jq_error::EvalError;
use jq_value::Value;

/// Evaluate the compiled expression's root node against `ctx` and collapse
/// the result the way every public entry point should: an empty result
/// becomes `Undefined`, a protected or multi-element sequence becomes an
/// array, a bare singleton unwraps to its element.
pub fn eval_root(ctx: &EvalContext) -> Result<Value, EvalError> {
    let root = ctx.compiled.root();
    Ok(eval::to_scalar(eval(ctx, root)?))
}
