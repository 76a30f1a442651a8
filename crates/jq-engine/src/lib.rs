//! Public façade crate: wires compilation, the compiled-expression cache,
//! and evaluation together behind a single [`Engine`] type so a host
//! embedding this query language doesn't need to hand-assemble
//! `jq-parser`/`jq-cache`/`jq-evaluator`/`jq-functions` itself.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod engine;
mod options;
mod stream;

pub use engine::Engine;
pub use options::EngineOptions;
pub use stream::EvalStream;

pub use jq_error::{EvalError, ParseError, QueryError};
