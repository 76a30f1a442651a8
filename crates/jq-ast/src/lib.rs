//! AST node, arena, and compiled-expression types shared by the parser and
//! evaluator.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod arena;
mod compiled;
mod node;

pub use arena::{Arena, NodeId};
pub use compiled::CompiledExpr;
pub use node::{Arg, BinaryOp, Callee, Node, NodeKind, SortDirection, SortKey, VariableRef};
