//! Polymorphic value model for the query engine: [`Value`], the
//! insertion-ordered [`object::OrderedObject`], the flattening
//! [`sequence::Sequence`], the persistent [`env::Environment`] frame chain,
//! and callable [`function::FunctionValue`]s.
//!
//! This crate depends on `jq-ast` (for the `NodeId`/`CompiledExpr` a lambda
//! needs to remember its body) but never the other way around, and it does
//! not depend on the evaluator: native built-ins reach back into evaluation
//! only through the abstract [`function::Caller`] capability.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod env;
pub mod function;
pub mod object;
pub mod sequence;
pub mod value;

pub use env::Environment;
pub use function::{Caller, FunctionLookup, FunctionValue, Lambda, Memoized, NativeFunction, PartialApplication};
pub use object::OrderedObject;
pub use sequence::Sequence;
pub use value::Value;
