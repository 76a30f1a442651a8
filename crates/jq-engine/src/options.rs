//! Builder for the options an [`crate::Engine`] is constructed with.
//!
//! A plain struct with documented defaults and a fluent `with_*` builder,
//! rather than a long flat constructor argument list.

use std::sync::Arc;
use std::time::Duration;

use jq_error::EvalError;
use jq_value::{Caller, NativeFunction, Value};

/// Options recognized by [`crate::Engine::new`].
#[derive(Clone)]
pub struct EngineOptions {
    pub(crate) concurrency: bool,
    pub(crate) max_depth: usize,
    pub(crate) parse_max_depth: usize,
    pub(crate) max_parse_errors: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) caching: bool,
    pub(crate) cache_size: usize,
    pub(crate) registry: jq_functions::Registry,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            concurrency: false,
            // A concrete finite default so a runaway recursive lambda fails
            // fast rather than growing the native call stack until the
            // process aborts.
            max_depth: 1000,
            parse_max_depth: jq_parser::DEFAULT_MAX_DEPTH,
            max_parse_errors: 64,
            timeout: None,
            caching: false,
            cache_size: jq_cache::DEFAULT_CAPACITY,
            registry: jq_functions::default_registry(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable parallel evaluation of independent path/projection steps.
    pub fn with_concurrency(mut self, enabled: bool) -> Self {
        self.concurrency = enabled;
        self
    }

    /// Maximum lambda call recursion depth at evaluation time.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Maximum expression nesting depth the parser will descend before
    /// raising a `ParserRecursionLimit` error, distinct from
    /// [`EngineOptions::with_max_depth`] (which bounds evaluator-side
    /// lambda recursion, not parser call-stack depth).
    pub fn with_parse_max_depth(mut self, max_depth: usize) -> Self {
        self.parse_max_depth = max_depth;
        self
    }

    /// Cap on how many recovery diagnostics [`crate::Engine::compile_with_recovery`]
    /// returns for a single query.
    pub fn with_max_parse_errors(mut self, max_errors: usize) -> Self {
        self.max_parse_errors = max_errors;
        self
    }

    /// Upper bound on total evaluation wall time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable the compiled-expression cache.
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    /// Size the compiled-expression cache (implies `with_caching(true)`).
    pub fn with_cache_size(mut self, capacity: usize) -> Self {
        self.caching = true;
        self.cache_size = capacity;
        self
    }

    /// Register user-supplied functions, overriding any default builtin of
    /// the same name.
    pub fn with_functions(mut self, entries: impl IntoIterator<Item = NativeFunction>) -> Self {
        for function in entries {
            self.registry.register(function);
        }
        self
    }

    /// Shorthand for registering a single function.
    pub fn with_custom_function(
        self,
        name: impl Into<Arc<str>>,
        signature: Option<impl Into<Arc<str>>>,
        func: impl Fn(&mut dyn Caller, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        let function = NativeFunction {
            name: name.into(),
            signature: signature.map(Into::into),
            func: Arc::new(func),
        };
        self.with_functions([function])
    }
}
