//! [`Engine`]: the public façade wiring compile, cache, and evaluation
//! together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jq_ast::CompiledExpr;
use jq_cache::CompiledCache;
use jq_diagnostics_codes::DiagnosticCode;
use jq_error::{EvalError, ParseError, QueryError};
use jq_evaluator::{eval_root, EvalContext, SharedState, SystemClock};
use jq_value::{Environment, FunctionLookup, Value};

use crate::options::EngineOptions;
use crate::stream::EvalStream;

/// Compile and evaluate query-language text against JSON-shaped [`Value`]
/// trees. One `Engine` can be shared across threads and evaluated
/// concurrently: the immutable pieces it owns (the registry, the optional
/// cache) only ever hand out `Arc`s to callers, and every evaluation builds
/// its own [`SharedState`]/environment from scratch.
pub struct Engine {
    concurrency: bool,
    max_depth: usize,
    parse_max_depth: usize,
    max_parse_errors: usize,
    timeout: Option<std::time::Duration>,
    registry: Arc<dyn FunctionLookup + Send + Sync>,
    cache: Option<CompiledCache>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let cache = options.caching.then(|| CompiledCache::new(options.cache_size));
        Engine {
            concurrency: options.concurrency,
            max_depth: options.max_depth,
            parse_max_depth: options.parse_max_depth,
            max_parse_errors: options.max_parse_errors,
            timeout: options.timeout,
            registry: Arc::new(options.registry),
            cache,
        }
    }

    /// An `Engine` with every option at its default (no caching, no
    /// concurrency, no timeout, the default builtin registry).
    pub fn with_defaults() -> Self {
        Engine::new(EngineOptions::default())
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Compile `text`, consulting the cache first if one is configured.
    pub fn compile(&self, text: &str) -> Result<Arc<CompiledExpr>, QueryError> {
        tracing::debug!(len = text.len(), cached = self.cache.is_some(), "compile start");
        let max_depth = self.parse_max_depth;
        let compiled = match &self.cache {
            Some(cache) => cache.get_or_compile(text, || jq_parser::compile_with_max_depth(text, max_depth)),
            None => jq_parser::compile_with_max_depth(text, max_depth).map(Arc::new),
        };
        if let Err(err) = &compiled {
            tracing::debug!(code = %err.code, position = err.position, "compile failed");
        }
        compiled.map_err(QueryError::from)
    }

    /// Compile with error recovery, returning every diagnostic collected
    /// along the way (capped at `with_max_parse_errors`), not just the
    /// first. Bypasses the cache: recovery mode is a diagnostics tool, not
    /// a hot path worth caching.
    pub fn compile_with_recovery(&self, text: &str) -> (Result<Arc<CompiledExpr>, ParseError>, Vec<ParseError>) {
        let (result, mut errors) = jq_parser::compile_with_recovery(text);
        errors.truncate(self.max_parse_errors);
        (result.map(Arc::new), errors)
    }

    /// As [`Engine::compile`], but panics on a syntax error. A convenience
    /// for callers with a known-good, hard-coded query text; not part of
    /// the core compile/eval semantics.
    pub fn must_compile(&self, text: &str) -> Arc<CompiledExpr> {
        match self.compile(text) {
            Ok(compiled) => compiled,
            Err(err) => panic!("must_compile: query failed to compile: {err}"),
        }
    }

    /// Compile `text` (using the cache if enabled) and evaluate it against
    /// `input` with no host bindings.
    pub fn eval(&self, text: &str, input: Value) -> Result<Value, QueryError> {
        self.eval_with_bindings(text, input, None)
    }

    /// As [`Engine::eval`], with host-supplied top-level variable
    /// bindings.
    pub fn eval_with_bindings(
        &self,
        text: &str,
        input: Value,
        bindings: Option<&Value>,
    ) -> Result<Value, QueryError> {
        let compiled = self.compile(text)?;
        self.eval_compiled(&compiled, input, bindings)
    }

    /// Evaluate an already-compiled expression against `input`. `bindings`,
    /// when `Some`, must be an object; each of its entries becomes a
    /// root-frame variable. A non-object `bindings` value is treated as no
    /// bindings at all.
    pub fn eval_compiled(
        &self,
        compiled: &Arc<CompiledExpr>,
        input: Value,
        bindings: Option<&Value>,
    ) -> Result<Value, QueryError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let timed_out = Arc::new(AtomicBool::new(false));
        if let Some(duration) = self.timeout {
            spawn_timeout(Arc::clone(&cancel), Arc::clone(&timed_out), duration);
        }
        let shared = Arc::new(SharedState::new(
            Arc::new(SystemClock),
            self.max_depth,
            Arc::clone(&cancel),
            self.concurrency,
            Arc::clone(&self.registry),
        ));
        let env = environment_for_bindings(bindings);
        let ctx = EvalContext::top_level(shared, Arc::clone(compiled), env, input);
        let result = eval_root(&ctx);
        // Evaluation finished (however it finished); tell the timer thread
        // there's nothing left to cancel so it doesn't fire a no-op
        // cancellation against a context nobody is reading anymore.
        cancel.store(true, Ordering::Relaxed);
        result.map_err(|err| remap_timeout(err, &timed_out)).map_err(QueryError::from)
    }

    /// Evaluate the same compiled expression against each value an
    /// iterator produces, in order, yielding one `{value | error}` result
    /// per input document. Per-document errors do not stop the stream;
    /// the returned [`EvalStream`] exposes a cancellation handle that
    /// does. The core never decodes JSON syntax itself — `input` must
    /// already be an iterator of parsed [`Value`]s; splitting
    /// newline-delimited JSON text into that iterator is the I/O-glue
    /// collaborator's job.
    pub fn eval_stream<I>(
        &self,
        compiled: Arc<CompiledExpr>,
        bindings: Option<&Value>,
        input: I,
    ) -> EvalStream<I::IntoIter>
    where
        I: IntoIterator<Item = Value>,
    {
        EvalStream::new(
            Arc::clone(&self.registry),
            compiled,
            environment_for_bindings(bindings),
            self.max_depth,
            self.concurrency,
            input.into_iter(),
        )
    }
}

fn environment_for_bindings(bindings: Option<&Value>) -> Environment {
    match bindings {
        Some(Value::Object(obj)) => {
            Environment::with_bindings(obj.iter().map(|(k, v)| (k.clone(), v.clone())))
        }
        _ => Environment::root(),
    }
}

/// The evaluator's `check_cancelled` raises a generic `Cancelled` error
/// with no way to know *why* the cancellation handle was set — manual
/// cancellation and a timeout look identical from inside `eval`. This
/// upgrades a `Cancelled` error to the more specific `Timeout` one when
/// the engine's own timer (not a caller) was what tripped it.
fn remap_timeout(err: EvalError, timed_out: &AtomicBool) -> EvalError {
    if err.code == DiagnosticCode::Cancelled && timed_out.load(Ordering::Relaxed) {
        let mut timeout_err = EvalError::timeout();
        timeout_err.position = err.position;
        timeout_err
    } else {
        err
    }
}

/// Spawns a detached thread that sleeps for `duration` and then sets both
/// `timed_out` and `cancel`. Not joined: if the evaluation finishes first,
/// the thread simply wakes up later, finds nothing left to do beyond an
/// idempotent store, and exits on its own.
fn spawn_timeout(cancel: Arc<AtomicBool>, timed_out: Arc<AtomicBool>, duration: std::time::Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        timed_out.store(true, Ordering::Relaxed);
        cancel.store(true, Ordering::Relaxed);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use jq_value::OrderedObject;

    fn obj(pairs: &[(&str, Value)]) -> Value {
        let mut o = OrderedObject::new();
        for (k, v) in pairs {
            o.insert(*k, v.clone());
        }
        Value::Object(o)
    }

    #[test]
    fn simple_path_scenario() {
        let engine = Engine::with_defaults();
        let input = obj(&[("name", Value::string("Alice"))]);
        assert_eq!(engine.eval("$.name", input).expect("evaluates"), Value::string("Alice"));
    }

    #[test]
    fn filter_and_projection_scenario() {
        let engine = Engine::with_defaults();
        let users = Value::Array(vec![
            obj(&[("name", Value::string("A")), ("age", Value::Number(25.0))]),
            obj(&[("name", Value::string("B")), ("age", Value::Number(40.0))]),
            obj(&[("name", Value::string("C")), ("age", Value::Number(35.0))]),
        ]);
        let input = obj(&[("users", users)]);
        let result = engine.eval("users[age > 30].name", input).expect("evaluates");
        assert_eq!(result, Value::Array(vec![Value::string("B"), Value::string("C")]));
    }

    #[test]
    fn lambda_and_apply_scenario() {
        let engine = Engine::with_defaults();
        let result = engine
            .eval("5 ~> function($x){$x*2} ~> function($x){$x+1}", Value::Null)
            .expect("evaluates");
        assert_eq!(result, Value::Number(11.0));
    }

    #[test]
    fn aggregation_via_builtin_scenario() {
        let engine = Engine::with_defaults();
        let products = Value::Array(vec![
            obj(&[("price", Value::Number(10.0))]),
            obj(&[("price", Value::Number(20.5))]),
            obj(&[("price", Value::Number(4.5))]),
        ]);
        let input = obj(&[("products", products)]);
        let result = engine.eval("$sum(products.price)", input).expect("evaluates");
        assert_eq!(result, Value::Number(35.0));
    }

    #[test]
    fn group_by_projection_scenario_preserves_first_seen_key_order() {
        let engine = Engine::with_defaults();
        let users = Value::Array(vec![
            obj(&[("name", Value::string("a")), ("department", Value::string("E"))]),
            obj(&[("name", Value::string("b")), ("department", Value::string("S"))]),
            obj(&[("name", Value::string("c")), ("department", Value::string("E"))]),
        ]);
        let input = obj(&[("users", users)]);
        let result = engine.eval("users{department: $count(name)}", input).expect("evaluates");
        match result {
            Value::Object(o) => {
                let keys: Vec<&str> = o.keys().map(|k| k.as_str()).collect();
                assert_eq!(keys, vec!["E", "S"]);
                assert_eq!(o.get("E"), Some(&Value::Number(2.0)));
                assert_eq!(o.get("S"), Some(&Value::Number(1.0)));
            }
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn range_and_descending_sort_scenario() {
        let engine = Engine::with_defaults();
        let result = engine
            .eval("$sort(1..5, function($a,$b){$a < $b})", Value::Null)
            .expect("evaluates");
        assert_eq!(
            result,
            Value::Array(vec![
                Value::Number(5.0),
                Value::Number(4.0),
                Value::Number(3.0),
                Value::Number(2.0),
                Value::Number(1.0),
            ])
        );
    }

    #[test]
    fn host_bindings_are_visible_as_root_frame_variables() {
        let engine = Engine::with_defaults();
        let bindings = obj(&[("greeting", Value::string("hi"))]);
        let result = engine.eval_with_bindings("$greeting", Value::Null, Some(&bindings)).expect("evaluates");
        assert_eq!(result, Value::string("hi"));
    }

    #[test]
    fn caching_reuses_the_compiled_expression() {
        let engine = Engine::new(EngineOptions::default().with_caching(true));
        let first = engine.compile("1 + 1").expect("compiles");
        let second = engine.compile("1 + 1").expect("compiles");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn must_compile_panics_on_syntax_error() {
        let engine = Engine::with_defaults();
        let result = std::panic::catch_unwind(|| engine.must_compile("1 +"));
        assert!(result.is_err());
    }

    #[test]
    fn compile_with_recovery_caps_diagnostics_at_the_configured_limit() {
        let engine = Engine::new(EngineOptions::default().with_max_parse_errors(1));
        let (_, errors) = engine.compile_with_recovery("[1, , , 3]");
        assert!(errors.len() <= 1);
    }

    #[test]
    fn timeout_surfaces_as_a_timeout_error_not_a_generic_cancellation() {
        let engine = Engine::new(
            EngineOptions::default().with_timeout(std::time::Duration::from_millis(5)),
        );
        let result = engine.eval("$reduce(1..10000000, function($acc, $n){$acc + $n}, 0)", Value::Null);
        if let Err(QueryError::Eval(err)) = result {
            assert_eq!(err.code, DiagnosticCode::Timeout);
        }
    }

    #[test]
    fn version_is_nonempty() {
        assert!(!Engine::version().is_empty());
    }
}
