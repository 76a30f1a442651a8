//! Per-evaluation state threaded through every `eval` call.
//!
//! Split in two: [`SharedState`] is the handful of things that stay fixed
//! for one *top-level* evaluation no matter how deep the recursion goes
//! (the clock, the recursion-depth counter, the cancellation flag, the
//! function registry), and [`EvalContext`] additionally carries the things
//! that vary at every path/lambda step (`env`, `focus`, `root`). Splitting
//! them keeps a path step's `with_focus` cheap — it clones a handful of
//! `Arc`s, never the registry or the depth counter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use jq_ast::CompiledExpr;
use jq_error::EvalError;
use jq_value::{Environment, FunctionLookup, Value};

/// Abstracts "the current time" so tests can freeze or step it. Two
/// `$now()` calls within one evaluation must agree, and two separate
/// evaluations under an advancing fake clock must differ by exactly the
/// advanced amount — both properties need the clock read to be pluggable,
/// not `SystemTime::now()` baked into the evaluator.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> f64;
}

/// The default clock: wall time, read lazily at most once per top-level
/// evaluation (see [`SharedState::now_millis`]).
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// State shared by every node visited within one top-level evaluation.
/// Cloning an `EvalContext` clones the `Arc<SharedState>` handle only.
pub struct SharedState {
    clock: Arc<dyn Clock>,
    /// Lazily captured on first read so every `$now()`/`$millis()` call
    /// within the same evaluation observes an identical instant.
    now_cache: OnceLock<f64>,
    depth: AtomicUsize,
    pub max_depth: usize,
    pub cancel: Arc<AtomicBool>,
    pub concurrent: bool,
    pub registry: Arc<dyn FunctionLookup + Send + Sync>,
}

impl SharedState {
    pub fn new(
        clock: Arc<dyn Clock>,
        max_depth: usize,
        cancel: Arc<AtomicBool>,
        concurrent: bool,
        registry: Arc<dyn FunctionLookup + Send + Sync>,
    ) -> Self {
        SharedState {
            clock,
            now_cache: OnceLock::new(),
            depth: AtomicUsize::new(0),
            max_depth,
            cancel,
            concurrent,
            registry,
        }
    }

    pub fn now_millis(&self) -> f64 {
        *self.now_cache.get_or_init(|| self.clock.now_millis())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(AtomicOrdering::Relaxed)
    }

    /// Enter a lambda call, raising a stack-overflow error if the
    /// configured recursion limit would be exceeded. Must be paired with
    /// [`SharedState::exit_call`] on every exit path, including errors.
    pub fn enter_call(&self) -> Result<(), EvalError> {
        let depth = self.depth.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        if depth > self.max_depth {
            self.depth.fetch_sub(1, AtomicOrdering::SeqCst);
            return Err(EvalError::stack_overflow());
        }
        Ok(())
    }

    pub fn exit_call(&self) {
        self.depth.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

/// Everything `eval` needs to interpret one AST node.
#[derive(Clone)]
pub struct EvalContext {
    pub shared: Arc<SharedState>,
    pub compiled: Arc<CompiledExpr>,
    pub env: Environment,
    /// `$`: the current focus value.
    pub focus: Value,
    /// `%`: the enclosing focus during path evaluation, one level up.
    pub parent: Option<Value>,
    /// `$$`: the value passed in at the top of the evaluation.
    pub root: Value,
}

impl EvalContext {
    pub fn top_level(
        shared: Arc<SharedState>,
        compiled: Arc<CompiledExpr>,
        env: Environment,
        input: Value,
    ) -> Self {
        EvalContext { shared, compiled, env, focus: input.clone(), parent: None, root: input }
    }

    pub fn with_focus(&self, focus: Value) -> Self {
        EvalContext { parent: Some(self.focus.clone()), focus, ..self.clone() }
    }

    pub fn with_env(&self, env: Environment) -> Self {
        EvalContext { env, ..self.clone() }
    }

    pub fn check_cancelled(&self) -> Result<(), EvalError> {
        if self.shared.is_cancelled() {
            tracing::debug!("evaluation cancelled");
            Err(EvalError::cancelled())
        } else {
            Ok(())
        }
    }
}
