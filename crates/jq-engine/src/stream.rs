//! [`EvalStream`]: lazily evaluates one compiled query against a sequence
//! of already-parsed input documents.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jq_ast::CompiledExpr;
use jq_error::QueryError;
use jq_evaluator::{eval_root, EvalContext, SharedState, SystemClock};
use jq_value::{Environment, FunctionLookup, Value};

/// Evaluates one compiled expression against a sequence of already-parsed
/// input documents, lazily, one `{value | error}` result per document in
/// input order. A per-document evaluation error does not stop the stream —
/// only setting the handle from [`EvalStream::cancellation_handle`] does,
/// and it does so promptly (the next `next()` call returns `None` without
/// evaluating).
///
/// Deliberately generic over `I: Iterator<Item = Value>` rather than over a
/// raw byte reader: the core never parses JSON syntax, so splitting
/// newline-delimited JSON text into individual [`Value`]s is left to the
/// I/O-glue collaborator (`jq-cli`).
pub struct EvalStream<I> {
    registry: Arc<dyn FunctionLookup + Send + Sync>,
    compiled: Arc<CompiledExpr>,
    env: Environment,
    max_depth: usize,
    concurrent: bool,
    cancel: Arc<AtomicBool>,
    iter: I,
}

impl<I> EvalStream<I> {
    pub(crate) fn new(
        registry: Arc<dyn FunctionLookup + Send + Sync>,
        compiled: Arc<CompiledExpr>,
        env: Environment,
        max_depth: usize,
        concurrent: bool,
        iter: I,
    ) -> Self {
        EvalStream { registry, compiled, env, max_depth, concurrent, cancel: Arc::new(AtomicBool::new(false)), iter }
    }

    /// A handle a caller can set from another thread to stop consumption
    /// early; the next call to `next()` returns `None` instead of
    /// evaluating the next queued document.
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }
}

impl<I: Iterator<Item = Value>> Iterator for EvalStream<I> {
    type Item = Result<Value, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.load(Ordering::Relaxed) {
            return None;
        }
        let input = self.iter.next()?;
        // Every document gets its own `SharedState`: a fresh top-level
        // evaluation observes a fresh `now()`, document by document,
        // exactly as if each had been evaluated by a separate `eval` call.
        let shared = Arc::new(SharedState::new(
            Arc::new(SystemClock),
            self.max_depth,
            Arc::clone(&self.cancel),
            self.concurrent,
            Arc::clone(&self.registry),
        ));
        let ctx = EvalContext::top_level(shared, Arc::clone(&self.compiled), self.env.clone(), input);
        Some(eval_root(&ctx).map_err(QueryError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jq_functions::default_registry;

    fn stream(source: &str, inputs: Vec<Value>) -> EvalStream<std::vec::IntoIter<Value>> {
        let compiled = Arc::new(jq_parser::compile(source).expect("compiles"));
        EvalStream::new(
            Arc::new(default_registry()),
            compiled,
            Environment::root(),
            512,
            false,
            inputs.into_iter(),
        )
    }

    #[test]
    fn evaluates_one_result_per_input_document_in_order() {
        let inputs = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        let results: Vec<_> = stream("$ * 10", inputs).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().expect("ok"), &Value::Number(10.0));
        assert_eq!(results[2].as_ref().expect("ok"), &Value::Number(30.0));
    }

    #[test]
    fn a_per_document_error_does_not_abort_the_stream() {
        let inputs = vec![Value::Number(1.0), Value::Number(0.0), Value::Number(2.0)];
        let results: Vec<_> = stream("10 / $", inputs).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn cancellation_handle_stops_the_stream_without_consuming_further_input() {
        let inputs = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        let mut s = stream("$", inputs);
        let handle = s.cancellation_handle();
        assert!(s.next().is_some());
        handle.store(true, Ordering::Relaxed);
        assert!(s.next().is_none());
    }
}
