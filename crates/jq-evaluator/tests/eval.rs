use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use jq_evaluator::{eval_root, EvalContext, SharedState, SystemClock};
use jq_functions::default_registry;
use jq_value::{Environment, Value};

fn run(source: &str, input: Value) -> Value {
    let compiled = Arc::new(jq_parser::compile(source).expect("compiles"));
    let shared = Arc::new(SharedState::new(
        Arc::new(SystemClock),
        512,
        Arc::new(AtomicBool::new(false)),
        false,
        Arc::new(default_registry()),
    ));
    let ctx = EvalContext::top_level(shared, compiled, Environment::root(), input);
    eval_root(&ctx).expect("evaluates")
}

fn obj(pairs: &[(&str, Value)]) -> Value {
    let mut o = jq_value::OrderedObject::new();
    for (k, v) in pairs {
        o.insert(*k, v.clone());
    }
    Value::Object(o)
}

#[test]
fn field_access_on_object() {
    let input = obj(&[("name", Value::string("ada"))]);
    assert_eq!(run("name", input), Value::string("ada"));
}

#[test]
fn field_access_broadcasts_over_array() {
    let input = Value::Array(vec![
        obj(&[("price", Value::Number(1.0))]),
        obj(&[("price", Value::Number(2.0))]),
    ]);
    let result = run("price", input);
    assert_eq!(result, Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]));
}

#[test]
fn arithmetic_and_division_by_zero() {
    assert_eq!(run("1 + 2 * 3", Value::Null), Value::Number(7.0));
    let compiled = Arc::new(jq_parser::compile("1 / 0").expect("compiles"));
    let shared = Arc::new(SharedState::new(
        Arc::new(SystemClock),
        512,
        Arc::new(AtomicBool::new(false)),
        false,
        Arc::new(default_registry()),
    ));
    let ctx = EvalContext::top_level(shared, compiled, Environment::root(), Value::Null);
    assert!(eval_root(&ctx).is_err());
}

#[test]
fn equality_is_three_valued_for_undefined() {
    let input = obj(&[]);
    let result = run("missing = 1", input);
    assert!(result.is_undefined());
}

#[test]
fn array_index_and_wildcard() {
    let input = Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
    let result = run("[$[]]", input.clone());
    assert_eq!(result, input);
}

#[test]
fn conditional_expression() {
    assert_eq!(run("true ? 1 : 2", Value::Null), Value::Number(1.0));
    assert_eq!(run("false ? 1 : 2", Value::Null), Value::Number(2.0));
}

#[test]
fn lambda_call_and_recursion() {
    let result = run(
        "($fact := function($n){ $n <= 1 ? 1 : $n * $fact($n - 1) }; $fact(5))",
        Value::Null,
    );
    assert_eq!(result, Value::Number(120.0));
}

#[test]
fn range_generates_inclusive_sequence() {
    let result = run("[1..3]", Value::Null);
    assert_eq!(
        result,
        Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)])
    );
}

#[test]
fn object_constructor_drops_undefined_values() {
    let input = obj(&[("a", Value::Number(1.0))]);
    let result = run("{\"a\": a, \"b\": missing}", input);
    match result {
        Value::Object(o) => {
            assert_eq!(o.get("a"), Some(&Value::Number(1.0)));
            assert_eq!(o.get("b"), None);
        }
        other => panic!("expected object, got {other:?}"),
    }
}

#[test]
fn builtin_registry_function_call() {
    let input = Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
    assert_eq!(run("sum($)", input), Value::Number(6.0));
}

#[test]
fn sort_of_a_singleton_range_unwraps_to_the_bare_scalar() {
    let result = run("(1..1) ^ (function($a, $b){$a < $b})", Value::Null);
    assert_eq!(result, Value::Number(1.0));
}

#[test]
fn descending_sort_by_comparator_lambda() {
    let result = run("1..5 ^ (function($a,$b){$a < $b})", Value::Null);
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
fn count_over_a_singleton_group_accepts_a_bare_scalar_argument() {
    let input = Value::Array(vec![obj(&[("name", Value::string("b"))])]);
    let result = run("count(name)", input);
    assert_eq!(result, Value::Number(1.0));
}

#[test]
fn cancellation_aborts_a_long_running_reduce_promptly() {
    let compiled =
        Arc::new(jq_parser::compile("reduce(1..1000000, function($acc, $n){$acc + $n}, 0)").expect("compiles"));
    let cancel = Arc::new(AtomicBool::new(false));
    let shared = Arc::new(SharedState::new(
        Arc::new(SystemClock),
        usize::MAX,
        Arc::clone(&cancel),
        false,
        Arc::new(default_registry()),
    ));
    let ctx = EvalContext::top_level(shared, compiled, Environment::root(), Value::Null);
    // Flip the handle from another thread almost immediately; the lambda
    // the reduce calls once per element checks it at every call entry, so
    // the evaluation should abort long before all one million additions
    // run.
    std::thread::scope(|scope| {
        scope.spawn(|| {
            std::thread::sleep(std::time::Duration::from_millis(5));
            cancel.store(true, std::sync::atomic::Ordering::Relaxed);
        });
        let result = eval_root(&ctx);
        assert!(result.is_err());
    });
}
