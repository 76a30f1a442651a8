//! Implementations of the default registry's named built-ins.

use std::sync::Arc;

use jq_error::EvalError;
use jq_value::{Caller, FunctionValue, Memoized, NativeFunction, OrderedObject, Value};

use crate::ordering::{compare, merge_sort_by};

/// Every built-in in the default registry, in the order they're documented.
pub fn all() -> Vec<NativeFunction> {
    vec![
        native("sum", Some("<a<n>:n>"), sum),
        native("count", Some("<a:n>"), count),
        native("max", Some("<a<n|s>:n|s>"), max),
        native("min", Some("<a<n|s>:n|s>"), min),
        native("average", Some("<a<n>:n>"), average),
        native("sort", Some("<af?:a>"), sort),
        native("distinct", Some("<a:a>"), distinct),
        native("keys", Some("<o:a<s>>"), keys),
        native("append", Some("<az:a>"), append),
        native("exists", Some("<x:b>"), exists),
        native("string", Some("<x:s>"), string),
        native("number", Some("<x:n>"), number),
        native("boolean", Some("<x:b>"), boolean),
        native("not", Some("<x:b>"), not),
        native("length", Some("<x:n>"), length),
        native("substring", Some("<s-nn?:s>"), substring),
        native("uppercase", Some("<s:s>"), uppercase),
        native("lowercase", Some("<s:s>"), lowercase),
        native("join", Some("<a<s>s?:s>"), join),
        native("split", Some("<ss:a<s>>"), split),
        native("reverse", Some("<a:a>"), reverse),
        native("map", Some("<af:a>"), map),
        native("filter", Some("<af:a>"), filter),
        native("reduce", Some("<afz?:x>"), reduce),
        native("each", Some("<of:a>"), each),
        native("merge", Some("<o+:o>"), merge),
        native("now", Some("<:n>"), now),
        native("millis", Some("<:n>"), millis),
        native("memoize", Some("<f:f>"), memoize),
    ]
}

fn native(
    name: &'static str,
    signature: Option<&'static str>,
    func: impl Fn(&mut dyn Caller, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> NativeFunction {
    NativeFunction {
        name: Arc::from(name),
        signature: signature.map(Arc::from),
        func: Arc::new(func),
    }
}

/// Argument `i`, or `Undefined` if the caller passed fewer than `i + 1`.
fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn require_min_args(args: &[Value], min: usize, expected: &str) -> Result<(), EvalError> {
    if args.len() < min {
        Err(EvalError::argument_count_mismatch(expected, args.len()))
    } else {
        Ok(())
    }
}

fn sum(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    let mut total = 0.0;
    for item in arg(args, 0).iter_as_sequence() {
        match item {
            Value::Number(n) => total += n,
            other => return Err(EvalError::cannot_convert_to_number(other.type_name())),
        }
    }
    Value::number(total)
}

fn count(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    Value::number(arg(args, 0).iter_as_sequence().len() as f64)
}

fn max(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    extremum(args, std::cmp::Ordering::Greater)
}

fn min(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    extremum(args, std::cmp::Ordering::Less)
}

fn extremum(args: &[Value], keep_when: std::cmp::Ordering) -> Result<Value, EvalError> {
    let items = arg(args, 0).iter_as_sequence();
    let mut items = items.into_iter();
    let Some(mut best) = items.next() else {
        return Ok(Value::Undefined);
    };
    for item in items {
        if compare(&item, &best)? == keep_when {
            best = item;
        }
    }
    Ok(best)
}

fn average(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    let items = arg(args, 0).iter_as_sequence();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    let mut total = 0.0;
    for item in &items {
        match item {
            Value::Number(n) => total += n,
            other => return Err(EvalError::cannot_convert_to_number(other.type_name())),
        }
    }
    Value::number(total / items.len() as f64)
}

/// `$sort(xs, comparator?)`. With no comparator, ascending default
/// ordering. With a two-arg comparator, `true` from `comparator(a, b)`
/// means `a` must come after `b` — the same convention the
/// `^` sort operator uses, so `function($a,$b){$a < $b}` yields a
/// *descending* result, not an ascending one.
fn sort(caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1 or 2")?;
    let items = arg(args, 0).iter_as_sequence();
    match args.get(1) {
        None => {
            let sorted = merge_sort_by(items, &mut |a, b| compare(a, b))?;
            Ok(Value::Array(sorted))
        }
        Some(comparator) => {
            let sorted = merge_sort_by(items, &mut |a, b| {
                if caller.call(comparator, vec![a.clone(), b.clone()])?.is_truthy() {
                    Ok(std::cmp::Ordering::Greater)
                } else if caller.call(comparator, vec![b.clone(), a.clone()])?.is_truthy() {
                    Ok(std::cmp::Ordering::Less)
                } else {
                    Ok(std::cmp::Ordering::Equal)
                }
            })?;
            Ok(Value::Array(sorted))
        }
    }
}

/// Structural-equality dedup (`distinct` must not use textual comparison),
/// preserving first-occurrence order. Quadratic in the input
/// size, which is fine for the modest sequences this built-in is meant for.
fn distinct(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    let mut out: Vec<Value> = Vec::new();
    for item in arg(args, 0).iter_as_sequence() {
        if !out.iter().any(|seen| seen.structural_eq(&item)) {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn keys(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    match arg(args, 0) {
        Value::Object(obj) => Ok(Value::Array(obj.keys().map(Value::string).collect())),
        other => Err(EvalError::invalid_operand_type(&format!("$keys({})", other.type_name()))),
    }
}

fn append(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2")?;
    let mut items = arg(args, 0).iter_as_sequence();
    items.push(arg(args, 1));
    Ok(Value::Array(items))
}

fn exists(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!arg(args, 0).is_undefined()))
}

fn string(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    Ok(Value::string(arg(args, 0).display_string()))
}

fn number(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    match arg(args, 0) {
        Value::Number(n) => Value::number(n),
        Value::String(s) => {
            let n: f64 =
                s.trim().parse().map_err(|_| EvalError::cannot_convert_to_number(&format!("\"{s}\"")))?;
            Value::number(n)
        }
        Value::Bool(b) => Value::number(if b { 1.0 } else { 0.0 }),
        other => Err(EvalError::cannot_convert_to_number(other.type_name())),
    }
}

fn boolean(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(arg(args, 0).is_truthy()))
}

fn not(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!arg(args, 0).is_truthy()))
}

fn length(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    let n = match arg(args, 0) {
        Value::String(s) => s.chars().count() as f64,
        Value::Array(items) => items.len() as f64,
        Value::Sequence(seq) => seq.len() as f64,
        Value::Object(obj) => obj.len() as f64,
        other => return Err(EvalError::invalid_operand_type(&format!("$length({})", other.type_name()))),
    };
    Value::number(n)
}

/// `$substring(str, start, length?)`. Negative `start` counts from the end
/// of the string, matching this built-in's own documented contract — raw
/// *array* indexing outside a filter is a separate, stricter rule, not
/// this string helper's concern.
fn substring(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2 or 3")?;
    let Value::String(s) = arg(args, 0) else {
        return Err(EvalError::cannot_convert_to_string("$substring's first argument"));
    };
    let Value::Number(start) = arg(args, 1) else {
        return Err(EvalError::cannot_convert_to_number("$substring's start argument"));
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let mut start = start as i64;
    if start < 0 {
        start = (len + start).max(0);
    }
    let start = start.min(len) as usize;
    let end = match args.get(2) {
        Some(Value::Number(count)) => (start as i64 + *count as i64).clamp(start as i64, len) as usize,
        Some(other) => return Err(EvalError::cannot_convert_to_number(other.type_name())),
        None => chars.len(),
    };
    Ok(Value::string(chars[start..end].iter().collect::<String>()))
}

fn uppercase(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::String(s) => Ok(Value::string(s.to_uppercase())),
        other => Err(EvalError::cannot_convert_to_string(other.type_name())),
    }
}

fn lowercase(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::String(s) => Ok(Value::string(s.to_lowercase())),
        other => Err(EvalError::cannot_convert_to_string(other.type_name())),
    }
}

fn join(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1 or 2")?;
    let separator = match args.get(1) {
        Some(Value::String(s)) => s.to_string(),
        Some(other) => return Err(EvalError::cannot_convert_to_string(other.type_name())),
        None => String::new(),
    };
    let mut parts = Vec::new();
    for item in arg(args, 0).iter_as_sequence() {
        match item {
            Value::String(s) => parts.push(s.to_string()),
            other => return Err(EvalError::cannot_convert_to_string(other.type_name())),
        }
    }
    Ok(Value::string(parts.join(&separator)))
}

fn split(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2")?;
    let Value::String(s) = arg(args, 0) else {
        return Err(EvalError::cannot_convert_to_string("$split's first argument"));
    };
    let Value::String(sep) = arg(args, 1) else {
        return Err(EvalError::cannot_convert_to_string("$split's separator argument"));
    };
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(&*sep).map(Value::string).collect()
    };
    Ok(Value::Array(parts))
}

fn reverse(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    let mut items = arg(args, 0).iter_as_sequence();
    items.reverse();
    Ok(Value::Array(items))
}

fn map(caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2")?;
    let f = arg(args, 1);
    let mut out = Vec::new();
    for item in arg(args, 0).iter_as_sequence() {
        let result = caller.call(&f, vec![item])?;
        if !result.is_undefined() {
            out.push(result);
        }
    }
    Ok(Value::Array(out))
}

fn filter(caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2")?;
    let f = arg(args, 1);
    let mut out = Vec::new();
    for item in arg(args, 0).iter_as_sequence() {
        if caller.call(&f, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn reduce(caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2 or 3")?;
    let f = arg(args, 1);
    let items = arg(args, 0).iter_as_sequence();
    let mut iter = items.into_iter();
    let mut acc = match args.get(2) {
        Some(init) => init.clone(),
        None => iter.next().ok_or_else(EvalError::reduce_insufficient_arguments)?,
    };
    for item in iter {
        acc = caller.call(&f, vec![acc, item])?;
    }
    Ok(acc)
}

fn each(caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 2, "2")?;
    let Value::Object(obj) = arg(args, 0) else {
        return Err(EvalError::invalid_operand_type("$each"));
    };
    let f = arg(args, 1);
    let mut out = Vec::new();
    for (key, value) in obj.iter() {
        out.push(caller.call(&f, vec![value.clone(), Value::string(key.clone())])?);
    }
    Ok(Value::Array(out))
}

fn merge(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1 or more")?;
    let mut out = OrderedObject::new();
    for value in args {
        match value {
            Value::Object(obj) => {
                for (k, v) in obj.iter() {
                    out.insert(k.clone(), v.clone());
                }
            }
            other => return Err(EvalError::invalid_operand_type(&format!("$merge({})", other.type_name()))),
        }
    }
    Ok(Value::Object(out))
}

fn now(caller: &mut dyn Caller, _args: &[Value]) -> Result<Value, EvalError> {
    Value::number(caller.now_millis())
}

fn millis(caller: &mut dyn Caller, _args: &[Value]) -> Result<Value, EvalError> {
    Value::number(caller.now_millis())
}

fn memoize(_caller: &mut dyn Caller, args: &[Value]) -> Result<Value, EvalError> {
    require_min_args(args, 1, "1")?;
    match arg(args, 0) {
        Value::Function(f) => Ok(Value::Function(FunctionValue::Memoized(Arc::new(Memoized::new(f))))),
        other => Err(EvalError::invalid_operand_type(&format!("$memoize({})", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCaller;

    impl Caller for NoopCaller {
        fn call(&mut self, f: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
            let Value::Function(FunctionValue::Native(native)) = f else {
                return Err(EvalError::invocation_of_non_function());
            };
            (native.func)(self, &args)
        }

        fn now_millis(&self) -> f64 {
            1_700_000_000_000.0
        }

        fn is_cancelled(&self) -> bool {
            false
        }
    }

    fn run(f: impl Fn(&mut dyn Caller, &[Value]) -> Result<Value, EvalError>, args: &[Value]) -> Value {
        let mut caller = NoopCaller;
        f(&mut caller, args).expect("builtin should not error")
    }

    #[test]
    fn sum_adds_numbers() {
        let xs = Value::Array(vec![Value::Number(10.0), Value::Number(20.5), Value::Number(4.5)]);
        assert_eq!(run(sum, &[xs]), Value::Number(35.0));
    }

    #[test]
    fn sum_rejects_non_numbers() {
        let xs = Value::Array(vec![Value::Number(1.0), Value::string("nope")]);
        let mut caller = NoopCaller;
        assert!(sum(&mut caller, &[xs]).is_err());
    }

    #[test]
    fn count_counts_elements() {
        let xs = Value::Array(vec![Value::Null, Value::Null, Value::Null]);
        assert_eq!(run(count, &[xs]), Value::Number(3.0));
    }

    #[test]
    fn max_and_min_pick_extremes() {
        let xs = Value::Array(vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(run(max, &[xs.clone()]), Value::Number(3.0));
        assert_eq!(run(min, &[xs]), Value::Number(1.0));
    }

    #[test]
    fn average_of_empty_is_undefined() {
        assert!(run(average, &[Value::Array(vec![])]).is_undefined());
    }

    #[test]
    fn distinct_uses_structural_equality() {
        let mut a = OrderedObject::new();
        a.insert("a", Value::Number(1.0));
        a.insert("b", Value::Number(2.0));
        let mut b = OrderedObject::new();
        b.insert("b", Value::Number(2.0));
        b.insert("a", Value::Number(1.0));
        let xs = Value::Array(vec![Value::Object(a), Value::Object(b)]);
        match run(distinct, &[xs]) {
            Value::Array(items) => assert_eq!(items.len(), 1),
            other => panic!("expected an array, got {other:?}"),
        }
    }

    #[test]
    fn sort_with_comparator_follows_after_convention() {
        // `$a < $b` means "a comes after b", so ascending input sorts
        // descending under this comparator.
        let xs = Value::Array((1..=5).map(|n| Value::Number(n as f64)).collect());
        let comparator = NativeFunction {
            name: Arc::from("lt"),
            signature: None,
            func: Arc::new(|_caller: &mut dyn Caller, args: &[Value]| {
                let (Value::Number(a), Value::Number(b)) = (&args[0], &args[1]) else {
                    return Err(EvalError::invalid_operand_type("lt"));
                };
                Ok(Value::Bool(a < b))
            }),
        };
        let f = Value::Function(FunctionValue::Native(Arc::new(comparator)));
        match run(sort, &[xs, f]) {
            Value::Array(items) => {
                assert_eq!(
                    items,
                    vec![
                        Value::Number(5.0),
                        Value::Number(4.0),
                        Value::Number(3.0),
                        Value::Number(2.0),
                        Value::Number(1.0)
                    ]
                );
            }
            other => panic!("expected an array, got {other:?}"),
        }
    }

    #[test]
    fn reduce_without_init_folds_from_first_element() {
        let xs = Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        let add = NativeFunction {
            name: Arc::from("add"),
            signature: None,
            func: Arc::new(|_caller: &mut dyn Caller, args: &[Value]| {
                let (Value::Number(a), Value::Number(b)) = (&args[0], &args[1]) else {
                    return Err(EvalError::invalid_operand_type("add"));
                };
                Value::number(a + b)
            }),
        };
        let f = Value::Function(FunctionValue::Native(Arc::new(add)));
        assert_eq!(run(reduce, &[xs, f]), Value::Number(6.0));
    }

    #[test]
    fn reduce_of_empty_without_init_errors() {
        let mut caller = NoopCaller;
        let add = Value::Function(FunctionValue::Native(Arc::new(NativeFunction {
            name: Arc::from("add"),
            signature: None,
            func: Arc::new(|_: &mut dyn Caller, _: &[Value]| Ok(Value::Undefined)),
        })));
        assert!(reduce(&mut caller, &[Value::Array(vec![]), add]).is_err());
    }

    #[test]
    fn memoize_wraps_a_function_value() {
        let f = Value::Function(FunctionValue::Native(Arc::new(NativeFunction {
            name: Arc::from("id"),
            signature: None,
            func: Arc::new(|_: &mut dyn Caller, args: &[Value]| Ok(args[0].clone())),
        })));
        match run(memoize, &[f]) {
            Value::Function(FunctionValue::Memoized(_)) => {}
            other => panic!("expected a memoized function, got {other:?}"),
        }
    }
}
