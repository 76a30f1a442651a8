//! Value ordering for the `^` sort operator.
//!
//! `jq-functions` cannot depend on this crate (that would be a cycle), so it
//! keeps its own miniature copy of the same comparator for `$sort`/`$max`/
//! `$min`/`$distinct`; this is the evaluator's copy, used by the `^`
//! operator's composite multi-key sort.

use std::cmp::Ordering;

use jq_error::EvalError;
use jq_value::Value;

pub fn compare(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.partial_cmp(y).ok_or_else(EvalError::non_comparable_operands)
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(EvalError::mixed_type_ordering()),
    }
}

/// Stable merge sort over `items` with a fallible comparator (a plain
/// `sort_by` can't propagate the `Result` a type-mismatched comparison or a
/// user comparator call can raise).
pub fn merge_sort_by<F>(items: Vec<Value>, cmp: &mut F) -> Result<Vec<Value>, EvalError>
where
    F: FnMut(&Value, &Value) -> Result<Ordering, EvalError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mid = items.len() / 2;
    let mut iter = items.into_iter();
    let left: Vec<Value> = (&mut iter).take(mid).collect();
    let right: Vec<Value> = iter.collect();
    let left = merge_sort_by(left, cmp)?;
    let right = merge_sort_by(right, cmp)?;
    merge(left, right, cmp)
}

fn merge<F>(left: Vec<Value>, right: Vec<Value>, cmp: &mut F) -> Result<Vec<Value>, EvalError>
where
    F: FnMut(&Value, &Value) -> Result<Ordering, EvalError>,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => {
                if cmp(l, r)? != Ordering::Greater {
                    out.push(left.next().unwrap_or(Value::Undefined));
                } else {
                    out.push(right.next().unwrap_or(Value::Undefined));
                }
            }
            (Some(_), None) => out.push(left.next().unwrap_or(Value::Undefined)),
            (None, Some(_)) => out.push(right.next().unwrap_or(Value::Undefined)),
            (None, None) => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sort_is_stable_and_ascending() {
        let items = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        let sorted = merge_sort_by(items, &mut compare).expect("sorts");
        assert_eq!(sorted, vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
    }

    #[test]
    fn mixed_types_are_a_comparison_error() {
        let items = vec![Value::Number(1.0), Value::string("a")];
        assert!(merge_sort_by(items, &mut compare).is_err());
    }
}
