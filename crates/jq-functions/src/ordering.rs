//! Shared ordering used by `$max`/`$min`/`$sort`/`$distinct`.
//!
//! Mirrors the evaluator's `^` sort-operator ordering rules: numbers
//! compare with numbers, strings with strings; anything else is a
//! mixed-type comparison error. This crate cannot depend on `jq-evaluator`
//! (that would be a cycle), so the rule is duplicated here in miniature
//! rather than shared — the built-in's own merge sort is the only caller.

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

/// A stable merge sort over `items` using a fallible comparator. Used
/// instead of `slice::sort_by` because a type-mismatched comparison must
/// propagate a `Result`, which `sort_by`'s closure signature cannot do.
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
                // `<=` (not `<`) on the left keeps the sort stable: ties
                // take the left-hand (earlier) element first.
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
