//! The polymorphic value every expression evaluates to.

use std::sync::Arc;

use jq_error::EvalError;

use crate::function::FunctionValue;
use crate::object::OrderedObject;
use crate::sequence::Sequence;

/// A JSON-ish value, plus the two variants the language needs that JSON
/// itself doesn't have: `Undefined` ("no result", distinct from `null`) and
/// `Function` (a first-class callable).
#[derive(Debug, Clone)]
pub enum Value {
    /// "No result" — what a path expression produces when nothing matches,
    /// and what a missing object field reads as. Distinct from `Null`.
    Undefined,
    Null,
    Bool(bool),
    /// Always finite — NaN and +/-infinity are rejected at construction
    /// (see [`Value::number`]) since they have no JSON representation.
    Number(f64),
    String(Arc<str>),
    Array(Vec<Value>),
    /// The flattening result-stream variant; see [`Sequence`].
    Sequence(Sequence),
    Object(OrderedObject),
    Function(FunctionValue),
}

impl Value {
    /// Construct a number, rejecting NaN/infinity up front so every other
    /// piece of code that handles `Value::Number` can assume finiteness.
    pub fn number(n: f64) -> Result<Value, EvalError> {
        if n.is_finite() {
            Ok(Value::Number(n))
        } else {
            Err(EvalError::non_finite_number(n))
        }
    }

    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Sequence(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Truthiness per the language's boolean-coercion rules: falsy iff
    /// `undefined`, `null`, `false`, the number `0`, the empty string, or an
    /// empty array/sequence/object. Every other value — including a
    /// non-empty array whose only element is itself falsy, e.g. `[false]`
    /// — is truthy; truthiness looks only at emptiness, never recurses into
    /// elements.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Sequence(seq) => !seq.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
            Value::Function(_) => true,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Sequence(_))
    }

    /// Iterate an array/sequence's elements, or treat a scalar as a
    /// one-element sequence — the usual "singleton" coercion applied
    /// whenever an array context consumes a possibly-scalar value.
    pub fn iter_as_sequence(&self) -> Vec<Value> {
        match self {
            Value::Undefined => Vec::new(),
            Value::Array(items) => items.clone(),
            Value::Sequence(seq) => seq.items().to_vec(),
            other => vec![other.clone()],
        }
    }

    /// String coercion used by the `&` concatenation operator: strings pass
    /// through unchanged, everything else renders to its canonical
    /// compact-JSON-like form. Also used as the memoize cache key.
    pub fn display_string(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_compact_string(),
        }
    }

    fn to_compact_string(&self) -> String {
        match self {
            Value::Undefined => String::new(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_compact_string).collect();
                format!("[{}]", parts.join(","))
            }
            Value::Sequence(seq) => {
                let parts: Vec<String> = seq.iter().map(Value::to_compact_string).collect();
                format!("[{}]", parts.join(","))
            }
            Value::Object(obj) => {
                let parts: Vec<String> = obj
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "\"{}\":{}",
                            k.replace('\\', "\\\\").replace('"', "\\\""),
                            v.to_compact_string()
                        )
                    })
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
            Value::Function(_) => "\"{function}\"".to_string(),
        }
    }

    /// Structural equality used by `distinct()`/`group-by`/`===` internals:
    /// order-insensitive for objects, element-wise for arrays/sequences,
    /// and — unlike the `=`/`!=` operators — `Undefined` compares equal to
    /// itself rather than propagating.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Sequence(a), Value::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Array(a), Value::Sequence(b)) | (Value::Sequence(b), Value::Array(a)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => a.structural_eq(b),
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

/// Renders an integral finite float without a trailing `.0`, matching the
/// usual JSON-number convention; non-integral values use the shortest
/// round-tripping decimal form.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    /// Mirrors [`Value::structural_eq`] except `Undefined` never compares
    /// equal to anything, including itself — this is the `PartialEq` used
    /// implicitly by `assert_eq!` in tests throughout this crate, not the
    /// language-level `=`/`!=` operator (that lives in the evaluator and
    /// has its own three-valued handling of `Undefined`).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => false,
            _ => self.structural_eq(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_numbers() {
        assert!(Value::number(f64::NAN).is_err());
        assert!(Value::number(f64::INFINITY).is_err());
        assert!(Value::number(1.5).is_ok());
    }

    #[test]
    fn falsiness_depends_only_on_emptiness_never_on_element_contents() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Array(vec![Value::Bool(false), Value::Number(1.0)]).is_truthy());
        assert!(Value::Array(vec![Value::Bool(false)]).is_truthy());
    }

    #[test]
    fn object_structural_eq_ignores_order() {
        let mut a = OrderedObject::new();
        a.insert("x", Value::Number(1.0));
        a.insert("y", Value::Number(2.0));
        let mut b = OrderedObject::new();
        b.insert("y", Value::Number(2.0));
        b.insert("x", Value::Number(1.0));
        assert!(Value::Object(a).structural_eq(&Value::Object(b)));
    }

    #[test]
    fn display_string_renders_compact_json_for_non_strings() {
        assert_eq!(Value::string("hi").display_string(), "hi");
        assert_eq!(Value::Number(3.0).display_string(), "3");
        assert_eq!(Value::Array(vec![Value::Number(1.0), Value::Null]).display_string(), "[1,null]");
    }
}
