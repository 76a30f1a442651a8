//! Lambda/built-in parameter-type signatures, written with a compact
//! `<...>` notation.
//!
//! A signature is captured verbatim by the parser as a string like
//! `<a<n>:n>` or `<s-nn?:s>` and only interpreted here, at call time. The
//! grammar is deliberately small: each parameter is one type letter,
//! optionally followed by a `<...>` element-type hint (ignored beyond
//! skipping it — we don't recurse into element types, only the top-level
//! shape) and at most one marker (`-` required, `?` optional, `+`
//! contextable). Anything after a top-level `:` is the declared return
//! type and is informational only; call sites never check a result
//! against it.

use jq_error::EvalError;
use jq_value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Required,
    Optional,
    Contextable,
    None,
}

#[derive(Debug, Clone, Copy)]
struct Param {
    type_char: char,
    marker: Marker,
}

/// Parse a signature's parameter list, ignoring the return type entirely.
/// Unrecognized syntax is treated leniently (best-effort, not a hard parse
/// error): a signature that doesn't parse cleanly degrades to "no
/// parameters declared", which just disables checking rather than failing
/// every call.
fn parse_params(signature: &str) -> Vec<Param> {
    let inner = signature.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(signature);
    let params_part = match split_top_level_colon(inner) {
        Some((params, _ret)) => params,
        None => inner,
    };

    let mut params = Vec::new();
    let mut chars = params_part.chars().peekable();
    while let Some(type_char) = chars.next() {
        if let Some('<') = chars.peek() {
            chars.next();
            let mut depth = 1;
            for c in chars.by_ref() {
                match c {
                    '<' => depth += 1,
                    '>' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        let marker = match chars.peek() {
            Some('-') => {
                chars.next();
                Marker::Required
            }
            Some('?') => {
                chars.next();
                Marker::Optional
            }
            Some('+') => {
                chars.next();
                Marker::Contextable
            }
            _ => Marker::None,
        };
        params.push(Param { type_char, marker });
    }
    params
}

/// Split `s` on the first `:` that isn't nested inside `<...>`.
fn split_top_level_colon(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ':' if depth == 0 => return Some((&s[..i], &s[i + 1..])),
            _ => {}
        }
    }
    None
}

fn type_matches(type_char: char, value: &Value) -> bool {
    match type_char {
        's' => matches!(value, Value::String(_)),
        'n' => matches!(value, Value::Number(_)),
        'b' => matches!(value, Value::Bool(_)),
        'l' => matches!(value, Value::Null),
        // 'a' accepts any non-undefined value, not just `Array`/`Sequence`:
        // every builtin that declares an array parameter consumes it via
        // `Value::iter_as_sequence`, which already treats a bare scalar as
        // a one-element sequence (the same singleton coercion path
        // propagation uses throughout), so a singleton group or a single
        // scalar argument must not be rejected here before it ever reaches
        // that logic.
        'a' => true,
        'o' => matches!(value, Value::Object(_)),
        'f' => matches!(value, Value::Function(_)),
        'u' => value.is_undefined(),
        // 'x' (any), 'j' (JSON value), and any other letter the registry
        // happens to use (e.g. the default registry's `append(a, z)`) are
        // accepted unconditionally — the signature grammar names `x`/`j`
        // as wildcards and we extend the same leniency to unknown letters
        // rather than rejecting a builtin's own signature string.
        _ => true,
    }
}

/// Validate `args` against `signature`, inserting the current focus for any
/// trailing contextable parameter the caller omitted. Returns the
/// (possibly extended) argument list to actually invoke the callee with.
pub fn apply_signature(
    signature: Option<&str>,
    mut args: Vec<Value>,
    focus: &Value,
) -> Result<Vec<Value>, EvalError> {
    let Some(signature) = signature else {
        return Ok(args);
    };
    let params = parse_params(signature);
    for (i, param) in params.iter().enumerate() {
        match args.get(i) {
            None => match param.marker {
                Marker::Required => {
                    return Err(EvalError::argument_count_mismatch(
                        &params.len().to_string(),
                        args.len(),
                    ));
                }
                Marker::Contextable => args.push(focus.clone()),
                Marker::Optional | Marker::None => {}
            },
            Some(v) if v.is_undefined() => {
                if param.marker == Marker::Required {
                    return Err(EvalError::signature_mismatch(format!(
                        "argument {} is required but undefined",
                        i + 1
                    )));
                }
            }
            Some(v) => {
                if !type_matches(param.type_char, v) {
                    return Err(EvalError::signature_mismatch(format!(
                        "argument {} expected type '{}', got {}",
                        i + 1,
                        param.type_char,
                        v.type_name()
                    )));
                }
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_types() {
        let args = vec![Value::string("hi"), Value::Number(1.0)];
        let result = apply_signature(Some("<sn:b>"), args, &Value::Undefined);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_mismatched_type() {
        let args = vec![Value::Number(1.0)];
        let result = apply_signature(Some("<s:b>"), args, &Value::Undefined);
        assert!(result.is_err());
    }

    #[test]
    fn required_marker_enforces_argument_count() {
        let result = apply_signature(Some("<s-:b>"), vec![], &Value::Undefined);
        assert!(result.is_err());
    }

    #[test]
    fn contextable_marker_inserts_focus_when_omitted() {
        let focus = Value::string("ctx");
        let result = apply_signature(Some("<s+:b>"), vec![], &focus).expect("fills from focus");
        assert_eq!(result, vec![Value::string("ctx")]);
    }

    #[test]
    fn optional_marker_tolerates_omission() {
        let result = apply_signature(Some("<s?:b>"), vec![], &Value::Undefined);
        assert!(result.is_ok());
    }

    #[test]
    fn nested_element_type_is_skipped_not_misparsed() {
        let args = vec![Value::Array(vec![Value::Number(1.0)])];
        let result = apply_signature(Some("<a<n>:n>"), args, &Value::Undefined);
        assert!(result.is_ok());
    }

    #[test]
    fn unknown_type_letter_is_lenient() {
        let args = vec![Value::Array(vec![]), Value::Number(4.0)];
        let result = apply_signature(Some("<az:a>"), args, &Value::Undefined);
        assert!(result.is_ok());
    }
}
