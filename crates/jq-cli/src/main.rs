//! Command-line front-end for the query/transformation engine.
//!
//! I/O glue only: this binary owns JSON encode/decode and argv/stdio
//! plumbing, neither of which the core engine does itself — the engine
//! only ever consumes an already-parsed value tree. Mirrors the
//! out-of-process shim's `{query, data}` -> `{result}` / `{error}` contract,
//! but read from argv/stdio instead of a single JSON request object.
//!
//! Usage:
//!   jq-cli '<query>' [file]          evaluate query against file (or stdin)
//!   jq-cli --stream '<query>' [file] evaluate query against each
//!                                    newline-delimited JSON document
//!   jq-cli --version                 print the engine version
//!   jq-cli --help                    show usage

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::io::{self, BufRead, Read, Write};
use std::process;
use std::sync::Arc;

use jq_engine::{Engine, EngineOptions};
use jq_value::{OrderedObject, Value};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut stream_mode = false;
    let mut positionals: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stream" => stream_mode = true,
            "--version" => {
                println!("jq-cli {}", Engine::version());
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => positionals.push(other.to_string()),
        }
        i += 1;
    }

    let Some(query) = positionals.first() else {
        eprintln!("error: missing query argument");
        print_help();
        process::exit(1);
    };

    let engine = Engine::new(EngineOptions::default().with_caching(true));
    let compiled = match engine.compile(query) {
        Ok(compiled) => compiled,
        Err(err) => {
            print_error(&err.to_string());
            process::exit(1);
        }
    };

    let input: Box<dyn Read> = match positionals.get(1) {
        Some(path) => match std::fs::File::open(path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                eprintln!("error: could not open '{path}': {err}");
                process::exit(1);
            }
        },
        None => Box::new(io::stdin()),
    };

    if stream_mode {
        run_stream(&engine, compiled, input);
    } else {
        run_single(&engine, &compiled, input);
    }
}

fn run_single(engine: &Engine, compiled: &std::sync::Arc<jq_ast::CompiledExpr>, mut input: Box<dyn Read>) {
    let mut text = String::new();
    if let Err(err) = input.read_to_string(&mut text) {
        eprintln!("error: could not read input: {err}");
        process::exit(1);
    }
    let data: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(err) => {
            print_error(&format!("invalid JSON input: {err}"));
            process::exit(1);
        }
    };
    match engine.eval_compiled(compiled, from_json(&data), None) {
        Ok(result) => print_success(&result),
        Err(err) => {
            print_error(&err.to_string());
            process::exit(1);
        }
    }
}

fn run_stream(engine: &Engine, compiled: std::sync::Arc<jq_ast::CompiledExpr>, input: Box<dyn Read>) {
    let reader = io::BufReader::new(input);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut had_error = false;

    // Each line either parses to a document (fed to the evaluator) or fails
    // to parse (reported inline as its own error envelope, without ever
    // reaching the evaluator as a fake `Undefined` document). Interleaving
    // `Document`/`Malformed` keeps one output line per input line.
    enum Line {
        Document(Value),
        Malformed(String),
    }

    let lines = reader.lines().filter_map(|line| {
        let line = line.ok()?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(v) => Some(Line::Document(from_json(&v))),
            Err(err) => Some(Line::Malformed(format!("invalid JSON input: {err}"))),
        }
    });

    let mut lines = lines.peekable();
    while lines.peek().is_some() {
        // Pull a run of well-formed documents and hand it to the evaluator
        // as one batch, then surface the malformed line (if any) that ended
        // the run before resuming.
        let batch: Vec<Value> = std::iter::from_fn(|| match lines.peek() {
            Some(Line::Document(_)) => match lines.next() {
                Some(Line::Document(v)) => Some(v),
                _ => None,
            },
            _ => None,
        })
        .collect();

        for result in engine.eval_stream(Arc::clone(&compiled), None, batch) {
            match result {
                Ok(value) => {
                    let _ = writeln!(out, "{}", encode_success(&value));
                }
                Err(err) => {
                    had_error = true;
                    let _ = writeln!(out, "{}", encode_error(&err.to_string()));
                }
            }
        }

        if let Some(Line::Malformed(_)) = lines.peek() {
            if let Some(Line::Malformed(message)) = lines.next() {
                had_error = true;
                let _ = writeln!(out, "{}", encode_error(&message));
            }
        }
    }

    if had_error {
        process::exit(1);
    }
}

/// Convert an already-decoded `serde_json::Value` into the engine's own
/// [`Value`] — the boundary between JSON syntax (this crate's concern) and
/// the value model the core operates on (the engine's).
fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            Value::number(n.as_f64().unwrap_or(0.0)).unwrap_or(Value::Null)
        }
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let mut obj = OrderedObject::new();
            for (k, v) in map {
                obj.insert(k.clone(), from_json(v));
            }
            Value::Object(obj)
        }
    }
}

/// The inverse of [`from_json`]: render the engine's result back to JSON
/// text for the success envelope. `Undefined` has no JSON representation
/// and is rendered as `null`, matching "no result" at this API boundary.
fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(to_json).collect()),
        Value::Object(obj) => {
            let mut map = serde_json::Map::new();
            for (k, v) in obj.iter() {
                map.insert(k.clone(), to_json(v));
            }
            serde_json::Value::Object(map)
        }
        Value::Function(_) => serde_json::Value::String("{function}".to_string()),
    }
}

fn print_success(value: &Value) {
    println!("{}", encode_success(value));
}

fn print_error(message: &str) {
    eprintln!("{}", encode_error(message));
}

fn encode_success(value: &Value) -> String {
    let mut envelope = serde_json::Map::new();
    envelope.insert("result".to_string(), to_json(value));
    serde_json::Value::Object(envelope).to_string()
}

fn encode_error(message: &str) -> String {
    let mut envelope = serde_json::Map::new();
    envelope.insert("error".to_string(), serde_json::Value::String(message.to_string()));
    serde_json::Value::Object(envelope).to_string()
}

fn print_help() {
    eprintln!("jq-cli: evaluate a query against a JSON value\n");
    eprintln!("Usage:");
    eprintln!("  jq-cli '<query>' [file]          evaluate against file (or stdin)");
    eprintln!("  jq-cli --stream '<query>' [file] evaluate against each newline-delimited");
    eprintln!("                                   JSON document, one result line each");
    eprintln!("  jq-cli --version                 print the engine version");
    eprintln!("  jq-cli --help                    show this message\n");
    eprintln!("Output:");
    eprintln!("  {{\"result\": <value>}} on success, {{\"error\": <message>}} on failure");
    eprintln!("  (exit code 1 on failure)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_through_the_value_model() {
        let input: serde_json::Value =
            serde_json::from_str(r#"{"name":"Alice","tags":["a","b"],"age":30,"active":true,"note":null}"#)
                .expect("valid json");
        let value = from_json(&input);
        let back = to_json(&value);
        assert_eq!(back, input);
    }

    #[test]
    fn undefined_renders_as_null_in_the_success_envelope() {
        assert_eq!(to_json(&Value::Undefined), serde_json::Value::Null);
    }

    #[test]
    fn success_envelope_wraps_the_result_key() {
        let encoded = encode_success(&Value::Number(42.0));
        let parsed: serde_json::Value = serde_json::from_str(&encoded).expect("valid json");
        assert_eq!(parsed["result"], serde_json::json!(42.0));
    }

    #[test]
    fn error_envelope_wraps_the_error_key() {
        let encoded = encode_error("boom");
        let parsed: serde_json::Value = serde_json::from_str(&encoded).expect("valid json");
        assert_eq!(parsed["error"], serde_json::json!("boom"));
    }
}
