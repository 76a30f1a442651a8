//! Error types for the query engine.
//!
//! Errors abort the current evaluation immediately and surface to the
//! caller with a stable [`DiagnosticCode`], a human-readable message, and
//! (for lexical/syntactic errors) a byte position and the offending token
//! text. There is no local recovery inside the evaluator.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use jq_diagnostics_codes::DiagnosticCode;
use thiserror::Error;

/// A lexical or syntactic error produced while compiling a query.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{code}: {message} (at byte {position})")]
pub struct ParseError {
    pub code: DiagnosticCode,
    pub message: String,
    pub position: usize,
    pub token_text: Option<String>,
}

impl ParseError {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, position: usize) -> Self {
        ParseError { code, message: message.into(), position, token_text: None }
    }

    pub fn with_token(mut self, token_text: impl Into<String>) -> Self {
        self.token_text = Some(token_text.into());
        self
    }
}

/// An error raised while evaluating a compiled expression.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{code}: {message}")]
pub struct EvalError {
    pub code: DiagnosticCode,
    pub message: String,
    /// Byte position of the AST node that raised the error, when known.
    pub position: Option<usize>,
}

impl EvalError {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        EvalError { code, message: message.into(), position: None }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn division_by_zero() -> Self {
        Self::new(DiagnosticCode::DivisionByZero, "division by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(DiagnosticCode::ModuloByZero, "modulo by zero")
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(DiagnosticCode::UndefinedVariable, format!("variable ${name} is undefined"))
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(DiagnosticCode::UndefinedFunction, format!("function {name} is undefined"))
    }

    pub fn invocation_of_non_function() -> Self {
        Self::new(DiagnosticCode::InvocationOfNonFunction, "attempted to invoke a non-function value")
    }

    pub fn mixed_type_ordering() -> Self {
        Self::new(DiagnosticCode::MixedTypeOrdering, "cannot order operands of different types")
    }

    pub fn non_comparable_operands() -> Self {
        Self::new(
            DiagnosticCode::NonComparableOperands,
            "comparison operands must both be numbers or both be strings",
        )
    }

    pub fn invalid_operand_type(op: &str) -> Self {
        Self::new(DiagnosticCode::InvalidOperandType, format!("invalid operand type for '{op}'"))
    }

    pub fn cannot_convert_to_number(what: &str) -> Self {
        Self::new(DiagnosticCode::CannotConvertToNumber, format!("cannot convert {what} to a number"))
    }

    pub fn cannot_convert_to_string(what: &str) -> Self {
        Self::new(DiagnosticCode::CannotConvertToString, format!("cannot convert {what} to a string"))
    }

    pub fn reduce_insufficient_arguments() -> Self {
        Self::new(
            DiagnosticCode::ReduceInsufficientArguments,
            "reduce of an empty sequence requires an initial value",
        )
    }

    pub fn parent_outside_path() -> Self {
        Self::new(DiagnosticCode::ParentOutsidePath, "'%' used outside a path context")
    }

    pub fn negation_of_non_number(type_name: &str) -> Self {
        Self::new(DiagnosticCode::NegationOfNonNumber, format!("cannot negate a {type_name}"))
    }

    pub fn range_bounds_not_integral() -> Self {
        Self::new(DiagnosticCode::RangeBoundsNotIntegral, "range bounds must be integers")
    }

    pub fn range_too_large(len: f64) -> Self {
        Self::new(DiagnosticCode::RangeTooLarge, format!("range of {len} elements is too large"))
    }

    pub fn number_overflow() -> Self {
        Self::new(DiagnosticCode::NumberOverflow, "arithmetic overflowed to a non-finite number")
    }

    pub fn stack_overflow() -> Self {
        Self::new(DiagnosticCode::StackOverflow, "maximum lambda recursion depth exceeded")
    }

    pub fn cancelled() -> Self {
        Self::new(DiagnosticCode::Cancelled, "evaluation was cancelled")
    }

    pub fn timeout() -> Self {
        Self::new(DiagnosticCode::Timeout, "evaluation exceeded its configured timeout")
    }

    pub fn recursive_definition(name: &str) -> Self {
        Self::new(
            DiagnosticCode::RecursiveDefinition,
            format!("'{name}' is bound to its own definition"),
        )
    }

    pub fn signature_mismatch(message: impl Into<String>) -> Self {
        Self::new(DiagnosticCode::SignatureMismatch, message)
    }

    pub fn argument_count_mismatch(expected: &str, got: usize) -> Self {
        Self::new(
            DiagnosticCode::ArgumentCountMismatch,
            format!("expected {expected} argument(s), got {got}"),
        )
    }

    pub fn non_finite_number(n: f64) -> Self {
        Self::new(
            DiagnosticCode::SerializeNonFinite,
            format!("'{n}' is not a finite number and has no JSON representation"),
        )
    }
}

/// Errors surfaced by the public façade: compile-time or evaluation-time.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl QueryError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            QueryError::Parse(e) => e.code,
            QueryError::Eval(e) => e.code,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type EvalResult<T> = Result<T, EvalError>;
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_carries_d1001() {
        let err = EvalError::division_by_zero();
        assert_eq!(err.code.as_str(), "D1001");
    }

    #[test]
    fn query_error_wraps_both_kinds() {
        let parse: QueryError = ParseError::new(DiagnosticCode::UnexpectedToken, "oops", 3).into();
        let eval: QueryError = EvalError::division_by_zero().into();
        assert_eq!(parse.code().as_str(), "S0201");
        assert_eq!(eval.code().as_str(), "D1001");
    }
}
