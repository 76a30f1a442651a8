//! Stable diagnostic codes for the query engine.
//!
//! This crate provides the canonical definitions of the error codes the
//! engine reports across its lexical, syntactic, type, evaluation, and
//! runtime-resolution layers. The codes are stable and part of the external
//! contract: callers may match on them instead of parsing messages.
//!
//! # Code ranges
//!
//! | Range   | Category                              |
//! |---------|---------------------------------------|
//! | S01xx   | Lexical errors                        |
//! | S02xx   | Syntactic errors (structural)         |
//! | S03xx   | Syntactic errors (contextual)         |
//! | T0xxx   | Argument / conversion type errors     |
//! | T2xxx   | Operator type errors                  |
//! | D1xxx   | Arithmetic / invocation errors        |
//! | D2xxx   | Range errors                          |
//! | D3xxx   | Runtime errors                        |
//! | U1xxx   | Undefined variable / function         |

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::fmt;

/// A stable diagnostic code, grouped by the category prefix in the table
/// above. `as_str` returns the exact code string surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagnosticCode {
    // Lexical: S01xx
    UnterminatedString,
    NumberOutOfRange,
    BadEscape,
    UnterminatedComment,
    UnterminatedRegex,

    // Syntactic (structural): S02xx
    UnexpectedToken,
    ExpectedToken,
    UnexpectedEof,

    // Syntactic (contextual): S03xx
    InvalidPathStep,
    ParentOutsidePath,
    ParserRecursionLimit,

    // Type (argument/conversion): T0xxx
    ArgumentCountMismatch,
    CannotConvertToNumber,
    CannotConvertToString,
    SignatureMismatch,

    // Type (operator): T2xxx
    InvalidOperandType,
    NonComparableOperands,
    MixedTypeOrdering,

    // Arithmetic/invocation: D1xxx
    DivisionByZero,
    ModuloByZero,
    NegationOfNonNumber,
    InvocationOfNonFunction,
    RecursiveDefinition,
    ReduceInsufficientArguments,
    SingleZeroMatches,
    SingleMultipleMatches,

    // Range: D2xxx
    RangeBoundsNotIntegral,
    RangeTooLarge,

    // Runtime: D3xxx
    NumberOverflow,
    SerializeNonFinite,
    RegexZeroLengthMatch,
    ReplacementNotAString,
    StackOverflow,
    UriEncodeSurrogate,
    Cancelled,
    Timeout,

    // Resolution: U1xxx
    UndefinedVariable,
    UndefinedFunction,
}

impl DiagnosticCode {
    /// The stable code string, e.g. `"S0101"`.
    pub fn as_str(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            UnterminatedString => "S0101",
            NumberOutOfRange => "S0102",
            BadEscape => "S0103",
            UnterminatedComment => "S0104",
            UnterminatedRegex => "S0105",

            UnexpectedToken => "S0201",
            ExpectedToken => "S0202",
            UnexpectedEof => "S0203",

            InvalidPathStep => "S0301",
            ParentOutsidePath => "S0302",
            ParserRecursionLimit => "S0303",

            ArgumentCountMismatch => "T0410",
            CannotConvertToNumber => "T0411",
            CannotConvertToString => "T0412",
            SignatureMismatch => "T0413",

            InvalidOperandType => "T2001",
            NonComparableOperands => "T2002",
            MixedTypeOrdering => "T2003",

            DivisionByZero => "D1001",
            ModuloByZero => "D1002",
            NegationOfNonNumber => "D1003",
            InvocationOfNonFunction => "D1004",
            RecursiveDefinition => "D1005",
            ReduceInsufficientArguments => "D1006",
            SingleZeroMatches => "D1007",
            SingleMultipleMatches => "D1008",

            RangeBoundsNotIntegral => "D2001",
            RangeTooLarge => "D2002",

            NumberOverflow => "D3001",
            SerializeNonFinite => "D3002",
            RegexZeroLengthMatch => "D3003",
            ReplacementNotAString => "D3004",
            StackOverflow => "D3005",
            UriEncodeSurrogate => "D3006",
            Cancelled => "D3007",
            Timeout => "D3008",

            UndefinedVariable => "U1001",
            UndefinedFunction => "U1002",
        }
    }

    /// Every core error is fatal to the evaluation that raised it; this
    /// engine has no warning-level diagnostics (unlike an LSP's advisory
    /// ones). Kept as a method rather than a constant so the taxonomy can
    /// grow a non-fatal category later without changing call sites.
    pub fn is_fatal(self) -> bool {
        true
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
