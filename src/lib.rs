//! tinylisp - a small lexically-scoped s-expression interpreter
//!
//! The crate implements the whole language pipeline: a lexer that turns
//! program text into tokens, a parser that builds an expression tree, and a
//! tree-walking evaluator that reduces expressions against a chain of
//! environments preloaded with a primitive and math library.
//!
//! ```scheme
//! (+ 1 2)                                   ; => 3
//! (define square (lambda (x) (* x x)))
//! (square 7)                                ; => 49
//! (if (null? (list)) (quote empty) 0)       ; => (empty)
//! (sqrt 2)                                  ; => 1.4142135623730951
//! ```
//!
//! The interactive read loop lives in the binary target; the library exposes
//! the pure pieces it is built from:
//!
//! ```
//! use tinylisp::{EvalLimits, run_line};
//! use tinylisp::evaluator::create_global_env;
//! use tinylisp::value::Value;
//!
//! let env = create_global_env();
//! run_line("(define twice (lambda (x) (+ x x)))", &env, &EvalLimits::default()).unwrap();
//! let result = run_line("(twice 21)", &env, &EvalLimits::default()).unwrap();
//! assert_eq!(result, Value::Integer(42));
//! ```
//!
//! ## Known quirks
//!
//! - Closure application zips parameters with arguments positionally and does
//!   not reject count mismatches: extra arguments are dropped and missing ones
//!   leave parameters unbound.
//! - `and`, `or` and `xor` are bitwise operators over already evaluated
//!   operands, not short-circuiting special forms.
//! - Reserved words (`quote`, `define`, `if`, `lambda`) are case sensitive.
//! - Parsing stops after the first complete expression of a line; unbalanced
//!   trailing input is ignored rather than rejected.
//!
//! ## Modules
//!
//! - `lexer`: program text to tokens
//! - `parser`: tokens to [`ast::Expr`]
//! - `environment`: the scope chain
//! - `evaluator`: expression evaluation and special forms
//! - `builtinops` / `mathops`: the primitive library

use thiserror::Error;

/// Default maximum evaluation depth.
///
/// Every nested call to the evaluator counts one level, so a recursive
/// function uses a few levels per call. The evaluator extends its native
/// stack in segments as it goes deeper, so exceeding the limit reports an
/// evaluation error on any thread instead of overflowing the stack.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// The token stream ran out where an expression was expected
    /// (empty input or an unclosed list)
    UnexpectedEof,
    /// A `)` appeared where an expression was expected
    UnexpectedCloseParen,
}

/// A structured error describing a syntax failure.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// The offending token, if there was one
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, found: Option<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            found,
        }
    }

    pub(crate) fn unexpected_eof() -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, "unexpected end of input", None)
    }

    pub(crate) fn unexpected_close_paren() -> Self {
        Self::new(
            ParseErrorKind::UnexpectedCloseParen,
            "unexpected close paren",
            Some(")".to_owned()),
        )
    }
}

/// Error types for the interpreter
///
/// `ParseError` is the syntax error kind; every other variant is an
/// evaluation error. Both are recoverable: the caller reports them and the
/// global environment stays usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    ParseError(ParseError),
    #[error("EvaluationError: {0}")]
    EvalError(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("Cannot apply non-callable value: {0}")]
    NotCallable(String),
    #[error("ArityError: expected {expected} arguments, got {got}")]
    ArityError { expected: usize, got: usize },
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }

    /// True for errors raised by the parser, false for evaluation errors
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Error::ParseError(_))
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

/// Resource limits applied while evaluating one expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    pub max_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        EvalLimits {
            max_depth: MAX_EVAL_DEPTH,
        }
    }
}

/// Lex, parse and evaluate one line of input against `env`.
///
/// Definitions made by the line persist in `env`. A failure leaves `env`
/// exactly as it was before the failing `define` (if any) ran.
pub fn run_line(
    input: &str,
    env: &environment::Environment,
    limits: &EvalLimits,
) -> Result<value::Value, Error> {
    let expr = parser::parse_str(input)?;
    evaluator::eval_with_limits(&expr, env, limits)
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod intooperation;
pub mod lexer;
pub mod mathops;
pub mod parser;
pub mod value;
