//! Tokens to expression trees.
//!
//! ```text
//! expr  := atom | list
//! list  := "(" expr* ")"
//! atom  := integer-literal | float-literal | symbol
//! ```
//!
//! An atom is read as an `i64` if it parses as one, otherwise as an `f64`,
//! otherwise it is a symbol. Integer literals too large for `i64` therefore
//! come back as floats, and `inf`/`nan` are float literals.

use std::collections::VecDeque;

use crate::ast::Expr;
use crate::lexer::lex;
use crate::{Error, ParseError};

/// Parse one expression from the front of `tokens`.
///
/// Consumed tokens are removed; whatever follows the expression stays in
/// the deque for the next call.
pub fn parse(tokens: &mut VecDeque<String>) -> Result<Expr, Error> {
    let token = tokens.pop_front().ok_or_else(ParseError::unexpected_eof)?;

    match token.as_str() {
        ")" => Err(ParseError::unexpected_close_paren().into()),
        "(" => parse_list_tail(tokens),
        _ => Ok(parse_atom(token)),
    }
}

/// Parse list elements up to and including the closing paren
fn parse_list_tail(tokens: &mut VecDeque<String>) -> Result<Expr, Error> {
    let mut elements = Vec::new();
    loop {
        match tokens.front().map(String::as_str) {
            None => return Err(ParseError::unexpected_eof().into()),
            Some(")") => {
                tokens.pop_front();
                return Ok(Expr::List(elements));
            }
            Some(_) => elements.push(parse(tokens)?),
        }
    }
}

fn parse_atom(token: String) -> Expr {
    if let Ok(n) = token.parse::<i64>() {
        Expr::Integer(n)
    } else if let Ok(x) = token.parse::<f64>() {
        Expr::Float(x)
    } else {
        Expr::Symbol(token)
    }
}

/// Lex `input` and parse its first expression.
///
/// Tokens after the first complete expression are ignored, so input with
/// surplus closing parens is accepted rather than rejected.
pub fn parse_str(input: &str) -> Result<Expr, Error> {
    let mut tokens: VecDeque<String> = lex(input).into();
    let expr = parse(&mut tokens)?;
    if !tokens.is_empty() {
        log::debug!(
            "ignoring {} token(s) after complete expression: {:?}",
            tokens.len(),
            tokens
        );
    }
    Ok(expr)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ParseErrorKind;
    use crate::ast::{int, list, sym};

    #[derive(Debug)]
    enum ParseTestResult {
        Success(Expr),
        SpecificError(ParseErrorKind),
    }
    use ParseTestResult::*;

    fn run_parse_tests(test_cases: Vec<(&str, ParseTestResult)>) {
        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            let test_id = format!("Parse test #{}", i + 1);
            match (parse_str(input), expected) {
                (Ok(actual), Success(expected_expr)) => {
                    assert_eq!(actual, expected_expr, "{test_id}: value mismatch for {input:?}");

                    // display -> parse -> display is stable
                    let displayed = format!("{actual}");
                    let reparsed = parse_str(&displayed).unwrap_or_else(|e| {
                        panic!("{test_id}: round-trip parse failed for '{displayed}': {e:?}")
                    });
                    assert_eq!(
                        displayed,
                        format!("{reparsed}"),
                        "{test_id}: round-trip display mismatch"
                    );
                }
                (Err(Error::ParseError(err)), SpecificError(kind)) => {
                    assert_eq!(err.kind, kind, "{test_id}: wrong error kind for {input:?}");
                }
                (result, expected) => {
                    panic!("{test_id}: input {input:?} expected {expected:?}, got {result:?}")
                }
            }
        }
    }

    #[test]
    fn test_parser_comprehensive() {
        let test_cases = vec![
            // Atoms
            ("42", Success(int(42))),
            ("-17", Success(int(-17))),
            ("+5", Success(int(5))),
            ("0", Success(int(0))),
            ("3.25", Success(Expr::Float(3.25))),
            ("-0.5", Success(Expr::Float(-0.5))),
            ("1e3", Success(Expr::Float(1000.0))),
            (".5", Success(Expr::Float(0.5))),
            // Too large for i64 falls through to float
            ("9223372036854775808", Success(Expr::Float(9_223_372_036_854_775_808.0))),
            ("inf", Success(Expr::Float(f64::INFINITY))),
            ("foo", Success(sym("foo"))),
            ("equal?", Success(sym("equal?"))),
            ("-", Success(sym("-"))),
            ("1+", Success(sym("1+"))),
            ("#t", Success(sym("#t"))),
            ("'x", Success(sym("'x"))),
            // Lists
            ("()", Success(list(vec![]))),
            ("(+ 1 2)", Success(list(vec![sym("+"), int(1), int(2)]))),
            (
                "(define sq (lambda (x) (* x x)))",
                Success(list(vec![
                    sym("define"),
                    sym("sq"),
                    list(vec![
                        sym("lambda"),
                        list(vec![sym("x")]),
                        list(vec![sym("*"), sym("x"), sym("x")]),
                    ]),
                ])),
            ),
            ("((()))", Success(list(vec![list(vec![list(vec![])])]))),
            (
                "  ( 1.5   ( a ) b )  ",
                Success(list(vec![Expr::Float(1.5), list(vec![sym("a")]), sym("b")])),
            ),
            // Only the first expression is read
            ("1 2 3", Success(int(1))),
            ("(a) (b)", Success(list(vec![sym("a")]))),
            ("(+ 1 2))", Success(list(vec![sym("+"), int(1), int(2)]))),
            // Errors
            ("", SpecificError(ParseErrorKind::UnexpectedEof)),
            ("   ", SpecificError(ParseErrorKind::UnexpectedEof)),
            ("(", SpecificError(ParseErrorKind::UnexpectedEof)),
            ("(+ 1 (* 2 3)", SpecificError(ParseErrorKind::UnexpectedEof)),
            (")", SpecificError(ParseErrorKind::UnexpectedCloseParen)),
            (") (+ 1 2)", SpecificError(ParseErrorKind::UnexpectedCloseParen)),
        ];

        run_parse_tests(test_cases);
    }

    #[test]
    fn test_parse_leaves_remainder() {
        let mut tokens: VecDeque<String> = lex("(a b) c (d)").into();

        assert_eq!(parse(&mut tokens).unwrap(), list(vec![sym("a"), sym("b")]));
        assert_eq!(tokens, VecDeque::from(lex("c (d)")));
        assert_eq!(parse(&mut tokens).unwrap(), sym("c"));
        assert_eq!(parse(&mut tokens).unwrap(), list(vec![sym("d")]));
        assert!(tokens.is_empty());
        assert!(parse(&mut tokens).is_err());
    }

    #[test]
    fn test_parse_errors_are_syntax_errors() {
        for input in ["", "(", ")"] {
            let err = parse_str(input).unwrap_err();
            assert!(err.is_syntax_error(), "{input:?} gave {err:?}");
        }
        let message = parse_str(")").unwrap_err().to_string();
        assert!(message.contains("unexpected close paren"), "{message}");
        let message = parse_str("(").unwrap_err().to_string();
        assert!(message.contains("unexpected end of input"), "{message}");
    }

    #[test]
    fn test_integer_literals_round_trip() {
        let literals = [
            "0",
            "7",
            "-7",
            "+12",
            "007",
            "-0",
            "1000000007",
            "9223372036854775807",
            "-9223372036854775808",
        ];

        for literal in literals {
            let Expr::Integer(first) = parse_str(literal).unwrap() else {
                panic!("{literal} did not parse as an integer");
            };
            let reserialized = Expr::Integer(first).to_string();
            assert_eq!(
                parse_str(&reserialized).unwrap(),
                Expr::Integer(first),
                "{literal} -> {reserialized} changed value"
            );
        }

        for n in (-1000..=1000).chain([i64::MIN, i64::MAX, i64::MIN + 1, i64::MAX - 1]) {
            assert_eq!(parse_str(&n.to_string()).unwrap(), Expr::Integer(n));
        }
    }
}
