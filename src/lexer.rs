//! Program text to tokens.
//!
//! A token is either a parenthesis or a maximal run of characters that are
//! neither whitespace nor parentheses. This is the same split you get from
//! padding every parenthesis with spaces and splitting on whitespace. There
//! is no string, character or comment syntax, so lexing never fails;
//! malformed programs surface in the parser or evaluator.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while},
    sequence::preceded,
};

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

/// Skip leading whitespace and recognize one token
fn token(input: &str) -> IResult<&str, &str> {
    preceded(
        take_while(char::is_whitespace),
        alt((tag("("), tag(")"), take_till1(is_delimiter))),
    )
    .parse(input)
}

/// Split program text into an ordered sequence of tokens.
pub fn lex(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut remaining = input;
    // Only trailing whitespace (or nothing) makes `token` fail
    while let Ok((rest, tok)) = token(remaining) {
        tokens.push(tok.to_owned());
        remaining = rest;
    }
    tokens
}
