//! This module defines the expression tree produced by the parser. [`Expr`] is
//! the code side of the language: numbers, symbols that are resolved later
//! against an environment, and lists that are either applications, special
//! forms or (under `quote`) literal data. Expressions are immutable once
//! parsed. Helper constructors such as `sym`, `int` and `list` keep
//! hand-built trees short in tests.

/// Type alias for integer literals
pub(crate) type IntType = i64;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(IntType),
    Float(f64),
    /// A name, resolved against the environment at evaluation time
    Symbol(String),
    /// Code (application or special form) or quoted data
    List(Vec<Expr>),
}

/// Format a float so that it reads back as a float, never as an integer
pub(crate) fn fmt_float(f: &mut std::fmt::Formatter<'_>, x: f64) -> std::fmt::Result {
    // Debug keeps a fractional part ("2.0") and round-trips exactly
    write!(f, "{x:?}")
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            Expr::Float(x) => fmt_float(f, *x),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<IntType> for Expr {
    fn from(n: IntType) -> Self {
        Expr::Integer(n)
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::Float(x)
    }
}

impl<T: Into<Expr>> From<Vec<T>> for Expr {
    fn from(v: Vec<T>) -> Self {
        Expr::List(v.into_iter().map(Into::into).collect())
    }
}

/// Helper for building symbol nodes
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Expr {
    Expr::Symbol(name.as_ref().to_owned())
}

/// Helper for building integer nodes
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn int(n: IntType) -> Expr {
    Expr::Integer(n)
}

/// Helper for building list nodes from mixed elements
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn list(elements: Vec<Expr>) -> Expr {
    Expr::List(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_data_driven() {
        let test_cases = vec![
            (int(42), "42"),
            (int(-7), "-7"),
            (Expr::Float(2.0), "2.0"),
            (Expr::Float(0.5), "0.5"),
            (Expr::Float(-1e300), "-1e300"),
            (Expr::Float(f64::INFINITY), "inf"),
            (sym("equal?"), "equal?"),
            (list(vec![]), "()"),
            (
                list(vec![sym("+"), int(1), list(vec![sym("*"), int(2), int(3)])]),
                "(+ 1 (* 2 3))",
            ),
        ];

        for (i, (expr, expected)) in test_cases.iter().enumerate() {
            assert_eq!(format!("{expr}"), *expected, "Display test #{}", i + 1);
        }
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Expr::from(3_i64), int(3));
        assert_eq!(Expr::from(1.5), Expr::Float(1.5));
        assert_eq!(
            Expr::from(vec![1_i64, 2]),
            Expr::List(vec![Expr::Integer(1), Expr::Integer(2)])
        );
    }
}
