//! Runtime values.
//!
//! [`Value`] is everything an expression can evaluate to: numbers, booleans,
//! symbols and lists used as data, and the two kinds of callables. Native
//! functions and user closures are separate variants but are applied through
//! the same path in the evaluator, so call sites cannot tell them apart.

use std::rc::Rc;

use gc::{Finalize, Trace, custom_trace};

use crate::Error;
use crate::ast::{Expr, IntType, fmt_float};
use crate::environment::Environment;
use crate::intooperation::OperationFn;

#[derive(Clone)]
pub enum Value {
    Integer(IntType),
    Float(f64),
    /// Result of comparisons and predicates
    Bool(bool),
    /// Symbols used as data, e.g. produced by `quote`
    Symbol(String),
    List(Vec<Value>),
    /// User-defined function: parameter names, body and the environment in
    /// effect when the `lambda` was evaluated
    Closure {
        params: Vec<String>,
        body: Rc<Expr>,
        env: Environment,
    },
    /// Host-provided function, compared by `id`
    NativeFunction { id: String, func: Rc<OperationFn> },
    /// The "no value" marker returned by `define`
    /// Never equal to anything, itself included
    Unspecified,
}

impl Finalize for Value {}

// Closures are the only values that reach frames. Expression bodies and
// native functions hold no environment handles and are not traced.
unsafe impl Trace for Value {
    custom_trace!(this, {
        match this {
            Value::List(elements) => mark(elements),
            Value::Closure { env, .. } => mark(env),
            _ => {}
        }
    });
}

impl Value {
    /// Truthiness as used by `if` and `not`: integer 0, float 0.0, the empty
    /// list, `#f` and the no-value result of `define` are false, everything
    /// else is true
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Bool(b) => *b,
            Value::List(elements) => !elements.is_empty(),
            Value::Unspecified => false,
            Value::Symbol(_) | Value::Closure { .. } | Value::NativeFunction { .. } => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure { .. } | Value::NativeFunction { .. })
    }

    /// Check if a value is the empty list
    pub(crate) fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Short type description for error messages
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Closure { .. } => "closure",
            Value::NativeFunction { .. } => "builtin function",
            Value::Unspecified => "unspecified",
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            // The captured environment may contain this very closure
            Value::Closure { params, body, .. } => {
                write!(f, "Closure(params={params:?}, body={body})")
            }
            Value::NativeFunction { id, .. } => write!(f, "NativeFunction({id})"),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => fmt_float(f, *x),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::Closure { params, .. } => write!(f, "#<closure ({})>", params.join(" ")),
            Value::NativeFunction { id, .. } => write!(f, "#<builtin:{id}>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::NativeFunction { id: id1, .. }, Value::NativeFunction { id: id2, .. }) => {
                id1 == id2
            }
            // Closures are equal only to the value produced by the same `lambda`
            // evaluation
            (
                Value::Closure {
                    body: b1, env: e1, ..
                },
                Value::Closure {
                    body: b2, env: e2, ..
                },
            ) => Rc::ptr_eq(b1, b2) && e1.ptr_eq(e2),
            _ => false,
        }
    }
}

/// Quoted code becomes data: every node maps to the value of the same shape
impl From<&Expr> for Value {
    fn from(expr: &Expr) -> Self {
        match expr {
            Expr::Integer(n) => Value::Integer(*n),
            Expr::Float(x) => Value::Float(*x),
            Expr::Symbol(s) => Value::Symbol(s.clone()),
            Expr::List(elements) => Value::List(elements.iter().map(Value::from).collect()),
        }
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(IntType::from(n))
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(IntType);

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

// Fallible conversions used by typed builtin parameters

impl TryFrom<Value> for IntType {
    type Error = Error;

    fn try_from(value: Value) -> Result<IntType, Error> {
        match value {
            Value::Integer(n) => Ok(n),
            other => Err(Error::TypeError(format!(
                "expected integer, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Integers widen to floats, as math functions accept either
impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<f64, Error> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Integer(n) => Ok(n as f64),
            other => Err(Error::TypeError(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }
}

/// A numeric argument or result: integers stay exact until a float is
/// involved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(IntType),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(n) => Value::Integer(n),
            Number::Float(x) => Value::Float(x),
        }
    }
}

impl TryFrom<Value> for Number {
    type Error = Error;

    fn try_from(value: Value) -> Result<Number, Error> {
        match value {
            Value::Integer(n) => Ok(Number::Int(n)),
            Value::Float(x) => Ok(Number::Float(x)),
            other => Err(Error::TypeError(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Helper function for creating Values
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating symbol values
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn vsym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating the empty list
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}
