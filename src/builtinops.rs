//! Built-in operations registry.
//!
//! Everything the global environment starts with is declared here as plain
//! data: one table of special forms, which the evaluator dispatches on by
//! exact name, and one table of native functions that are bound into the
//! root frame like any other value.
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: receive already evaluated arguments (`+`, `car`, `and`, ...)
//! - **Special Forms**: receive the unevaluated argument expressions and the
//!   current environment (`quote`, `define`, `if`, `lambda`)
//!
//! ## Numeric tower
//!
//! Integers stay exact (with overflow reported as an error) until a float
//! takes part in an operation, at which point the result is a float. `/` is
//! true division and always yields a float.
//!
//! ## Quirks kept on purpose
//!
//! `and`, `or` and `xor` are bitwise operators on two already evaluated
//! operands: two booleans give a boolean, any mix of integers and booleans
//! gives an integer. Nothing short-circuits.
//!
//! ## Adding New Operations
//!
//! 1. Write the function with typed parameters (see `intooperation`)
//! 2. Add a `BuiltinOp` entry to `core_ops` (or to `mathops` for math)
//! 3. Add cases to the data-driven tests below

use std::cmp::Ordering;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Expr, IntType};
use crate::environment::Environment;
use crate::evaluator::{Depth, eval_define, eval_if, eval_lambda, eval_quote};
use crate::intooperation::{
    IntoOperation, IntoVariadicOperation, NumIterator, NumRest, OperationFn, ValueListIterator,
    ValuesRest,
};
use crate::mathops::math_ops;
use crate::value::{Number, Value};

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(n) if got != n => Err(Error::arity_error(n, got)),
            Arity::AtLeast(n) if got < n => Err(Error::arity_error(n, got)),
            Arity::Range(min, _) if got < min => Err(Error::arity_error(min, got)),
            Arity::Range(_, max) if got > max => Err(Error::arity_error(max, got)),
            _ => Ok(()),
        }
    }
}

/// Signature of a special form: unevaluated arguments (the list minus its
/// head), the environment of the form, and the current evaluation depth
pub type SpecialFormFn = fn(&[Expr], &Environment, Depth) -> Result<Value, Error>;

/// A reserved word and the evaluation rule behind it
#[derive(Debug, Clone, Copy)]
pub struct SpecialForm {
    pub name: &'static str,
    pub arity: Arity,
    pub eval: SpecialFormFn,
}

/// Reserved words, matched case-sensitively against the head of a list
static SPECIAL_FORMS: [SpecialForm; 4] = [
    SpecialForm {
        name: "quote",
        arity: Arity::Any,
        eval: eval_quote,
    },
    SpecialForm {
        name: "define",
        arity: Arity::Exact(2),
        eval: eval_define,
    },
    SpecialForm {
        name: "if",
        arity: Arity::Exact(3),
        eval: eval_if,
    },
    SpecialForm {
        name: "lambda",
        arity: Arity::Exact(2),
        eval: eval_lambda,
    },
];

/// Find a special form by its reserved word
pub fn find_special_form(name: &str) -> Option<&'static SpecialForm> {
    SPECIAL_FORMS.iter().find(|form| form.name == name)
}

/// Definition of a native function bound in the global environment
#[derive(Clone)]
pub struct BuiltinOp {
    pub id: &'static str,
    pub arity: Arity,
    pub func: Rc<OperationFn>,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl BuiltinOp {
    pub(crate) fn new(id: &'static str, arity: Arity, func: Rc<OperationFn>) -> Self {
        BuiltinOp { id, arity, func }
    }

    /// The value bound in the environment: checks the argument count
    /// before handing over to the implementation
    pub fn to_value(&self) -> Value {
        let arity = self.arity;
        let inner = Rc::clone(&self.func);
        Value::NativeFunction {
            id: self.id.to_owned(),
            func: Rc::new(move |args: Vec<Value>| {
                arity.validate(args.len())?;
                inner(args)
            }),
        }
    }
}

pub(crate) fn builtin_fixed<Args, R, F>(f: F) -> Rc<OperationFn>
where
    F: IntoOperation<Args, R>,
{
    f.into_operation()
}

pub(crate) fn builtin_variadic<Args, R, F>(f: F) -> Rc<OperationFn>
where
    F: IntoVariadicOperation<Args, R>,
{
    f.into_variadic_operation()
}

//
// Numeric helpers
//

fn overflow(what: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {what}"))
}

fn add2(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            x.checked_add(y).map(Number::Int).ok_or_else(|| overflow("addition"))
        }
        _ => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

fn sub2(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .ok_or_else(|| overflow("subtraction")),
        _ => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

fn mul2(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .ok_or_else(|| overflow("multiplication")),
        _ => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

fn div2(a: f64, b: Number) -> Result<f64, Error> {
    let divisor = b.as_f64();
    if divisor == 0.0 {
        return Err(Error::EvalError("division by zero".into()));
    }
    Ok(a / divisor)
}

/// Integers compare exactly; anything involving a float compares as f64,
/// where NaN is unordered
fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Structural equality where numbers compare by value across int/float
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (Number::try_from(a.clone()), Number::try_from(b.clone())) {
                (Ok(x), Ok(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
                _ => false,
            }
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

//
// Builtin Function Implementations
//

fn builtin_add(args: NumIterator<'_>) -> Result<Number, Error> {
    args.into_iter().try_fold(Number::Int(0), add2)
}

fn builtin_sub(first: Number, rest: NumIterator<'_>) -> Result<Number, Error> {
    if rest.len() == 0 {
        return sub2(Number::Int(0), first).map_err(|_| overflow("negation"));
    }
    rest.into_iter().try_fold(first, sub2)
}

fn builtin_mul(args: NumIterator<'_>) -> Result<Number, Error> {
    args.into_iter().try_fold(Number::Int(1), mul2)
}

fn builtin_div(first: Number, rest: NumIterator<'_>) -> Result<f64, Error> {
    if rest.len() == 0 {
        return div2(1.0, first);
    }
    rest.into_iter().try_fold(first.as_f64(), div2)
}

// Comparisons chain over all adjacent pairs: (< 1 2 3) is true
macro_rules! numeric_comparison {
    ($name:ident, $($accept:pat_param)|+) => {
        fn $name(first: Number, rest: NumIterator<'_>) -> bool {
            let mut prev = first;
            for current in rest {
                if !matches!(compare_numbers(prev, current), Some($($accept)|+)) {
                    return false;
                }
                prev = current;
            }
            true
        }
    };
}

numeric_comparison!(builtin_lt, Ordering::Less);
numeric_comparison!(builtin_gt, Ordering::Greater);
numeric_comparison!(builtin_le, Ordering::Less | Ordering::Equal);
numeric_comparison!(builtin_ge, Ordering::Greater | Ordering::Equal);

fn builtin_equal(first: Value, second: Value) -> bool {
    values_equal(&first, &second)
}

// Booleans take part as 0/1 when mixed with integers
macro_rules! bitwise_op {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(a: Value, b: Value) -> Result<Value, Error> {
            match (&a, &b) {
                (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(*x $op *y)),
                (Value::Integer(_) | Value::Bool(_), Value::Integer(_) | Value::Bool(_)) => {
                    Ok(Value::Integer(as_bits(&a) $op as_bits(&b)))
                }
                _ => Err(Error::TypeError(format!(
                    concat!("'", $op_str, "' requires integer or boolean operands, got {} and {}"),
                    a.type_name(),
                    b.type_name()
                ))),
            }
        }
    };
}

fn as_bits(value: &Value) -> IntType {
    match value {
        Value::Integer(n) => *n,
        Value::Bool(b) => IntType::from(*b),
        _ => 0,
    }
}

bitwise_op!(builtin_and, &, "and");
bitwise_op!(builtin_or, |, "or");
bitwise_op!(builtin_xor, ^, "xor");

fn builtin_not(value: Value) -> bool {
    !value.is_truthy()
}

fn builtin_cons(first: Value, rest: Value) -> Result<Value, Error> {
    match rest {
        Value::List(tail) => {
            let mut new_list = Vec::with_capacity(tail.len() + 1);
            new_list.push(first);
            new_list.extend(tail);
            Ok(Value::List(new_list))
        }
        other => Err(Error::TypeError(format!(
            "cons requires a list as second argument, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_car(mut list: ValueListIterator<'_>) -> Result<Value, Error> {
    list.next()
        .cloned()
        .ok_or_else(|| Error::EvalError("car of empty list".into()))
}

/// The cdr of the empty list is the empty list
fn builtin_cdr(mut list: ValueListIterator<'_>) -> Value {
    list.next();
    Value::List(list.cloned().collect())
}

fn builtin_append(lists: ValueListIterator<'_>) -> Result<Value, Error> {
    let mut result = Vec::new();
    for list in lists {
        match list {
            Value::List(items) => result.extend(items.iter().cloned()),
            other => {
                return Err(Error::TypeError(format!(
                    "append requires list arguments, got {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(Value::List(result))
}

fn builtin_list(args: ValueListIterator<'_>) -> Value {
    Value::List(args.cloned().collect())
}

fn builtin_is_list(value: Value) -> bool {
    matches!(value, Value::List(_))
}

fn builtin_null(value: Value) -> bool {
    value.is_nil()
}

/// Element count of a list, or character count of a symbol
fn builtin_length(value: Value) -> Result<IntType, Error> {
    let len = match &value {
        Value::List(items) => items.len(),
        Value::Symbol(name) => name.chars().count(),
        other => {
            return Err(Error::TypeError(format!(
                "length requires a list, got {}",
                other.type_name()
            )));
        }
    };
    IntType::try_from(len).map_err(|_| overflow("length"))
}

fn builtin_is_symbol(value: Value) -> bool {
    matches!(value, Value::Symbol(_))
}

/// Arithmetic, comparison, logic and list primitives
fn core_ops() -> Vec<BuiltinOp> {
    vec![
        // Arithmetic operations
        BuiltinOp::new(
            "+",
            Arity::Any,
            builtin_variadic::<(NumRest,), Number, _>(builtin_add),
        ),
        BuiltinOp::new(
            "-",
            Arity::AtLeast(1),
            builtin_variadic::<(Number, NumRest), Number, _>(builtin_sub),
        ),
        BuiltinOp::new(
            "*",
            Arity::Any,
            builtin_variadic::<(NumRest,), Number, _>(builtin_mul),
        ),
        BuiltinOp::new(
            "/",
            Arity::AtLeast(1),
            builtin_variadic::<(Number, NumRest), f64, _>(builtin_div),
        ),
        // Comparison operations
        BuiltinOp::new(
            "<",
            Arity::AtLeast(2),
            builtin_variadic::<(Number, NumRest), bool, _>(builtin_lt),
        ),
        BuiltinOp::new(
            ">",
            Arity::AtLeast(2),
            builtin_variadic::<(Number, NumRest), bool, _>(builtin_gt),
        ),
        BuiltinOp::new(
            "<=",
            Arity::AtLeast(2),
            builtin_variadic::<(Number, NumRest), bool, _>(builtin_le),
        ),
        BuiltinOp::new(
            ">=",
            Arity::AtLeast(2),
            builtin_variadic::<(Number, NumRest), bool, _>(builtin_ge),
        ),
        BuiltinOp::new(
            "=",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), bool, _>(builtin_equal),
        ),
        BuiltinOp::new(
            "equal?",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), bool, _>(builtin_equal),
        ),
        // Bitwise "logical" operations
        BuiltinOp::new(
            "and",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), Value, _>(builtin_and),
        ),
        BuiltinOp::new(
            "or",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), Value, _>(builtin_or),
        ),
        BuiltinOp::new(
            "xor",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), Value, _>(builtin_xor),
        ),
        BuiltinOp::new(
            "not",
            Arity::Exact(1),
            builtin_fixed::<(Value,), bool, _>(builtin_not),
        ),
        // List operations
        BuiltinOp::new(
            "cons",
            Arity::Exact(2),
            builtin_fixed::<(Value, Value), Value, _>(builtin_cons),
        ),
        BuiltinOp::new(
            "car",
            Arity::Exact(1),
            builtin_fixed::<(ValueListIterator<'static>,), Value, _>(builtin_car),
        ),
        BuiltinOp::new(
            "cdr",
            Arity::Exact(1),
            builtin_fixed::<(ValueListIterator<'static>,), Value, _>(builtin_cdr),
        ),
        BuiltinOp::new(
            "append",
            Arity::Any,
            builtin_variadic::<(ValuesRest,), Value, _>(builtin_append),
        ),
        BuiltinOp::new(
            "list",
            Arity::Any,
            builtin_variadic::<(ValuesRest,), Value, _>(builtin_list),
        ),
        BuiltinOp::new(
            "list?",
            Arity::Exact(1),
            builtin_fixed::<(Value,), bool, _>(builtin_is_list),
        ),
        BuiltinOp::new(
            "null?",
            Arity::Exact(1),
            builtin_fixed::<(Value,), bool, _>(builtin_null),
        ),
        BuiltinOp::new(
            "length",
            Arity::Exact(1),
            builtin_fixed::<(Value,), IntType, _>(builtin_length),
        ),
        BuiltinOp::new(
            "symbol?",
            Arity::Exact(1),
            builtin_fixed::<(Value,), bool, _>(builtin_is_symbol),
        ),
    ]
}

/// Every native function of the global environment, core primitives first,
/// then the math table. Built fresh on each call.
pub fn get_builtin_ops() -> Vec<BuiltinOp> {
    let mut ops = core_ops();
    ops.extend(math_ops());
    ops
}

/// Find a native function by name
pub fn find_builtin_op(id: &str) -> Option<BuiltinOp> {
    get_builtin_ops().into_iter().find(|op| op.id == id)
}
