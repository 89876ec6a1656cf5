//! The math library bound in the global environment.
//!
//! Every entry is listed explicitly, so a name can only be bound once.
//! Arguments may be integers or floats. Results are floats unless the
//! operation is integer valued by nature (`ceil`, `floor`, `trunc`,
//! `factorial`) or a predicate (`isnan`, ...).
//!
//! A float result that comes out NaN from non-NaN inputs is reported as a
//! domain error, and one that comes out infinite from finite inputs as a
//! range error, so `(sqrt -1)` and `(exp 1000)` fail instead of returning
//! special values.

use std::f64::consts;

use crate::Error;
use crate::ast::IntType;
use crate::builtinops::{Arity, BuiltinOp, builtin_fixed, builtin_variadic};
use crate::intooperation::{NumIterator, NumRest, ValueListIterator};
use crate::value::{Number, Value};

/// Named constants bound next to the functions
pub const MATH_CONSTANTS: [(&str, f64); 3] =
    [("pi", consts::PI), ("e", consts::E), ("tau", consts::TAU)];

fn check_float(result: f64, inputs: &[f64]) -> Result<f64, Error> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        Err(Error::EvalError("math domain error".into()))
    } else if result.is_infinite() && inputs.iter().all(|x| x.is_finite()) {
        Err(Error::EvalError("math range error".into()))
    } else {
        Ok(result)
    }
}

fn unary(id: &'static str, f: fn(f64) -> f64) -> BuiltinOp {
    BuiltinOp::new(
        id,
        Arity::Exact(1),
        builtin_fixed::<(f64,), f64, _>(move |x: f64| check_float(f(x), &[x])),
    )
}

fn binary(id: &'static str, f: fn(f64, f64) -> f64) -> BuiltinOp {
    BuiltinOp::new(
        id,
        Arity::Exact(2),
        builtin_fixed::<(f64, f64), f64, _>(move |x: f64, y: f64| check_float(f(x, y), &[x, y])),
    )
}

/// Float to integer conversion for the integer-valued operations
fn float_to_integer(x: f64) -> Result<IntType, Error> {
    if x.is_nan() {
        return Err(Error::EvalError("cannot convert float NaN to integer".into()));
    }
    if x.is_infinite() {
        return Err(Error::EvalError(
            "cannot convert float infinity to integer".into(),
        ));
    }
    // 2^63 is exactly representable; everything in [-2^63, 2^63) fits
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if (-LIMIT..LIMIT).contains(&x) {
        Ok(x as IntType)
    } else {
        Err(Error::EvalError(format!("integer overflow converting {x:?}")))
    }
}

macro_rules! integer_rounding {
    ($name:ident, $method:ident) => {
        fn $name(n: Number) -> Result<IntType, Error> {
            match n {
                Number::Int(i) => Ok(i),
                Number::Float(x) => float_to_integer(x.$method()),
            }
        }
    };
}

integer_rounding!(math_ceil, ceil);
integer_rounding!(math_floor, floor);
integer_rounding!(math_trunc, trunc);

fn math_factorial(n: IntType) -> Result<IntType, Error> {
    if n < 0 {
        return Err(Error::EvalError(
            "factorial() not defined for negative values".into(),
        ));
    }
    (2..=n).try_fold(1, |acc: IntType, k| {
        acc.checked_mul(k)
            .ok_or_else(|| Error::EvalError(format!("Integer overflow in factorial({n})")))
    })
}

/// Natural logarithm, or logarithm to the given base
fn math_log(x: f64, base: NumIterator<'_>) -> Result<f64, Error> {
    match base.map(Number::as_f64).next() {
        None => check_float(x.ln(), &[x]),
        Some(b) => {
            let divisor = check_float(b.ln(), &[b])?;
            if divisor == 0.0 {
                return Err(Error::EvalError("division by zero".into()));
            }
            check_float(check_float(x.ln(), &[x])? / divisor, &[x, b])
        }
    }
}

/// Mantissa in [0.5, 1) and exponent with `x == m * 2^e`
fn math_frexp(x: f64) -> Value {
    let (mantissa, exponent) = libm::frexp(x);
    Value::List(vec![Value::Float(mantissa), Value::Integer(IntType::from(exponent))])
}

fn math_ldexp(x: f64, exponent: IntType) -> Result<f64, Error> {
    // Exponents past the i32 range saturate to 0 or infinity anyway
    let exponent = exponent.clamp(IntType::from(i32::MIN), IntType::from(i32::MAX)) as i32;
    check_float(libm::ldexp(x, exponent), &[x])
}

/// Fractional and integral parts, both carrying the sign of `x`
fn math_modf(x: f64) -> Value {
    let (fractional, integral) = libm::modf(x);
    Value::List(vec![Value::Float(fractional), Value::Float(integral)])
}

/// Compensated (Neumaier) sum of a list of numbers
fn math_fsum(values: ValueListIterator<'_>) -> Result<f64, Error> {
    let numbers = NumIterator::new(values.as_slice())?;
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    for x in numbers.map(Number::as_f64) {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    Ok(sum + compensation)
}

fn math_isfinite(x: f64) -> bool {
    x.is_finite()
}

fn math_isinf(x: f64) -> bool {
    x.is_infinite()
}

fn math_isnan(x: f64) -> bool {
    x.is_nan()
}

/// All math functions, in alphabetical order
pub fn math_ops() -> Vec<BuiltinOp> {
    vec![
        unary("acos", f64::acos),
        unary("acosh", f64::acosh),
        unary("asin", f64::asin),
        unary("asinh", f64::asinh),
        unary("atan", f64::atan),
        binary("atan2", f64::atan2),
        unary("atanh", f64::atanh),
        BuiltinOp::new(
            "ceil",
            Arity::Exact(1),
            builtin_fixed::<(Number,), IntType, _>(math_ceil),
        ),
        binary("copysign", f64::copysign),
        unary("cos", f64::cos),
        unary("cosh", f64::cosh),
        unary("degrees", f64::to_degrees),
        unary("erf", libm::erf),
        unary("erfc", libm::erfc),
        unary("exp", f64::exp),
        unary("expm1", f64::exp_m1),
        unary("fabs", f64::abs),
        BuiltinOp::new(
            "factorial",
            Arity::Exact(1),
            builtin_fixed::<(IntType,), IntType, _>(math_factorial),
        ),
        BuiltinOp::new(
            "floor",
            Arity::Exact(1),
            builtin_fixed::<(Number,), IntType, _>(math_floor),
        ),
        binary("fmod", |x, y| x % y),
        BuiltinOp::new(
            "frexp",
            Arity::Exact(1),
            builtin_fixed::<(f64,), Value, _>(math_frexp),
        ),
        BuiltinOp::new(
            "fsum",
            Arity::Exact(1),
            builtin_fixed::<(ValueListIterator<'static>,), f64, _>(math_fsum),
        ),
        unary("gamma", libm::tgamma),
        binary("hypot", f64::hypot),
        BuiltinOp::new(
            "isfinite",
            Arity::Exact(1),
            builtin_fixed::<(f64,), bool, _>(math_isfinite),
        ),
        BuiltinOp::new(
            "isinf",
            Arity::Exact(1),
            builtin_fixed::<(f64,), bool, _>(math_isinf),
        ),
        BuiltinOp::new(
            "isnan",
            Arity::Exact(1),
            builtin_fixed::<(f64,), bool, _>(math_isnan),
        ),
        BuiltinOp::new(
            "ldexp",
            Arity::Exact(2),
            builtin_fixed::<(f64, IntType), f64, _>(math_ldexp),
        ),
        unary("lgamma", libm::lgamma),
        BuiltinOp::new(
            "log",
            Arity::Range(1, 2),
            builtin_variadic::<(f64, NumRest), f64, _>(math_log),
        ),
        unary("log10", f64::log10),
        unary("log1p", f64::ln_1p),
        unary("log2", f64::log2),
        BuiltinOp::new(
            "modf",
            Arity::Exact(1),
            builtin_fixed::<(f64,), Value, _>(math_modf),
        ),
        binary("pow", f64::powf),
        unary("radians", f64::to_radians),
        unary("sin", f64::sin),
        unary("sinh", f64::sinh),
        unary("sqrt", f64::sqrt),
        unary("tan", f64::tan),
        unary("tanh", f64::tanh),
        BuiltinOp::new(
            "trunc",
            Arity::Exact(1),
            builtin_fixed::<(Number,), IntType, _>(math_trunc),
        ),
    ]
}
