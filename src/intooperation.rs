//! Adapters from strongly-typed Rust functions to the erased builtin
//! signature.
//!
//! Every native function is stored as [`OperationFn`], which takes the
//! evaluated argument vector and returns a `Result<Value, Error>`. Writing
//! each primitive against raw `Vec<Value>` would mean repeating arity and
//! type checks everywhere, so primitives are written as ordinary Rust
//! functions (`fn(f64) -> f64`, `fn(Value, Value) -> Result<Value, Error>`,
//! `fn(NumIterator<'_>) -> Result<Number, Error>`, ...) and converted here.
//!
//! Two traits do the conversion:
//! - [`IntoOperation`] for fixed-arity functions,
//! - [`IntoVariadicOperation`] for functions whose last parameter is a
//!   "rest" iterator over the remaining arguments.

use crate::Error;
use crate::value::{Number, Value};
use std::iter::FusedIterator;
use std::rc::Rc;

/// Canonical erased builtin function type used by the evaluator.
///
/// Builtins receive ownership of their argument vector, enabling
/// implementations that consume or rearrange arguments if desired.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error>;

// =====================================================================
// Single-argument conversion
// =====================================================================

/// Turns one evaluated argument into a typed parameter.
///
/// `Param<'a>` is the type the builtin actually sees; it may borrow from
/// the argument slot (list iterators) or take it by value.
pub trait FromParam {
    type Param<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        Ok(std::mem::replace(value, Value::Unspecified))
    }
}

// By-value scalars (`i64`, `f64`, `bool`, `Number`) come through the
// `TryFrom<Value>` impls in value.rs
impl<T> FromParam for T
where
    Value: TryInto<T, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        let owned = std::mem::replace(value, Value::Unspecified);
        owned.try_into()
    }
}

impl<'b> FromParam for ValueListIterator<'b> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::List(items) = value {
            Ok(ValueListIterator::new(items.as_slice()))
        } else {
            Err(Error::TypeError(format!(
                "expected list, got {}",
                value.type_name()
            )))
        }
    }
}

impl<'b> FromParam for NumIterator<'b> {
    type Param<'a> = NumIterator<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::List(items) = value {
            NumIterator::new(items.as_slice())
        } else {
            Err(Error::TypeError(format!(
                "expected list, got {}",
                value.type_name()
            )))
        }
    }
}

/// Normalize both plain values and `Result`-returning functions into `Result<T, Error>`.
pub trait IntoResult<T> {
    fn into_result(self) -> Result<T, Error>;
}

impl<T> IntoResult<T> for T {
    fn into_result(self) -> Result<T, Error> {
        Ok(self)
    }
}

impl<T, E> IntoResult<T> for Result<T, E>
where
    E: IntoError,
{
    fn into_result(self) -> Result<T, Error> {
        self.map_err(IntoError::into_error)
    }
}

/// Error types a builtin may return. Interpreter errors pass through
/// unchanged; plain messages become `EvalError`.
pub trait IntoError {
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    fn into_error(self) -> Error {
        self
    }
}

impl IntoError for &str {
    fn into_error(self) -> Error {
        Error::EvalError(self.to_owned())
    }
}

impl IntoError for String {
    fn into_error(self) -> Error {
        Error::EvalError(self)
    }
}

// =====================================================================
// Iterator-based parameter types
// =====================================================================

/// Borrowed iterator over a sequence of argument values.
#[derive(Debug, Clone, Copy)]
pub struct ValueListIterator<'a> {
    values: &'a [Value],
    index: usize,
}

impl<'a> ValueListIterator<'a> {
    pub(crate) fn new(values: &'a [Value]) -> Self {
        ValueListIterator { values, index: 0 }
    }

    /// The not yet consumed elements
    pub fn as_slice(&self) -> &'a [Value] {
        self.values.get(self.index..).unwrap_or(&[])
    }
}

impl<'a> Iterator for ValueListIterator<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self.values.get(self.index)?;
        self.index += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ValueListIterator<'_> {}
impl FusedIterator for ValueListIterator<'_> {}

/// Borrowed iterator over numeric values (integers or floats). All
/// elements are type checked once, up front.
#[derive(Debug, Clone, Copy)]
pub struct NumIterator<'a> {
    inner: ValueListIterator<'a>,
}

impl<'a> NumIterator<'a> {
    pub(crate) fn new(values: &'a [Value]) -> Result<Self, Error> {
        if let Some(bad) = values
            .iter()
            .find(|v| !matches!(v, Value::Integer(_) | Value::Float(_)))
        {
            return Err(Error::TypeError(format!(
                "expected number, got {}",
                bad.type_name()
            )));
        }

        Ok(NumIterator {
            inner: ValueListIterator::new(values),
        })
    }
}

impl Iterator for NumIterator<'_> {
    type Item = Number;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Value::Integer(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => {
                debug_assert!(false, "NumIterator saw non-number after construction");
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for NumIterator<'_> {}
impl FusedIterator for NumIterator<'_> {}

// =====================================================================
// Rest-parameter support for variadic operations
// =====================================================================

/// Builds a rest parameter from the tail of the argument slice.
pub trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error>;
}

impl FromRest for ValueListIterator<'static> {
    type Param<'a> = ValueListIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        Ok(ValueListIterator::new(slice))
    }
}

impl FromRest for NumIterator<'static> {
    type Param<'a> = NumIterator<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        NumIterator::new(slice)
    }
}

/// Marker used in `Args` tuples for the position filled from the rest
/// arguments.
#[derive(Debug, Clone, Copy)]
pub struct Rest<I>(std::marker::PhantomData<I>);

pub type ValuesRest = Rest<ValueListIterator<'static>>;
pub type NumRest = Rest<NumIterator<'static>>;

/// Convert a strongly-typed Rust function or closure into the erased
/// [`OperationFn`], parameterized by an argument tuple type.
pub trait IntoOperation<Args, R> {
    fn into_operation(self) -> Rc<OperationFn>;
}

/// Like [`IntoOperation`], for functions ending in a rest parameter.
pub trait IntoVariadicOperation<Args, R> {
    fn into_variadic_operation(self) -> Rc<OperationFn>;
}

// =====================================================================
// Variadic adapters
// =====================================================================

impl<F, FR, R, I> IntoVariadicOperation<(Rest<I>,), R> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> FR + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    fn into_variadic_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| {
            let rest_param: <I as FromRest>::Param<'_> = <I as FromRest>::from_rest(&args[..])?;
            let result: FR = (self)(rest_param);
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

/// Fixed prefix of `FromParam` parameters followed by one rest parameter
macro_rules! impl_into_variadic_operation_for_prefix_and_rest {
    ($prefix:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, I, $( $A ),+> IntoVariadicOperation<( $( $A, )+ Rest<I>, ), R> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> FR
                + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
        {
            fn into_variadic_operation(self) -> Rc<OperationFn> {
                Rc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            let result: FR = (self)( $( $p ),+, rest_param );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error($prefix, len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_operation_for_prefix_and_rest!(1, v0, p0: A1);
impl_into_variadic_operation_for_prefix_and_rest!(2, v0, p0: A1, v1, p1: A2);

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Checks the argument count, then converts each slot with `FromParam`
/// before calling the function.
macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, FR, R, $( $A ),+> IntoOperation<( $( $A, )+ ), R> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> FR + 'static,
            FR: IntoResult<R> + 'static,
            R: Into<Value> + 'static,
            $( $A: FromParam, )+
        {
            fn into_operation(self) -> Rc<OperationFn> {
                Rc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let result: FR = (self)( $( $p ),+ );
                            let value: R = result.into_result()?;
                            Ok(value.into())
                        }
                        _ => Err(Error::arity_error($arity, len)),
                    }
                })
            }
        }
    };
}

impl<F, FR, R> IntoOperation<(), R> for F
where
    F: Fn() -> FR + 'static,
    FR: IntoResult<R> + 'static,
    R: Into<Value> + 'static,
{
    fn into_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error(0, args.len()));
            }

            let result: FR = (self)();
            let value: R = result.into_result()?;
            Ok(value.into())
        })
    }
}

impl_into_operation_for_arity!(1, v0, p0: A1);
impl_into_operation_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_operation_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::value::{nil, val};

    #[test]
    fn test_fixed_arity_adapter() {
        fn hyp(a: f64, b: f64) -> f64 {
            a.hypot(b)
        }
        let op = IntoOperation::<(f64, f64), f64>::into_operation(hyp);

        assert_eq!(op(vec![val(3), val(4)]).unwrap(), val(5.0));
        assert_eq!(op(vec![val(3)]).unwrap_err(), Error::arity_error(2, 1));
        assert!(matches!(
            op(vec![val(3), nil()]).unwrap_err(),
            Error::TypeError(_)
        ));
    }

    #[test]
    fn test_result_returning_adapter_maps_errors() {
        fn checked(n: i64) -> Result<i64, &'static str> {
            if n < 0 { Err("negative input") } else { Ok(n) }
        }
        let op = IntoOperation::<(i64,), i64>::into_operation(checked);

        assert_eq!(op(vec![val(2)]).unwrap(), val(2));
        assert_eq!(
            op(vec![val(-2)]).unwrap_err(),
            Error::EvalError("negative input".into())
        );
    }

    #[test]
    fn test_variadic_adapters() {
        fn count(args: ValueListIterator<'_>) -> i64 {
            args.len() as i64
        }
        fn sum_after(first: i64, rest: NumIterator<'_>) -> f64 {
            first as f64 + rest.map(Number::as_f64).sum::<f64>()
        }

        let count_op = IntoVariadicOperation::<(ValuesRest,), i64>::into_variadic_operation(count);
        assert_eq!(count_op(vec![]).unwrap(), val(0));
        assert_eq!(count_op(vec![val(1), nil(), val(true)]).unwrap(), val(3));

        let sum_op =
            IntoVariadicOperation::<(i64, NumRest), f64>::into_variadic_operation(sum_after);
        assert_eq!(sum_op(vec![val(1), val(2), val(0.5)]).unwrap(), val(3.5));
        assert_eq!(sum_op(vec![]).unwrap_err(), Error::arity_error(1, 0));
        assert!(matches!(
            sum_op(vec![val(1), nil()]).unwrap_err(),
            Error::TypeError(_)
        ));
    }

    #[test]
    fn test_list_parameter() {
        fn second(mut items: ValueListIterator<'_>) -> Value {
            items.nth(1).cloned().unwrap_or(Value::List(vec![]))
        }
        let op = IntoOperation::<(ValueListIterator<'static>,), Value>::into_operation(second);

        assert_eq!(op(vec![val([7, 8, 9])]).unwrap(), val(8));
        assert!(op(vec![val(7)]).is_err());
    }
}
