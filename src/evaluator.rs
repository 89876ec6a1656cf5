use std::rc::Rc;

use crate::ast::Expr;
use crate::builtinops::{find_special_form, get_builtin_ops};
use crate::environment::Environment;
use crate::mathops::MATH_CONSTANTS;
use crate::value::Value;
use crate::{Error, EvalLimits};

/// Nesting level of one evaluator call, and the level it may not reach
#[derive(Debug, Clone, Copy)]
pub struct Depth {
    level: usize,
    limit: usize,
}

impl Depth {
    fn root(limits: &EvalLimits) -> Self {
        Depth {
            level: 0,
            limit: limits.max_depth,
        }
    }

    fn deeper(self) -> Self {
        Depth {
            level: self.level + 1,
            ..self
        }
    }

    fn check(self) -> Result<(), Error> {
        if self.level >= self.limit {
            return Err(Error::EvalError(format!(
                "Evaluation depth limit exceeded (max: {})",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Evaluate an expression (public API)
pub fn eval(expr: &Expr, env: &Environment) -> Result<Value, Error> {
    eval_with_limits(expr, env, &EvalLimits::default())
}

/// Evaluate an expression with explicit resource limits
pub fn eval_with_limits(expr: &Expr, env: &Environment, limits: &EvalLimits) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, env, Depth::root(limits))
}

/// Apply a callable to already evaluated arguments (public API)
pub fn apply(func: &Value, args: Vec<Value>) -> Result<Value, Error> {
    apply_with_depth(func, args, Depth::root(&EvalLimits::default()))
}

/// Native stack that must be left before evaluating one more level
const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each stack segment allocated once the red zone is reached
const STACK_SEGMENT_SIZE: usize = 4 * 1024 * 1024;

/// Every evaluator level passes through here, so the depth limit rather
/// than the caller's thread stack bounds recursion
fn eval_with_depth_tracking(expr: &Expr, env: &Environment, depth: Depth) -> Result<Value, Error> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || eval_expr(expr, env, depth))
}

fn eval_expr(expr: &Expr, env: &Environment, depth: Depth) -> Result<Value, Error> {
    depth.check()?;
    log::trace!("eval[{}]: {expr}", depth.level);

    match expr {
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),

        // Variable lookup through the scope chain
        Expr::Symbol(name) => env
            .lookup(name)
            .ok_or_else(|| Error::UnboundSymbol(name.clone())),

        Expr::List(elements) => {
            eval_list(elements, env, depth).map_err(|err| add_context(err, expr))
        }
    }
}

/// Attach the failing expression to evaluation and type errors.
///
/// Only the innermost list gets a context line; enclosing frames pass the
/// error on unchanged so deep recursion does not grow the message.
fn add_context(error: Error, expr: &Expr) -> Error {
    const MARKER: &str = "\n  Context: ";
    match error {
        Error::EvalError(msg) if !msg.contains(MARKER) => {
            Error::EvalError(format!("{msg}{MARKER}while evaluating: {expr}"))
        }
        Error::TypeError(msg) if !msg.contains(MARKER) => {
            Error::TypeError(format!("{msg}{MARKER}while evaluating: {expr}"))
        }
        // Unbound symbols, arity and syntax errors carry their own context
        other => other,
    }
}

fn eval_args(args: &[Expr], env: &Environment, depth: Depth) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth.deeper()))
        .collect()
}

/// Evaluate a list: special form if the head is a reserved word, function
/// application otherwise
fn eval_list(elements: &[Expr], env: &Environment, depth: Depth) -> Result<Value, Error> {
    if let [Expr::Symbol(head), args @ ..] = elements
        && let Some(form) = find_special_form(head)
    {
        form.arity.validate(args.len())?;
        return (form.eval)(args, env, depth);
    }

    match elements {
        [] => Err(Error::EvalError("Cannot evaluate empty list".to_owned())),

        // Every element is evaluated left to right in the current environment
        [func_expr, arg_exprs @ ..] => {
            let func = eval_with_depth_tracking(func_expr, env, depth.deeper())?;
            let args = eval_args(arg_exprs, env, depth)?;
            apply_with_depth(&func, args, depth)
        }
    }
}

fn apply_with_depth(func: &Value, args: Vec<Value>, depth: Depth) -> Result<Value, Error> {
    match func {
        Value::NativeFunction { func, .. } => func(args),
        Value::Closure {
            params,
            body,
            env: closure_env,
        } => {
            if params.len() != args.len() {
                log::warn!(
                    "closure ({}) called with {} argument(s); binding the first {}",
                    params.join(" "),
                    args.len(),
                    params.len().min(args.len())
                );
            }
            log::debug!("apply closure ({}) to {} argument(s)", params.join(" "), args.len());

            // Parent is the captured environment, never the caller's
            let call_env = Environment::create(params, args, closure_env);
            eval_with_depth_tracking(body, &call_env, depth.deeper())
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

/// Evaluate quote special form: the rest of the list as data
pub(crate) fn eval_quote(args: &[Expr], _env: &Environment, _depth: Depth) -> Result<Value, Error> {
    Ok(Value::List(args.iter().map(Value::from).collect()))
}

/// Evaluate define special form
pub(crate) fn eval_define(args: &[Expr], env: &Environment, depth: Depth) -> Result<Value, Error> {
    match args {
        [Expr::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, env, depth.deeper())?;
            log::debug!("define {name}");
            env.bind(name.as_str(), value);
            Ok(Value::Unspecified)
        }
        [_, _] => Err(Error::TypeError("define requires a symbol".to_owned())),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if(args: &[Expr], env: &Environment, depth: Depth) -> Result<Value, Error> {
    match args {
        [condition_expr, then_expr, else_expr] => {
            let condition = eval_with_depth_tracking(condition_expr, env, depth.deeper())?;
            let branch = if condition.is_truthy() {
                then_expr
            } else {
                else_expr
            };
            eval_with_depth_tracking(branch, env, depth.deeper())
        }
        _ => Err(Error::arity_error(3, args.len())),
    }
}

/// Evaluate lambda special form
pub(crate) fn eval_lambda(args: &[Expr], env: &Environment, _depth: Depth) -> Result<Value, Error> {
    match args {
        [Expr::List(param_list), body] => {
            let mut params: Vec<String> = Vec::with_capacity(param_list.len());
            for param in param_list {
                match param {
                    Expr::Symbol(name) => {
                        if params.contains(name) {
                            return Err(Error::EvalError(format!(
                                "Duplicate parameter name: {name}"
                            )));
                        }
                        params.push(name.clone());
                    }
                    _ => {
                        return Err(Error::TypeError(
                            "Lambda parameters must be symbols".to_owned(),
                        ));
                    }
                }
            }

            Ok(Value::Closure {
                params,
                body: Rc::new(body.clone()),
                env: env.clone(),
            })
        }
        [_, _] => Err(Error::TypeError(
            "Lambda parameters must be a list".to_owned(),
        )),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Create a global environment with the primitive and math libraries
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        env.bind(builtin_op.id, builtin_op.to_value());
    }
    for (name, value) in MATH_CONSTANTS {
        env.bind(name, Value::Float(value));
    }

    env
}
