//! The scope chain.
//!
//! An [`Environment`] is a cheap, clonable handle to one frame of bindings
//! plus an optional parent handle. Frames are shared: the evaluation that
//! created a frame and every closure built while it was active all hold the
//! same frame. Parent links only point outwards, so the chain from any frame
//! ends at the root.
//!
//! Frames live on the `gc` heap. A closure defined inside a call is stored
//! in the very frame it captured, and such cycles are reclaimed by the
//! collector once no handle outside the cycle remains.

use std::collections::HashMap;
use std::rc::Rc;

use gc::{Finalize, Gc, GcCell, Trace};

use crate::Error;
use crate::intooperation::{IntoOperation, IntoVariadicOperation};
use crate::value::Value;

#[derive(Default, Trace, Finalize)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// Handle to a frame of variable bindings
#[derive(Clone, Trace, Finalize)]
pub struct Environment {
    frame: Gc<GcCell<Frame>>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::with_frame(Frame::default())
    }
}

impl Environment {
    /// A new root frame with no bindings
    pub fn new() -> Self {
        Environment::default()
    }

    fn with_frame(frame: Frame) -> Self {
        Environment {
            frame: Gc::new(GcCell::new(frame)),
        }
    }

    /// A new frame whose bindings are `params` zipped positionally with
    /// `args` and whose parent is `parent`.
    ///
    /// Lengths are not checked: the zip stops at the shorter of the two, so
    /// surplus arguments are dropped and surplus parameters stay unbound.
    pub fn create(params: &[String], args: Vec<Value>, parent: &Environment) -> Self {
        let bindings = params.iter().cloned().zip(args).collect();
        Environment::with_frame(Frame {
            bindings,
            parent: Some(parent.clone()),
        })
    }

    /// Find the innermost frame, starting with this one, that binds `name`
    pub fn locate(&self, name: &str) -> Option<Environment> {
        let mut current = self.clone();
        loop {
            if current.binds_locally(name) {
                return Some(current);
            }
            // The root frame has no parent, which ends the walk
            current = current.parent()?;
        }
    }

    /// The value `name` resolves to through the scope chain
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.locate(name)
            .and_then(|owner| owner.frame.borrow().bindings.get(name).cloned())
    }

    /// Bind `name` in this frame, shadowing any binding in an outer frame
    /// and replacing an existing binding in this one
    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.frame.borrow_mut().bindings.insert(name.into(), value);
    }

    /// True if `name` is bound directly in this frame
    pub fn binds_locally(&self, name: &str) -> bool {
        self.frame.borrow().bindings.contains_key(name)
    }

    pub fn parent(&self) -> Option<Environment> {
        self.frame.borrow().parent.clone()
    }

    /// True if both handles refer to the same frame
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Gc::ptr_eq(&self.frame, &other.frame)
    }

    /// Register a builtin that works on the raw argument vector.
    ///
    /// # Example
    /// ```
    /// use tinylisp::evaluator::create_global_env;
    /// use tinylisp::value::Value;
    /// use tinylisp::Error;
    ///
    /// fn arg_count(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::Integer(args.len() as i64))
    /// }
    ///
    /// let env = create_global_env();
    /// env.register_builtin_function("arg-count", arg_count);
    /// let result = tinylisp::run_line("(arg-count 1 2 3)", &env, &Default::default()).unwrap();
    /// assert_eq!(result, Value::Integer(3));
    /// ```
    pub fn register_builtin_function(&self, name: &str, func: fn(&[Value]) -> Result<Value, Error>) {
        self.bind(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: Rc::new(move |args: Vec<Value>| func(&args)),
            },
        );
    }

    /// Register a strongly-typed Rust function as a builtin.
    ///
    /// Parameters are converted from the evaluated arguments (`i64`,
    /// `f64`, `Number`, `Value`, `ValueListIterator<'_>`), the argument
    /// count is checked, and the return value (`R: Into<Value>` or
    /// `Result<R, E>`) is converted back.
    ///
    /// ```
    /// use tinylisp::evaluator::create_global_env;
    /// use tinylisp::value::Value;
    ///
    /// fn clamp(x: i64, lo: i64, hi: i64) -> i64 {
    ///     x.clamp(lo, hi)
    /// }
    ///
    /// let env = create_global_env();
    /// env.register_builtin_operation::<_, (i64, i64, i64), i64>("clamp", clamp);
    /// let result = tinylisp::run_line("(clamp 15 0 10)", &env, &Default::default()).unwrap();
    /// assert_eq!(result, Value::Integer(10));
    /// ```
    pub fn register_builtin_operation<F, Args, R>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args, R> + 'static,
    {
        self.bind(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: func.into_operation(),
            },
        );
    }

    /// Register a builtin whose last parameter collects the remaining
    /// arguments (`ValueListIterator<'_>` or `NumIterator<'_>`)
    pub fn register_variadic_builtin_operation<F, Args, R>(&self, name: &str, func: F)
    where
        F: IntoVariadicOperation<Args, R> + 'static,
    {
        self.bind(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: func.into_variadic_operation(),
            },
        );
    }

    /// All bindings visible from this frame, inner bindings hiding outer
    /// ones, sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = match self.parent() {
            Some(parent) => parent.get_all_bindings().into_iter().collect(),
            None => HashMap::new(),
        };

        for (name, value) in &self.frame.borrow().bindings {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Bindings can hold closures over this frame, so only names are shown
        let frame = self.frame.borrow();
        let mut names: Vec<&String> = frame.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("parent", &frame.parent)
            .finish()
    }
}
