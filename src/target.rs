//! Units of work that can be timed.

use std::fmt;
use std::hint::black_box;

use serde_json::Map;

use crate::errors::{BaselineError, BoxError};
use crate::expr::{CompiledExpression, Namespace};

/// Argument and result type for bound and expression targets.
pub type Value = serde_json::Value;

/// Keyword bindings for [`Target::bound`].
pub type Kwargs = Map<String, Value>;

type CallFn<'a> = Box<dyn FnMut() -> Result<(), BoxError> + 'a>;
type BoundFn<'a> = Box<dyn FnMut(&[Value], &Kwargs) -> Result<Value, BoxError> + 'a>;

/// Something [`Timer`](crate::timer::Timer) can invoke repeatedly.
///
/// The target must tolerate being called many times; any side effects that make
/// later calls behave differently will skew the measurement.
pub enum Target<'a> {
    /// Zero-argument callable.
    Call(CallFn<'a>),
    /// Callable with positional and keyword bindings applied on every call.
    Bound {
        func: BoundFn<'a>,
        args: Vec<Value>,
        kwargs: Kwargs,
    },
    /// Pre-parsed expression evaluated against a namespace.
    Expression(CompiledExpression<'a>),
}

impl<'a> Target<'a> {
    /// Time an infallible closure. Its return value is kept opaque to the optimizer.
    pub fn call<F, R>(mut f: F) -> Self
    where
        F: FnMut() -> R + 'a,
    {
        Target::Call(Box::new(move || {
            black_box(f());
            Ok(())
        }))
    }

    /// Time a fallible closure. The first `Err` aborts the measurement.
    pub fn try_call<F, R, E>(mut f: F) -> Self
    where
        F: FnMut() -> Result<R, E> + 'a,
        E: Into<BoxError>,
    {
        Target::Call(Box::new(move || match f() {
            Ok(value) => {
                black_box(value);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }))
    }

    pub fn bound<F, E>(mut func: F, args: Vec<Value>, kwargs: Kwargs) -> Self
    where
        F: FnMut(&[Value], &Kwargs) -> Result<Value, E> + 'a,
        E: Into<BoxError>,
    {
        Target::Bound {
            func: Box::new(move |args: &[Value], kwargs: &Kwargs| {
                func(args, kwargs).map_err(Into::into)
            }),
            args,
            kwargs,
        }
    }

    /// Parse `source` once against `namespace`; only evaluation is timed.
    pub fn expression(source: &str, namespace: Namespace<'a>) -> Result<Self, BaselineError> {
        CompiledExpression::compile(source, namespace).map(Target::Expression)
    }

    /// Run the target once.
    pub fn invoke(&mut self) -> Result<(), BoxError> {
        match self {
            Target::Call(f) => f(),
            Target::Bound { func, args, kwargs } => {
                black_box(func(args.as_slice(), kwargs)?);
                Ok(())
            }
            Target::Expression(expr) => {
                black_box(expr.evaluate()?);
                Ok(())
            }
        }
    }

    /// Short label used in logs when no benchmark name is available.
    pub fn describe(&self) -> String {
        match self {
            Target::Call(_) => "<callable>".to_string(),
            Target::Bound { args, kwargs, .. } => {
                format!("<callable>({} args, {} kwargs)", args.len(), kwargs.len())
            }
            Target::Expression(expr) => expr.source().to_string(),
        }
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target").field(&self.describe()).finish()
    }
}
