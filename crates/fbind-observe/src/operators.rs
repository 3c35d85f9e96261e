#![forbid(unsafe_code)]

//! Scalar operator set.
//!
//! Operators are pure n-ary functions over [`Value`]s. The compiler wraps
//! any name found in an [`OperatorTable`] into an observer that recomputes
//! whenever one of its operands changes. Operators that declare an inverse
//! can also sit on the target side of a two-way binding.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use fbind_core::Value;

use crate::observer::{Emit, Observer, Scope, distinct, observe_args};

/// An operator implementation.
pub type OperatorFn = Rc<dyn Fn(&[Value]) -> Value>;

/// Maps a unary operator's output back to an input producing it.
pub type InverseFn = Rc<dyn Fn(&Value) -> Value>;

/// A named operator with an optional inverse.
#[derive(Clone)]
pub struct Operator {
    pub func: OperatorFn,
    pub inverse: Option<InverseFn>,
}

impl Operator {
    pub fn new(func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            func: Rc::new(func),
            inverse: None,
        }
    }

    /// Declare the inverse used when writing through this operator.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Fn(&Value) -> Value + 'static) -> Self {
        self.inverse = Some(Rc::new(inverse));
        self
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("invertible", &self.inverse.is_some())
            .finish()
    }
}

/// Open registry of operators by name.
#[derive(Clone, Default)]
pub struct OperatorTable {
    operators: AHashMap<String, Operator>,
}

impl OperatorTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an operator.
    pub fn insert(&mut self, name: impl Into<String>, operator: Operator) -> &mut Self {
        self.operators.insert(name.into(), operator);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Arithmetic, comparison, logic, and string helpers.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::new();
        table
            .insert(
                "not",
                Operator::new(|a| Value::Bool(!arg(a, 0).truthy()))
                    .with_inverse(|v| Value::Bool(!v.truthy())),
            )
            .insert(
                "neg",
                Operator::new(|a| Value::Number(-arg(a, 0).to_number()))
                    .with_inverse(|v| Value::Number(-v.to_number())),
            )
            .insert("number", Operator::new(|a| Value::Number(arg(a, 0).to_number())))
            .insert("string", Operator::new(|a| Value::string(display(&arg(a, 0)))))
            .insert("add", Operator::new(add))
            .insert("sub", numeric(|x, y| x - y))
            .insert("mul", numeric(|x, y| x * y))
            .insert("div", numeric(|x, y| x / y))
            .insert("rem", numeric(|x, y| x % y))
            .insert("pow", numeric(f64::powf))
            .insert("lessThan", ordering(Ordering::is_lt))
            .insert("greaterThan", ordering(Ordering::is_gt))
            .insert("lessThanOrEqual", ordering(Ordering::is_le))
            .insert("greaterThanOrEqual", ordering(Ordering::is_ge))
            .insert(
                "compare",
                Operator::new(|a| {
                    Value::Number(match compare(&arg(a, 0), &arg(a, 1)) {
                        Ordering::Less => -1.0,
                        Ordering::Equal => 0.0,
                        Ordering::Greater => 1.0,
                    })
                }),
            )
            .insert("equals", Operator::new(|a| Value::Bool(arg(a, 0).same(&arg(a, 1)))))
            .insert("notEquals", Operator::new(|a| Value::Bool(!arg(a, 0).same(&arg(a, 1)))))
            .insert("and", Operator::new(|a| Value::Bool(a.iter().all(Value::truthy))))
            .insert("or", Operator::new(|a| Value::Bool(a.iter().any(Value::truthy))))
            .insert(
                "default",
                Operator::new(|a| a.iter().find(|v| !v.is_nullish()).cloned().unwrap_or_default()),
            )
            .insert("contains", text(|s, needle| s.contains(needle)))
            .insert("startsWith", text(|s, prefix| s.starts_with(prefix)))
            .insert("endsWith", text(|s, suffix| s.ends_with(suffix)));
        table
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OperatorTable").field("operators", &names).finish()
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn display(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric sum, or concatenation as soon as a string operand is involved.
fn add(args: &[Value]) -> Value {
    if args.iter().any(|v| matches!(v, Value::String(_))) {
        Value::string(args.iter().map(display).collect::<String>())
    } else {
        Value::Number(args.iter().map(Value::to_number).sum())
    }
}

fn numeric(op: fn(f64, f64) -> f64) -> Operator {
    Operator::new(move |a| Value::Number(op(arg(a, 0).to_number(), arg(a, 1).to_number())))
}

/// Numbers compare numerically (and `NaN` compares with nothing); other
/// values use the total order of [`Value::compare`].
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => a.compare(b),
    }
}

fn ordering(test: fn(Ordering) -> bool) -> Operator {
    Operator::new(move |a| {
        let (x, y) = (arg(a, 0), arg(a, 1));
        let nan = x.as_number().is_some_and(f64::is_nan) || y.as_number().is_some_and(f64::is_nan);
        Value::Bool(!nan && test(compare(&x, &y)))
    })
}

fn text(test: fn(&str, &str) -> bool) -> Operator {
    Operator::new(move |a| match (arg(a, 0).as_str(), arg(a, 1).as_str()) {
        (Some(s), Some(other)) => Value::Bool(test(s, other)),
        _ => Value::Bool(false),
    })
}

/// Observer applying `func` to the latest values of `args`.
///
/// Recomputes whenever one operand emits a value that is not
/// [`Value::same`] as its previous one, and forwards only changed results.
pub fn observe(func: OperatorFn, args: Vec<Observer>) -> Observer {
    Rc::new(move |emit: Emit, scope: &Scope| {
        let emit = distinct(emit);
        let func = Rc::clone(&func);
        observe_args(&args, scope, move |values| emit(func(values)))
    })
}
