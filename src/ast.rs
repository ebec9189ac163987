//! Core value types for the interpreter. The central enum, [`Value`], covers
//! every runtime datum: numbers, symbols, propagating error values, built-in
//! and user-defined functions, and the two list flavors (evaluable
//! S-expressions and quoted Q-expressions). Helper constructors such as
//! [`num`], [`sym`], [`sexpr`] and [`qexpr`] keep value construction readable
//! in tests. Display follows the surface syntax, so most values re-parse to
//! themselves; no arithmetic or comparison semantics live here, they belong
//! to the evaluator and the builtin registry.

use std::fmt;

use crate::builtinops::BuiltinDef;
use crate::evaluator::EnvRef;

/// Reserved formal-parameter name that collects remaining call arguments
/// into a single list parameter
pub(crate) const VARIADIC_MARKER: &str = "&";

/// Runtime value of the interpreter
///
/// Every consumer (printer, evaluator, builtins) matches exhaustively on
/// this enum; there is no other runtime representation.
#[derive(Clone)]
pub enum Value {
    /// Double-precision numbers
    Number(f64),
    /// Identifiers, resolved against an environment when evaluated
    Symbol(String),
    /// Propagating failure values; never evaluated further, only passed
    /// upward through enclosing expressions
    Error(String),
    /// Built-in functions (registry entries carrying name, arity and impl)
    Builtin(&'static BuiltinDef),
    /// User-defined functions: captured scope, formal parameter names and a
    /// body evaluated as an S-expression at call time. A shorter formals
    /// list than the original definition marks a partially-applied function.
    Lambda {
        env: EnvRef,
        formals: Vec<String>,
        body: Vec<Value>,
    },
    /// Evaluable lists: first element is the operator
    SExpr(Vec<Value>),
    /// Quoted lists: inert data until passed through the `eval` builtin
    QExpr(Vec<Value>),
}

impl Value {
    /// External type name, as used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Symbol(_) => "Symbol",
            Value::Error(_) => "Error",
            Value::Builtin(_) | Value::Lambda { .. } => "Function",
            Value::SExpr(_) => "S-Expression",
            Value::QExpr(_) => "Q-Expression",
        }
    }

    /// Shorthand for building error values from formatted messages
    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(message.into())
    }
}

/// Helper function for creating number values
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn num(n: f64) -> Value {
    Value::Number(n)
}

/// Helper function for creating symbols from both &str and String
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating S-expressions
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sexpr(items: Vec<Value>) -> Value {
    Value::SExpr(items)
}

/// Helper function for creating Q-expressions
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn qexpr(items: Vec<Value>) -> Value {
    Value::QExpr(items)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Error(msg) => write!(f, "Error({msg})"),
            Value::Builtin(op) => write!(f, "Builtin({})", op.name),
            Value::Lambda { formals, body, .. } => {
                write!(f, "Lambda(formals={formals:?}, body={body:?})")
            }
            Value::SExpr(items) => write_debug_list(f, "SExpr", items),
            Value::QExpr(items) => write_debug_list(f, "QExpr", items),
        }
    }
}

fn write_debug_list(f: &mut fmt::Formatter<'_>, label: &str, items: &[Value]) -> fmt::Result {
    write!(f, "{label}(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item:?}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Error(msg) => write!(f, "Error: {msg}"),
            Value::Builtin(_) => write!(f, "builtin function"),
            Value::Lambda { formals, body, .. } => {
                write!(f, "function ({{")?;
                for (i, name) in formals.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{name}")?;
                }
                write!(f, "}} -> ")?;
                write_display_list(f, body, '{', '}')?;
                write!(f, ")")
            }
            Value::SExpr(items) => write_display_list(f, items, '(', ')'),
            Value::QExpr(items) => write_display_list(f, items, '{', '}'),
        }
    }
}

fn write_display_list(
    f: &mut fmt::Formatter<'_>,
    items: &[Value],
    open: char,
    close: char,
) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            // Builtins are compared by name, not function pointer
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (
                Value::Lambda {
                    env: e1,
                    formals: f1,
                    body: b1,
                },
                Value::Lambda {
                    env: e2,
                    formals: f2,
                    body: b2,
                },
            ) => f1 == f2 && b1 == b2 && e1 == e2,
            (Value::SExpr(a), Value::SExpr(b)) => a == b,
            (Value::QExpr(a), Value::QExpr(b)) => a == b,
            _ => false, // Different variants are never equal
        }
    }
}
