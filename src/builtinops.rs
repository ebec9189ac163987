//! Built-in operations registry.
//!
//! Every primitive the language ships - list manipulation, arithmetic,
//! variable and function definition, environment introspection and session
//! termination - is defined here as a plain function with the canonical
//! builtin signature and collected into a single registry the evaluator
//! binds into the global environment.
//!
//! ## Error discipline
//!
//! Argument counts are declared per operation as an [`Arity`] contract and
//! validated centrally before the call. Inside a builtin, every remaining
//! precondition (argument types, non-empty lists, symbol/value pairing) is
//! checked explicitly, and violations produce [`Value::Error`] results with
//! formatted messages - a builtin never panics on bad user input and never
//! uses the `Err` arm for ordinary failures. The only builtin that touches
//! the `Err` arm is `exit`, which raises the typed [`Exit`] session signal.
//!
//! ## Adding a new operation
//!
//! 1. Implement a function with the [`BuiltinFn`] signature
//! 2. Add a [`BuiltinDef`] entry to `BUILTIN_OPS` with its name and arity
//! 3. Cover its behavior and error cases in the tests below

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Exit;
use crate::ast::Value;
use crate::evaluator::{self, EnvRef, Environment};

/// Canonical signature shared by every builtin: the calling environment and
/// the already-evaluated argument list
pub type BuiltinFn = fn(&EnvRef, Vec<Value>) -> Result<Value, Exit>;

/// Expected number of arguments for a builtin operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// At least this many arguments
    AtLeast(usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check an argument count against this contract
    pub(crate) fn validate(self, name: &str, got: usize) -> Result<(), String> {
        match self {
            Arity::Exact(expected) if got != expected => Err(format!(
                "Function '{name}' passed incorrect number of arguments. \
                 Expected {expected}, was given {got}"
            )),
            Arity::AtLeast(expected) if got < expected => Err(format!(
                "Function '{name}' passed incorrect number of arguments. \
                 Expected at least {expected}, was given {got}"
            )),
            _ => Ok(()),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug)]
pub struct BuiltinDef {
    /// Name the operation is bound to in the global environment
    pub name: &'static str,
    /// Argument-count contract, validated before the call
    pub arity: Arity,
    /// The implementation
    pub func: BuiltinFn,
}

impl PartialEq for BuiltinDef {
    fn eq(&self, other: &Self) -> bool {
        // Compare operations by name, which uniquely identifies them
        self.name == other.name
    }
}

//
// Builtin Function Implementations
//

/// Type-mismatch error, 0-based argument indexing
fn type_error(name: &str, index: usize, expected: &str, got: &Value) -> Value {
    Value::error(format!(
        "Function '{name}' passed incorrect type for argument {index}. \
         Expected {expected}, was given {}",
        got.type_name()
    ))
}

/// Empty-list error for operations that need at least one element
fn empty_error(name: &str) -> Value {
    Value::error(format!(
        "Function '{name}' passed empty Q-Expression, must contain at least one element"
    ))
}

fn builtin_list(_env: &EnvRef, args: Vec<Value>) -> Result<Value, Exit> {
    Ok(Value::QExpr(args))
}

fn builtin_head(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    Ok(match args.remove(0) {
        Value::QExpr(items) if items.is_empty() => empty_error("head"),
        Value::QExpr(mut items) => Value::QExpr(vec![items.remove(0)]),
        other => type_error("head", 0, "Q-Expression", &other),
    })
}

fn builtin_tail(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    Ok(match args.remove(0) {
        Value::QExpr(items) if items.is_empty() => empty_error("tail"),
        Value::QExpr(mut items) => {
            items.remove(0);
            Value::QExpr(items)
        }
        other => type_error("tail", 0, "Q-Expression", &other),
    })
}

fn builtin_init(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    Ok(match args.remove(0) {
        Value::QExpr(items) if items.is_empty() => empty_error("init"),
        Value::QExpr(mut items) => {
            items.pop();
            Value::QExpr(items)
        }
        other => type_error("init", 0, "Q-Expression", &other),
    })
}

fn builtin_len(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    Ok(match args.remove(0) {
        Value::QExpr(items) => Value::Number(items.len() as f64),
        other => type_error("len", 0, "Q-Expression", &other),
    })
}

fn builtin_eval(env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    match args.remove(0) {
        // Relabeling a Q-expression as an S-expression is the one way data
        // becomes code again
        Value::QExpr(items) => evaluator::eval(env, Value::SExpr(items)),
        other => Ok(type_error("eval", 0, "Q-Expression", &other)),
    }
}

fn builtin_join(_env: &EnvRef, args: Vec<Value>) -> Result<Value, Exit> {
    let mut joined = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        match arg {
            Value::QExpr(items) => joined.extend(items),
            other => return Ok(type_error("join", index, "Q-Expression", &other)),
        }
    }
    Ok(Value::QExpr(joined))
}

fn builtin_cons(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    let value = args.remove(0);
    Ok(match args.remove(0) {
        Value::QExpr(mut items) => {
            items.insert(0, value);
            Value::QExpr(items)
        }
        other => type_error("cons", 1, "Q-Expression", &other),
    })
}

/// C remainder() semantics: remainder of x/y with the quotient rounded to
/// nearest, ties to even
fn ieee_remainder(x: f64, y: f64) -> f64 {
    x - (x / y).round_ties_even() * y
}

/// Fold an arithmetic operator over a Number argument list
fn fold_arithmetic(name: &str, args: Vec<Value>) -> Value {
    let mut nums = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        match arg {
            Value::Number(n) => nums.push(*n),
            other => return type_error(name, index, "Number", other),
        }
    }

    let Some((&first, rest)) = nums.split_first() else {
        return Value::error(format!(
            "Function '{name}' passed incorrect number of arguments. \
             Expected at least 1, was given 0"
        ));
    };

    // Unary minus negates
    if name == "-" && rest.is_empty() {
        return Value::Number(-first);
    }

    let mut acc = first;
    for &n in rest {
        acc = match name {
            "+" => acc + n,
            "-" => acc - n,
            "*" => acc * n,
            "/" => {
                if n == 0.0 {
                    return Value::error("Division by zero");
                }
                acc / n
            }
            "%" => {
                if n == 0.0 {
                    return Value::error("Remainder on division by zero");
                }
                ieee_remainder(acc, n)
            }
            _ => return Value::error(format!("Unknown operator '{name}'")),
        };
    }

    Value::Number(acc)
}

// Generate the arithmetic builtins, which share the fold above
macro_rules! arithmetic_builtin {
    ($fn_name:ident, $op:literal) => {
        fn $fn_name(_env: &EnvRef, args: Vec<Value>) -> Result<Value, Exit> {
            Ok(fold_arithmetic($op, args))
        }
    };
}

arithmetic_builtin!(builtin_add, "+");
arithmetic_builtin!(builtin_sub, "-");
arithmetic_builtin!(builtin_mul, "*");
arithmetic_builtin!(builtin_div, "/");
arithmetic_builtin!(builtin_rem, "%");

/// Scope a variable-binding builtin writes into
#[derive(Clone, Copy, PartialEq)]
enum BindScope {
    Global,
    Local,
}

/// Shared implementation of `def` (global scope) and `=` (local scope):
/// bind each symbol of a Q-expression to the corresponding positional value
fn bind_symbols(env: &EnvRef, mut args: Vec<Value>, name: &str, scope: BindScope) -> Value {
    let symbols = match args.remove(0) {
        Value::QExpr(items) => items,
        other => return type_error(name, 0, "Q-Expression", &other),
    };

    let mut names = Vec::with_capacity(symbols.len());
    for entry in &symbols {
        match entry {
            Value::Symbol(s) => names.push(s.clone()),
            other => {
                return Value::error(format!(
                    "Function '{name}' cannot define non-symbols. \
                     Expected Symbol, was given {}",
                    other.type_name()
                ));
            }
        }
    }

    if names.len() != args.len() {
        return Value::error(format!(
            "Function '{name}' cannot define mismatched number of values to symbols. \
             Was given {} symbol(s) but {} value(s).",
            names.len(),
            args.len()
        ));
    }

    for (symbol, value) in names.into_iter().zip(args) {
        match scope {
            BindScope::Global => env.define(&symbol, value),
            BindScope::Local => env.put(&symbol, value),
        }
    }

    Value::SExpr(Vec::new())
}

fn builtin_def(env: &EnvRef, args: Vec<Value>) -> Result<Value, Exit> {
    Ok(bind_symbols(env, args, "def", BindScope::Global))
}

fn builtin_put(env: &EnvRef, args: Vec<Value>) -> Result<Value, Exit> {
    Ok(bind_symbols(env, args, "=", BindScope::Local))
}

/// Validate a formal-parameter list: every entry must be a symbol
fn formal_names(name: &str, formals: &[Value]) -> Result<Vec<String>, Value> {
    let mut names = Vec::with_capacity(formals.len());
    for formal in formals {
        match formal {
            Value::Symbol(s) => names.push(s.clone()),
            other => {
                return Err(Value::error(format!(
                    "Function '{name}' cannot define non-symbol. \
                     Expected Symbol, was given {}",
                    other.type_name()
                )));
            }
        }
    }
    Ok(names)
}

fn builtin_lambda(_env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    let formals = match args.remove(0) {
        Value::QExpr(items) => items,
        other => return Ok(type_error("lambda", 0, "Q-Expression", &other)),
    };
    let body = match args.remove(0) {
        Value::QExpr(items) => items,
        other => return Ok(type_error("lambda", 1, "Q-Expression", &other)),
    };

    let formals = match formal_names("lambda", &formals) {
        Ok(names) => names,
        Err(error) => return Ok(error),
    };

    // The closure scope starts empty; it is chained to the calling
    // environment only when the closure is invoked
    Ok(Value::Lambda {
        env: Environment::new(),
        formals,
        body,
    })
}

/// `fun {name args...} {body}` is sugar for
/// `def {name} (lambda {args...} {body})`
fn builtin_fun(env: &EnvRef, mut args: Vec<Value>) -> Result<Value, Exit> {
    let mut header = match args.remove(0) {
        Value::QExpr(items) => items,
        other => return Ok(type_error("fun", 0, "Q-Expression", &other)),
    };
    let body = match args.remove(0) {
        Value::QExpr(items) => items,
        other => return Ok(type_error("fun", 1, "Q-Expression", &other)),
    };

    if header.is_empty() {
        return Ok(empty_error("fun"));
    }
    let name = match header.remove(0) {
        Value::Symbol(s) => s,
        other => {
            return Ok(Value::error(format!(
                "Function 'fun' cannot define non-symbol. Expected Symbol, was given {}",
                other.type_name()
            )));
        }
    };

    let formals = match formal_names("fun", &header) {
        Ok(names) => names,
        Err(error) => return Ok(error),
    };

    env.define(
        &name,
        Value::Lambda {
            env: Environment::new(),
            formals,
            body,
        },
    );
    Ok(Value::SExpr(Vec::new()))
}

fn builtin_env(env: &EnvRef, _args: Vec<Value>) -> Result<Value, Exit> {
    println!("Named values in current environment:");
    for (name, value) in env.local_bindings_sorted() {
        println!("{} {}", value.type_name(), name);
    }
    Ok(Value::SExpr(Vec::new()))
}

fn builtin_exit(_env: &EnvRef, _args: Vec<Value>) -> Result<Value, Exit> {
    Err(Exit)
}

/// Global registry of all built-in operations, bound into the root
/// environment by [`evaluator::create_global_env`]
static BUILTIN_OPS: LazyLock<Vec<BuiltinDef>> = LazyLock::new(|| {
    vec![
        // Session control
        BuiltinDef {
            name: "exit",
            arity: Arity::Any,
            func: builtin_exit,
        },
        // Variable and function definition
        BuiltinDef {
            name: "def",
            arity: Arity::AtLeast(1),
            func: builtin_def,
        },
        BuiltinDef {
            name: "=",
            arity: Arity::AtLeast(1),
            func: builtin_put,
        },
        BuiltinDef {
            name: "lambda",
            arity: Arity::Exact(2),
            func: builtin_lambda,
        },
        BuiltinDef {
            name: "fun",
            arity: Arity::Exact(2),
            func: builtin_fun,
        },
        BuiltinDef {
            name: "env",
            arity: Arity::Any,
            func: builtin_env,
        },
        // List operations
        BuiltinDef {
            name: "list",
            arity: Arity::Any,
            func: builtin_list,
        },
        BuiltinDef {
            name: "head",
            arity: Arity::Exact(1),
            func: builtin_head,
        },
        BuiltinDef {
            name: "tail",
            arity: Arity::Exact(1),
            func: builtin_tail,
        },
        BuiltinDef {
            name: "init",
            arity: Arity::Exact(1),
            func: builtin_init,
        },
        BuiltinDef {
            name: "eval",
            arity: Arity::Exact(1),
            func: builtin_eval,
        },
        BuiltinDef {
            name: "join",
            arity: Arity::AtLeast(1),
            func: builtin_join,
        },
        BuiltinDef {
            name: "cons",
            arity: Arity::Exact(2),
            func: builtin_cons,
        },
        BuiltinDef {
            name: "len",
            arity: Arity::Exact(1),
            func: builtin_len,
        },
        // Arithmetic
        BuiltinDef {
            name: "+",
            arity: Arity::AtLeast(1),
            func: builtin_add,
        },
        BuiltinDef {
            name: "-",
            arity: Arity::AtLeast(1),
            func: builtin_sub,
        },
        BuiltinDef {
            name: "*",
            arity: Arity::AtLeast(1),
            func: builtin_mul,
        },
        BuiltinDef {
            name: "/",
            arity: Arity::AtLeast(1),
            func: builtin_div,
        },
        BuiltinDef {
            name: "%",
            arity: Arity::AtLeast(1),
            func: builtin_rem,
        },
    ]
});

/// Map from operation name to registry entry
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinDef>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.name, op)).collect());

/// All registered builtin operations
pub fn builtin_ops() -> &'static [BuiltinDef] {
    &BUILTIN_OPS
}

/// Look up a builtin operation by name
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDef> {
    BUILTIN_INDEX.get(name).copied()
}
