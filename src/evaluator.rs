//! Expression evaluation: the environment model (chained lexical scopes with
//! a single global root) and the recursive reducer that resolves symbols,
//! evaluates S-expressions, and applies builtin functions and user-defined
//! closures, including partial application and variadic parameter binding.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Exit;
use crate::ast::{VARIADIC_MARKER, Value};
use crate::builtinops;

/// Shared handle to an environment; closures and call frames hold these
pub type EnvRef = Rc<Environment>;

/// Environment for variable bindings
///
/// One level of lexical scope: a name-to-value table plus an optional link
/// to the enclosing scope. The scope with no parent is the global scope.
#[derive(Debug, Default, PartialEq)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a fresh scope with no parent and no bindings
    pub fn new() -> EnvRef {
        Rc::new(Environment::default())
    }

    /// Assemble a scope from an already-built binding table and parent link
    fn from_parts(bindings: HashMap<String, Value>, parent: Option<EnvRef>) -> EnvRef {
        Rc::new(Environment {
            bindings: RefCell::new(bindings),
            parent,
        })
    }

    /// Look up a symbol, delegating to the parent scope on a local miss.
    /// Returns a copy of the bound value, or an error value when the name is
    /// unbound all the way up to the global scope.
    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = self.bindings.borrow().get(name) {
            return value.clone();
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => Value::error(format!("Unbound symbol '{name}'")),
        }
    }

    /// Insert or overwrite a binding in this scope only
    pub fn put(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_owned(), value);
    }

    /// Insert or overwrite a binding in the outermost (global) scope
    pub fn define(&self, name: &str, value: Value) {
        match &self.parent {
            Some(parent) => parent.define(name, value),
            None => self.put(name, value),
        }
    }

    /// Copy of this scope's own binding table, parents excluded
    pub(crate) fn local_bindings(&self) -> HashMap<String, Value> {
        self.bindings.borrow().clone()
    }

    /// This scope's own bindings as (name, value) pairs, sorted by name for
    /// deterministic output
    pub fn local_bindings_sorted(&self) -> Vec<(String, Value)> {
        let mut entries: Vec<_> = self
            .bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Create the global environment with every registry builtin bound to its name
pub fn create_global_env() -> EnvRef {
    let env = Environment::new();
    for op in builtinops::builtin_ops() {
        env.put(op.name, Value::Builtin(op));
    }
    env
}

/// Evaluate a value in the given environment.
///
/// Ordinary failures are returned as [`Value::Error`] values in the `Ok` arm;
/// `Err(Exit)` is produced only when the `exit` builtin runs.
pub fn eval(env: &EnvRef, value: Value) -> Result<Value, Exit> {
    match value {
        Value::Symbol(name) => Ok(env.get(&name)),
        Value::SExpr(items) => eval_sexpr(env, items),
        // Numbers, errors, functions and Q-expressions are already reduced
        other => Ok(other),
    }
}

/// Evaluate an S-expression: children first, then function application
fn eval_sexpr(env: &EnvRef, items: Vec<Value>) -> Result<Value, Exit> {
    // Evaluate every child left-to-right; definitions observe this order
    let mut evaluated = Vec::with_capacity(items.len());
    for item in items {
        evaluated.push(eval(env, item)?);
    }

    // The first error in evaluation order becomes the whole result
    if let Some(index) = evaluated.iter().position(|v| matches!(v, Value::Error(_))) {
        return Ok(evaluated.swap_remove(index));
    }

    if evaluated.is_empty() {
        return Ok(Value::SExpr(evaluated));
    }
    if evaluated.len() == 1 {
        return Ok(evaluated.remove(0));
    }

    let func = evaluated.remove(0);
    let args = evaluated;
    match func {
        Value::Builtin(op) => {
            if let Err(message) = op.arity.validate(op.name, args.len()) {
                return Ok(Value::Error(message));
            }
            (op.func)(env, args)
        }
        Value::Lambda {
            env: closure_env,
            formals,
            body,
        } => call_lambda(env, &closure_env, formals, body, args),
        other => Ok(Value::error(format!(
            "S-expression starts with incorrect type. Expected Function, was given {}",
            other.type_name()
        ))),
    }
}

/// Bind call arguments to a closure's formals, then either evaluate the body
/// (saturated call) or return a partially-applied closure (currying).
fn call_lambda(
    caller: &EnvRef,
    closure_env: &EnvRef,
    mut formals: Vec<String>,
    body: Vec<Value>,
    args: Vec<Value>,
) -> Result<Value, Exit> {
    let given = args.len();
    let total = formals.len();

    // Each invocation works on a private copy of the closure scope, so
    // partial applications and repeated calls never see each other's bindings
    let mut scope = closure_env.local_bindings();
    let mut remaining = args.into_iter();

    loop {
        if formals.is_empty() {
            if remaining.next().is_some() {
                return Ok(Value::error(format!(
                    "Function passed too many arguments. Got {given}, Expected {total}."
                )));
            }
            break;
        }

        if formals[0] == VARIADIC_MARKER {
            // The marker must be followed by exactly one rest-symbol, which
            // collects every remaining argument (possibly none) as a list
            if formals.len() != 2 {
                return Ok(Value::error(
                    "Function format invalid. Symbol '&' not followed by single symbol.",
                ));
            }
            let rest_name = formals.swap_remove(1);
            formals.clear();
            scope.insert(rest_name, Value::QExpr(remaining.collect()));
            break;
        }

        match remaining.next() {
            Some(arg) => {
                let formal = formals.remove(0);
                scope.insert(formal, arg);
            }
            // Out of arguments with formals left over: partial application
            None => break,
        }
    }

    if formals.is_empty() {
        // Saturated: chain the call scope to the calling environment so
        // globals and builtins stay visible, then run the body
        let call_env = Environment::from_parts(scope, Some(caller.clone()));
        eval(&call_env, Value::SExpr(body))
    } else {
        let partial_env = Environment::from_parts(scope, closure_env.parent.clone());
        Ok(Value::Lambda {
            env: partial_env,
            formals,
            body,
        })
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::num;
    use crate::reader::read;
    use crate::syntax::parse;

    /// Parse, read and evaluate one line, panicking on exit signals
    fn eval_line(env: &EnvRef, source: &str) -> Value {
        let tree = parse(source).unwrap();
        eval(env, read(&tree)).unwrap()
    }

    /// Run (source, expected rendering) cases, each in a fresh global scope
    fn run_eval_tests(cases: Vec<(&str, &str)>) {
        for (i, (source, expected)) in cases.iter().enumerate() {
            let env = create_global_env();
            let result = eval_line(&env, source);
            assert_eq!(
                format!("{result}"),
                *expected,
                "Eval test #{} failed for '{source}'",
                i + 1
            );
        }
    }

    /// Evaluate a sequence of lines in one shared scope and return the
    /// rendering of the last result
    fn run_session(lines: &[&str]) -> String {
        let env = create_global_env();
        let mut last = Value::SExpr(vec![]);
        for line in lines {
            last = eval_line(&env, line);
        }
        format!("{last}")
    }

    #[test]
    fn test_eval_basics() {
        let cases = vec![
            // ===== SELF-EVALUATING FORMS =====
            ("5", "5"),
            ("-5", "-5"),
            ("2.5", "2.5"),
            ("()", "()"),
            ("{1 2 3}", "{1 2 3}"),
            // Q-expressions are inert, even when they contain S-expressions
            ("{1 2 (+ 1 1)}", "{1 2 (+ 1 1)}"),
            // Singleton S-expressions reduce to their sole child
            ("(5)", "5"),
            ("((5))", "5"),
            // Symbols resolve to their bound values
            ("+", "builtin function"),
            ("no-such-symbol", "Error: Unbound symbol 'no-such-symbol'"),
            // A non-function head is rejected after child evaluation
            (
                "(1 2 3)",
                "Error: S-expression starts with incorrect type. Expected Function, was given Number",
            ),
            (
                "({x} 1)",
                "Error: S-expression starts with incorrect type. Expected Function, was given Q-Expression",
            ),
        ];

        run_eval_tests(cases);
    }

    #[test]
    fn test_eval_arithmetic() {
        let cases = vec![
            ("(+ 1 2 3)", "6"),
            ("(- 10 2 3)", "5"),
            ("(* 2 3 4)", "24"),
            ("(/ 10 4)", "2.5"),
            // Unary minus negates
            ("(- 5)", "-5"),
            ("(- -5)", "5"),
            // Nested expressions reduce inside-out
            ("(+ 1 (* 2 3))", "7"),
            ("(* (+ 1 1) (- 3 1))", "4"),
            ("(/ 1 0)", "Error: Division by zero"),
            ("(% 10 0)", "Error: Remainder on division by zero"),
            (
                "(+ 1 {})",
                "Error: Function '+' passed incorrect type for argument 1. Expected Number, was given Q-Expression",
            ),
        ];

        run_eval_tests(cases);
    }

    #[test]
    fn test_eval_error_propagation() {
        let cases = vec![
            // The first error in evaluation order wins, even when later
            // children also fail
            ("(+ (/ 1 0) unbound)", "Error: Division by zero"),
            ("(+ unbound (/ 1 0))", "Error: Unbound symbol 'unbound'"),
            // Errors escape through enclosing expressions unchanged
            ("(* 2 (+ 1 (/ 3 0)))", "Error: Division by zero"),
            ("(head {a} (/ 1 0))", "Error: Division by zero"),
        ];

        run_eval_tests(cases);
    }

    #[test]
    fn test_eval_idempotence() {
        // Fully-reduced values evaluate to themselves
        let env = create_global_env();
        assert_eq!(eval(&env, num(4.5)).unwrap(), num(4.5));
        assert_eq!(
            eval(&env, Value::error("boom")).unwrap(),
            Value::error("boom")
        );
        let qexpr = Value::QExpr(vec![num(1.0), num(2.0)]);
        assert_eq!(eval(&env, qexpr.clone()).unwrap(), qexpr);
    }

    #[test]
    fn test_def_and_local_scoping() {
        // def binds globally and stays visible afterwards
        assert_eq!(run_session(&["(def {x} 5)", "x"]), "5");
        assert_eq!(run_session(&["(def {x y} 1 2)", "(+ x y)"]), "3");

        // Global bindings are visible from descendant call scopes
        assert_eq!(
            run_session(&["(def {x} 5)", "(fun {getx y} {x})", "(getx 0)"]),
            "5"
        );

        // def from inside a function body escapes to the global scope
        assert_eq!(
            run_session(&["(fun {setg a} {def {g} a})", "(setg 42)", "g"]),
            "42"
        );

        // = binds into the local call scope only, so nothing leaks out
        assert_eq!(
            run_session(&["(fun {setl a} {= {l} a})", "(setl 42)", "l"]),
            "Error: Unbound symbol 'l'"
        );

        // Arguments shadow globals without overwriting them
        assert_eq!(
            run_session(&["(def {a} 1)", "(fun {probe a} {a})", "(probe 9)", "a"]),
            "1"
        );
    }

    #[test]
    fn test_lambda_and_currying() {
        let cases = vec![
            ("((lambda {a b} {+ a b}) 3 4)", "7"),
            // Partial application yields a printable function value
            ("((lambda {a b} {+ a b}) 3)", "function ({b} -> {+ a b})"),
            // Supplying the remaining argument completes the call
            ("(((lambda {a b} {+ a b}) 3) 4)", "7"),
            // Argument expressions are reduced before binding
            ("((lambda {a} {a}) (+ 1 2))", "3"),
            (
                "((lambda {a} {a}) 1 2)",
                "Error: Function passed too many arguments. Got 2, Expected 1.",
            ),
        ];

        run_eval_tests(cases);

        // A curried function stored under a name keeps its fixed argument
        assert_eq!(
            run_session(&[
                "(fun {add-together a b} {+ a b})",
                "(def {add1} (add-together 1))",
                "(add1 9)",
            ]),
            "10"
        );
    }

    #[test]
    fn test_variadic_binding() {
        let cases = vec![
            ("((lambda {a & rest} {len rest}) 1 2 3 4)", "3"),
            ("((lambda {a & rest} {rest}) 1 2 3)", "{2 3}"),
            // A call that exactly consumes the fixed formals binds the rest
            // parameter to an empty list
            ("((lambda {a & rest} {rest}) 1)", "{}"),
            ("((lambda {a & rest} {len rest}) 1)", "0"),
            // The marker must be followed by exactly one symbol
            (
                "((lambda {&} {1}) 5)",
                "Error: Function format invalid. Symbol '&' not followed by single symbol.",
            ),
            (
                "((lambda {& a b} {1}) 5)",
                "Error: Function format invalid. Symbol '&' not followed by single symbol.",
            ),
        ];

        run_eval_tests(cases);

        // The rest parameter behaves as an ordinary list afterwards
        assert_eq!(
            run_session(&["(fun {first-of & xs} {head xs})", "(first-of 7 8 9)"]),
            "{7}"
        );
    }

    #[test]
    fn test_environment_operations() {
        let global = Environment::new();
        global.put("x", num(1.0));

        let inner = Environment::from_parts(HashMap::new(), Some(global.clone()));
        inner.put("y", num(2.0));

        // Lookup walks the parent chain and copies the binding
        assert_eq!(inner.get("x"), num(1.0));
        assert_eq!(inner.get("y"), num(2.0));
        assert_eq!(global.get("y"), Value::error("Unbound symbol 'y'"));

        // define walks to the root; put stays local
        inner.define("z", num(3.0));
        assert_eq!(global.get("z"), num(3.0));
        inner.put("w", num(4.0));
        assert_eq!(global.get("w"), Value::error("Unbound symbol 'w'"));

        // Local shadowing does not disturb the outer binding
        inner.put("x", num(9.0));
        assert_eq!(inner.get("x"), num(9.0));
        assert_eq!(global.get("x"), num(1.0));
    }

    #[test]
    fn test_exit_signal() {
        let env = create_global_env();
        let tree = parse("(exit 0)").unwrap();
        assert_eq!(eval(&env, read(&tree)), Err(Exit));

        // The signal escapes from nested positions as well
        let tree = parse("(+ 1 (exit 0))").unwrap();
        assert_eq!(eval(&env, read(&tree)), Err(Exit));
    }
}
