//! qlisp - a small, embeddable expression language with Q-expressions.
//!
//! The crate is a core that operates on already-parsed token trees, plus two
//! front-end collaborators:
//!
//! - `syntax`: tokenizes raw source text into a generic tagged parse tree
//! - `reader`: converts that tree into [`ast::Value`] trees
//! - `evaluator`: reduces values, resolving symbols against chained
//!   environments and applying builtins and user-defined closures
//! - `builtinops`: the fixed registry of primitive operations
//!
//! ```text
//! source text --syntax--> Node tree --reader--> Value --evaluator--> Value
//! ```
//!
//! Expressions come in two list flavors. S-expressions `(...)` evaluate with
//! their first element as the operator; Q-expressions `{...}` are inert data
//! until passed through the `eval` builtin, and double as the formal-parameter
//! and body lists of user-defined functions:
//!
//! ```text
//! qlisp> (+ 1 2 3)
//! 6
//! qlisp> (head {x y z})
//! {x}
//! qlisp> ((lambda {a b} {+ a b}) 3)
//! function ({b} -> {+ a b})
//! ```
//!
//! Functions may be applied to fewer arguments than they have formals, which
//! yields a partially-applied function value, and a `&` marker in the formal
//! list collects any remaining call arguments into a single list parameter.
//!
//! Evaluation failures are ordinary [`ast::Value::Error`] values that
//! propagate through enclosing expressions. Session termination is not an
//! error: the `exit` builtin raises the typed [`Exit`] signal instead.

use std::fmt;

/// Maximum nesting depth accepted by the parser.
///
/// This bounds stack use while parsing hostile input. Evaluation depth is
/// deliberately not limited: unbounded user recursion exhausts the native
/// call stack.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Session-termination signal raised by the `exit` builtin.
///
/// Termination travels in the `Err` arm of [`evaluator::eval`] rather than as
/// a reserved error message, so front ends match on a type instead of a
/// sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit;

/// A structured parsing failure from the `syntax` collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Snippet of the input around the failure position, if identifiable
    pub context: Option<String>,
}

impl ParseError {
    /// Create a ParseError with a message but no input context
    pub fn from_message(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            context: None,
        }
    }

    /// Create a ParseError with a context snippet extracted from the input
    /// around the given offset
    pub fn with_context(message: impl Into<String>, input: &str, offset: usize) -> Self {
        const MAX_CONTEXT: usize = 40;

        let start = offset.saturating_sub(10);
        let snippet: String = input.chars().skip(start).take(MAX_CONTEXT).collect();
        let snippet = snippet.replace('\n', "\\n");

        ParseError {
            message: message.into(),
            context: (!snippet.is_empty()).then_some(snippet),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, " near '{context}'")?;
        }
        Ok(())
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod reader;
pub mod syntax;
