//! Tokenizing and parsing of raw source text into the generic tagged parse
//! tree consumed by the reader. This module is a front-end collaborator: the
//! core never depends on it, only on the [`Node`] shape it produces, so an
//! embedder with its own parser can hand the reader equivalent trees.
//!
//! Grammar:
//!
//! ```text
//! number : -?[0-9]+(.[0-9]*)?
//! symbol : [a-zA-Z0-9_+\-*/%\\=<>!&]+
//! sexpr  : '(' expr* ')'
//! qexpr  : '{' expr* '}'
//! expr   : number | sexpr | qexpr | symbol
//! root   : expr*
//! ```
//!
//! Group delimiters are retained in the tree as punctuation nodes; the
//! reader skips them.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded, terminated},
};

use crate::{MAX_PARSE_DEPTH, ParseError};

/// Non-alphanumeric characters allowed in symbol names
const SYMBOL_SPECIAL_CHARS: &str = "_+-*/%\\=<>!&";

/// Node classification in the parse tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Numeric literal
    Number,
    /// Identifier
    Symbol,
    /// Parenthesized group
    Paren,
    /// Brace group
    Brace,
    /// Document root holding zero or more expressions
    Root,
    /// Delimiter token; carried in the tree but skipped by the reader
    Punct,
}

/// A node in the generic tagged parse tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: Tag,
    /// Raw source text for leaves; empty for groups
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(tag: Tag, text: &str) -> Node {
        Node {
            tag,
            text: text.to_owned(),
            children: Vec::new(),
        }
    }

    fn group(tag: Tag, children: Vec<Node>) -> Node {
        Node {
            tag,
            text: String::new(),
            children,
        }
    }
}

/// Parse a numeric literal: an optional minus, digits, optional fraction
fn parse_number(input: &str) -> IResult<&str, Node> {
    let (rest, text) = recognize(pair(
        opt(char('-')),
        pair(digit1, opt(pair(char('.'), digit0))),
    ))
    .parse(input)?;
    Ok((rest, Node::leaf(Tag::Number, text)))
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> IResult<&str, Node> {
    let (rest, text) = take_while1(|c: char| {
        c.is_ascii_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
    })
    .parse(input)?;
    Ok((rest, Node::leaf(Tag::Symbol, text)))
}

/// Parse a delimited group, keeping the delimiters as punctuation children
fn parse_group(
    input: &str,
    open: char,
    close: char,
    tag: Tag,
    depth: usize,
) -> IResult<&str, Node> {
    let (input, _) = char(open).parse(input)?;
    let (input, exprs) = many0(|i| parse_expr(i, depth + 1)).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char(close).parse(input)?;

    let mut children = Vec::with_capacity(exprs.len() + 2);
    children.push(Node::leaf(Tag::Punct, &open.to_string()));
    children.extend(exprs);
    children.push(Node::leaf(Tag::Punct, &close.to_string()));
    Ok((input, Node::group(tag, children)))
}

/// Parse a single expression, tracking nesting depth
fn parse_expr(input: &str, depth: usize) -> IResult<&str, Node> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    preceded(
        multispace0,
        alt((
            parse_number,
            |i| parse_group(i, '(', ')', Tag::Paren, depth),
            |i| parse_group(i, '{', '}', Tag::Brace, depth),
            parse_symbol,
        )),
    )
    .parse(input)
}

/// Convert nom parsing errors to user-facing messages
fn error_from_nom(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => ParseError::with_context(
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    input,
                    position,
                ),
                _ => ParseError::with_context("Invalid syntax", input, position),
            }
        }
        nom::Err::Incomplete(_) => ParseError::from_message("Incomplete input"),
    }
}

/// Parse a complete document: zero or more expressions under a root node.
///
/// This is the front-end entry point; a line holding several expressions
/// becomes a root with several children, and an empty line an empty root.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    match terminated(many0(|i| parse_expr(i, 0)), multispace0).parse(source) {
        Ok(("", exprs)) => Ok(Node::group(Tag::Root, exprs)),
        Ok((remaining, _)) => Err(ParseError::with_context(
            "Invalid syntax",
            source,
            source.len().saturating_sub(remaining.len()),
        )),
        Err(error) => Err(error_from_nom(source, error)),
    }
}

/// Parse exactly one expression, rejecting trailing content
pub fn parse_expression(source: &str) -> Result<Node, ParseError> {
    match terminated(|i| parse_expr(i, 0), multispace0).parse(source) {
        Ok(("", node)) => Ok(node),
        Ok((remaining, _)) => Err(ParseError::with_context(
            "Unexpected remaining input",
            source,
            source.len().saturating_sub(remaining.len()),
        )),
        Err(error) => Err(error_from_nom(source, error)),
    }
}
