//! Conversion from the generic tagged parse tree produced by the `syntax`
//! collaborator into [`Value`] trees ready for evaluation. This is the only
//! place the core touches the parse-tree shape; everything downstream works
//! on values.

use crate::ast::Value;
use crate::syntax::{Node, Tag};

/// Convert a parse-tree node into a value.
///
/// Number text that fails to parse as a finite double becomes an error
/// value. Delimiter tokens inside groups are skipped, never appended.
pub fn read(node: &Node) -> Value {
    match node.tag {
        Tag::Number => read_number(node),
        Tag::Symbol => Value::Symbol(node.text.clone()),
        Tag::Root | Tag::Paren => Value::SExpr(read_children(node)),
        Tag::Brace => Value::QExpr(read_children(node)),
        Tag::Punct => Value::error(format!("Unexpected token '{}'", node.text)),
    }
}

fn read_children(node: &Node) -> Vec<Value> {
    node.children
        .iter()
        .filter(|child| !matches!(child.tag, Tag::Punct))
        .map(read)
        .collect()
}

fn read_number(node: &Node) -> Value {
    match node.text.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::error(format!("Invalid number: {}", node.text)),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{num, qexpr, sexpr, sym};
    use crate::syntax::{parse, parse_expression};

    /// Run (source, expected rendering) round-trip cases through
    /// parse_expression + read + Display
    fn run_read_tests(cases: Vec<(&str, &str)>) {
        for (i, (source, expected)) in cases.iter().enumerate() {
            let tree = parse_expression(source).unwrap();
            let value = read(&tree);
            assert_eq!(
                format!("{value}"),
                *expected,
                "Read test #{} failed for '{source}'",
                i + 1
            );
        }
    }

    #[test]
    fn test_read_round_trip() {
        let cases = vec![
            // Reading does not evaluate: the printed form matches the input
            ("(+ 1 2)", "(+ 1 2)"),
            ("{1 2 3}", "{1 2 3}"),
            ("(head {x y z})", "(head {x y z})"),
            ("({nested} (deeply {so}))", "({nested} (deeply {so}))"),
            ("hello", "hello"),
            ("-5", "-5"),
            ("3.25", "3.25"),
            ("()", "()"),
            ("{}", "{}"),
            // Trailing-dot literals normalize to their numeric value
            ("12.", "12"),
        ];

        run_read_tests(cases);
    }

    #[test]
    fn test_read_document_root() {
        // The document root reads as an S-expression of its expressions
        let tree = parse("+ 1 2").unwrap();
        assert_eq!(
            read(&tree),
            sexpr(vec![sym("+"), num(1.0), num(2.0)])
        );

        let tree = parse("").unwrap();
        assert_eq!(read(&tree), sexpr(vec![]));

        // A parenthesized line nests one level below the root
        let tree = parse("(+ 1 2)").unwrap();
        assert_eq!(
            read(&tree),
            sexpr(vec![sexpr(vec![sym("+"), num(1.0), num(2.0)])])
        );
    }

    #[test]
    fn test_read_structures() {
        let tree = parse_expression("{x (y) 4}").unwrap();
        assert_eq!(
            read(&tree),
            qexpr(vec![sym("x"), sexpr(vec![sym("y")]), num(4.0)])
        );
    }

    #[test]
    fn test_read_invalid_number() {
        // The grammar only admits digit runs, so non-finite parses are
        // reachable only through hand-built nodes
        let node = Node {
            tag: Tag::Number,
            text: "1".repeat(400),
            children: vec![],
        };
        assert_eq!(
            read(&node),
            Value::error(format!("Invalid number: {}", "1".repeat(400)))
        );
    }
}
