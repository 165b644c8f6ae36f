use crate::diagnostics::{Diagnostic, DiagnosticRule};
use crate::query::{Query, QueryMatch};
use crate::syntax::Node;
use crate::syntax::kinds::{
    ASSIGNMENT_EXPRESSION, BINARY_EXPRESSION, CALL_EXPRESSION, CORE_FUNCTION,
    PARENTHESIZED_EXPRESSION, RETURN_STATEMENT, UNARY_EXPRESSION,
};

/// Expression kinds that may stand alone as a statement.
const STATEMENT_EXPRESSIONS: &[&str] = &[
    CORE_FUNCTION,
    ASSIGNMENT_EXPRESSION,
    RETURN_STATEMENT,
    CALL_EXPRESSION,
    UNARY_EXPRESSION,
    BINARY_EXPRESSION,
    PARENTHESIZED_EXPRESSION,
];

/// Rejects statements made of a bare value such as `"text";` or `$ru;`.
pub struct InvalidSingleExpressionStatementRule;

impl DiagnosticRule for InvalidSingleExpressionStatementRule {
    fn name(&self) -> &'static str {
        "invalid-statement"
    }

    fn pattern(&self) -> &'static str {
        "(statement (expression) @expression) @statement"
    }

    fn diagnose(&self, query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic> {
        let (Some(statement), Some(expression)) = (
            query.capture_index_for_name("statement"),
            query.capture_index_for_name("expression"),
        ) else {
            return Vec::new();
        };
        matches
            .iter()
            .filter_map(|m| Some((m.node_for_capture(statement)?, m.node_for_capture(expression)?)))
            .filter(|(statement, expression)| is_invalid(*statement, *expression))
            .map(|(_, expression)| Diagnostic::error(expression.range(), "Invalid statement"))
            .collect()
    }
}

fn is_invalid(statement: Node<'_>, expression: Node<'_>) -> bool {
    if statement.significant_children().count() != 1
        || expression.next_significant_sibling().is_some()
    {
        return false;
    }
    let mut children = expression.significant_children();
    match (children.next(), children.next()) {
        (Some(value), None) => !STATEMENT_EXPRESSIONS.contains(&value.kind()),
        _ => false,
    }
}
