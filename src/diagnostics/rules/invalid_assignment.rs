use crate::diagnostics::{Diagnostic, DiagnosticRule};
use crate::query::{Query, QueryMatch};
use crate::syntax::Node;
use crate::syntax::kinds::{EXPRESSION, FIELD_LEFT, FIELD_RIGHT, IDENTIFIER, PSEUDO_VARIABLE, PVAR_EXPRESSION};

const INVALID_ASSIGNMENT: &str = "Invalid assignment expression";
const INVALID_VALUE: &str = "Invalid value on the right side of expression";

/// Checks assignments inside route blocks. Global `key = value` lines at the
/// top level follow different rules and are not inspected.
pub struct InvalidAssignmentRule;

impl DiagnosticRule for InvalidAssignmentRule {
    fn name(&self) -> &'static str {
        "invalid-assignment"
    }

    fn pattern(&self) -> &'static str {
        "(compound_statement (statement (expression (assignment_expression))) @statement)"
    }

    fn diagnose(&self, query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic> {
        let Some(statement) = query.capture_index_for_name("statement") else {
            return Vec::new();
        };
        matches
            .iter()
            .filter_map(|m| m.node_for_capture(statement))
            .filter_map(check_statement)
            .collect()
    }
}

/// At most one diagnostic per statement; the first failed check wins.
fn check_statement(statement: Node<'_>) -> Option<Diagnostic> {
    let Some(assignment) = statement
        .significant_children()
        .next()
        .and_then(|expression| expression.significant_children().next())
    else {
        return Some(Diagnostic::error(statement.range(), INVALID_ASSIGNMENT));
    };

    let operands = assignment.significant_children().count();
    let left = assignment.child_by_field_name(FIELD_LEFT);
    let left_is_variable = left.is_some_and(|l| l.kind() == PSEUDO_VARIABLE || l.kind() == PVAR_EXPRESSION);
    if operands != 2 || !left_is_variable {
        return Some(Diagnostic::error(assignment.range(), INVALID_ASSIGNMENT));
    }

    let right = assignment.child_by_field_name(FIELD_RIGHT)?;
    if right.kind() != EXPRESSION {
        return Some(Diagnostic::error(right.range(), INVALID_VALUE));
    }
    let mut values = right.significant_children();
    match (values.next(), values.next()) {
        (Some(value), None) if value.kind() != IDENTIFIER => None,
        _ => Some(Diagnostic::error(right.range(), INVALID_VALUE)),
    }
}
