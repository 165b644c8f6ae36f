use crate::diagnostics::{Diagnostic, DiagnosticRule};
use crate::query::{Query, QueryMatch};
use crate::syntax::kinds::{BLOCK_END, CASE_STATEMENT, COMPOUND_STATEMENT, SOURCE_FILE, STATEMENT};
use crate::syntax::{Node, Range};

/// Flags statements that follow `drop`, `exit`, `break` or `return` in the
/// same block.
///
/// A following `case`/`default` label starts a reachable path and silences
/// the rule.
pub struct UnreachableCodeRule;

impl DiagnosticRule for UnreachableCodeRule {
    fn name(&self) -> &'static str {
        "unreachable-code"
    }

    fn pattern(&self) -> &'static str {
        "(statement [(core_function) (return_statement)] @terminal) @statement"
    }

    fn diagnose(&self, query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic> {
        let Some(statement) = query.capture_index_for_name("statement") else {
            return Vec::new();
        };
        matches
            .iter()
            .filter_map(|m| m.node_for_capture(statement))
            .filter_map(unreachable_range)
            .map(|range| Diagnostic::warning(range, "Unreachable code"))
            .collect()
    }
}

/// Range of the code made unreachable by the terminal `statement`.
fn unreachable_range(statement: Node<'_>) -> Option<Range> {
    if statement.significant_children().count() != 1 {
        return None;
    }
    let parent = statement.parent()?;
    if parent.kind() != COMPOUND_STATEMENT && parent.kind() != SOURCE_FILE {
        return None;
    }

    let next = statement.next_significant_sibling()?;
    if next.kind() != STATEMENT {
        return None;
    }
    if next
        .significant_children()
        .next()
        .is_some_and(|c| c.kind() == CASE_STATEMENT)
    {
        return None;
    }

    let mut last = parent.significant_children().next_back()?;
    if last.kind() == BLOCK_END {
        last = last.prev_significant_sibling()?;
    }
    Some(Range::spanning(next.range(), last.range()))
}
