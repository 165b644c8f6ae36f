use crate::diagnostics::{Diagnostic, DiagnosticRule};
use crate::query::{Query, QueryMatch};
use crate::settings::AnalysisSettings;
use crate::syntax::Range;

/// Reports parser error nodes.
///
/// Errors inside inline markup are dropped: the lexer cannot tokenize markup
/// text, so such errors say nothing about the script itself.
pub struct SyntaxErrorRule;

impl DiagnosticRule for SyntaxErrorRule {
    fn name(&self) -> &'static str {
        "syntax-error"
    }

    fn pattern(&self) -> &'static str {
        "(ERROR) @error (xml) @xml"
    }

    fn enabled(&self, settings: &AnalysisSettings) -> bool {
        settings.syntax_errors_enabled
    }

    fn diagnose(&self, query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic> {
        let (Some(error), Some(xml)) = (
            query.capture_index_for_name("error"),
            query.capture_index_for_name("xml"),
        ) else {
            return Vec::new();
        };

        let markup: Vec<Range> = matches
            .iter()
            .flat_map(|m| m.nodes_for_capture(xml))
            .map(|n| n.range())
            .collect();

        matches
            .iter()
            .flat_map(|m| m.nodes_for_capture(error))
            .map(|n| n.range())
            .filter(|range| !markup.iter().any(|xml| xml.contains(range)))
            .map(|range| Diagnostic::error(range, "Syntax error"))
            .collect()
    }
}
