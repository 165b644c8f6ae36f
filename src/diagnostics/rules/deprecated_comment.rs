use crate::diagnostics::{Diagnostic, DiagnosticRule};
use crate::query::{Query, QueryMatch};
use crate::settings::AnalysisSettings;

/// Suggests block comments over `#` line comments.
pub struct DeprecatedCommentRule;

impl DiagnosticRule for DeprecatedCommentRule {
    fn name(&self) -> &'static str {
        "deprecated-comment"
    }

    fn pattern(&self) -> &'static str {
        "(deprecated_comment) @deprecated"
    }

    fn enabled(&self, settings: &AnalysisSettings) -> bool {
        settings.deprecated_comment_hints_enabled
    }

    fn diagnose(&self, _query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic> {
        matches
            .iter()
            .flat_map(|m| m.captures.iter())
            .map(|c| Diagnostic::hint(c.range(), "use /* comment */"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::diagnostics::rules::test_support::run_rule;

    #[test]
    fn test_hints_on_hash_comments_only() {
        let diagnostics = run_rule(
            DeprecatedCommentRule,
            "#!define WITH_NAT\n# old style\n/* new style */\n// also fine\nrequest_route { drop; # trailing\n}\n",
        );
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Hint));
        assert_eq!(diagnostics[0].range.start_point.row, 1);
        assert_eq!(diagnostics[1].range.start_point.row, 4);
    }
}
