//! Built-in diagnostic rules

mod deprecated_comment;
mod invalid_assignment;
mod invalid_statement;
mod syntax_error;
mod unreachable_code;

pub use deprecated_comment::DeprecatedCommentRule;
pub use invalid_assignment::InvalidAssignmentRule;
pub use invalid_statement::InvalidSingleExpressionStatementRule;
pub use syntax_error::SyntaxErrorRule;
pub use unreachable_code::UnreachableCodeRule;

use super::DiagnosticRule;

/// The rule set run on every document.
pub fn default_rules() -> Vec<Box<dyn DiagnosticRule>> {
    vec![
        Box::new(SyntaxErrorRule),
        Box::new(DeprecatedCommentRule),
        Box::new(UnreachableCodeRule),
        Box::new(InvalidSingleExpressionStatementRule),
        Box::new(InvalidAssignmentRule),
    ]
}
