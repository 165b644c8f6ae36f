//! Conversions from analysis results to LSP types

use ropey::Rope;
use tower_lsp::lsp_types::{
    self, CompletionItemKind, DiagnosticSeverity, Documentation, MarkupContent, MarkupKind,
    Position as LspPosition, Range as LspRange,
};

use crate::diagnostics::{Diagnostic, Severity};
use crate::lsp::features::{CompletionItem, CompletionKind};
use crate::lsp::position::{point_to_position, range_to_lsp};
use crate::syntax::Point;

pub(super) const DIAGNOSTIC_SOURCE: &str = "kamailio";

pub(super) fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

pub(super) fn to_lsp_diagnostics(text: &Rope, diagnostics: &[Diagnostic]) -> Vec<lsp_types::Diagnostic> {
    diagnostics
        .iter()
        .map(|d| lsp_types::Diagnostic {
            range: range_to_lsp(text, &d.range),
            severity: Some(to_lsp_severity(d.severity)),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: d.message.clone(),
            ..Default::default()
        })
        .collect()
}

pub(super) fn to_lsp_completion(item: CompletionItem) -> lsp_types::CompletionItem {
    let kind = match item.kind {
        CompletionKind::Function => CompletionItemKind::FUNCTION,
        CompletionKind::Keyword => CompletionItemKind::KEYWORD,
        CompletionKind::Variable => CompletionItemKind::VARIABLE,
        CompletionKind::Module => CompletionItemKind::MODULE,
        CompletionKind::Text => CompletionItemKind::TEXT,
    };
    lsp_types::CompletionItem {
        label: item.label,
        kind: Some(kind),
        detail: Some(item.detail),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: item.documentation,
        })),
        ..Default::default()
    }
}

/// Range covering all of `text`.
pub(super) fn whole_document(text: &Rope) -> LspRange {
    LspRange::new(
        LspPosition::new(0, 0),
        point_to_position(text, Point::new(usize::MAX, 0)),
    )
}
