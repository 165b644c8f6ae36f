//! Property-based checks over arbitrary text and generated scripts.

use quickcheck::{QuickCheck, TestResult};
use test_utils::generator::Script;

use kamailio_language_server::diagnostics::DiagnosticAnalyzer;
use kamailio_language_server::lsp::document::DocumentStore;
use kamailio_language_server::lsp::features::{FormattingOptions, format_text};
use kamailio_language_server::parsers::ParserAdapter;
use kamailio_language_server::parsers::kamailio::LANGUAGE;
use kamailio_language_server::settings::{AnalysisSettings, ServerSettings};
use tower_lsp::lsp_types::Url;

#[test]
fn test_prop_parser_is_total() {
    fn prop(text: String) -> TestResult {
        let tree = ParserAdapter::kamailio().unwrap().parse(&text);
        let root = tree.root_node();
        assert_eq!(root.start_byte(), 0);
        assert_eq!(root.end_byte(), text.len());
        for node in root.preorder() {
            assert!(node.start_byte() <= node.end_byte(), "inverted node {:?}", node.kind());
            assert!(node.end_byte() <= text.len());
        }
        TestResult::passed()
    }
    QuickCheck::new().tests(300).quickcheck(prop as fn(String) -> TestResult);
}

#[test]
fn test_prop_analysis_is_idempotent() {
    fn prop(text: String) -> TestResult {
        let uri = Url::parse("file:///tmp/prop.cfg").unwrap();
        let mut store = DocumentStore::new(ServerSettings::default()).unwrap();
        store.open(&uri, 1, "");
        let first = store.change(&uri, 2, &text);
        let second = store.change(&uri, 3, &text);
        TestResult::from_bool(first == second)
    }
    QuickCheck::new().tests(200).quickcheck(prop as fn(String) -> TestResult);
}

#[test]
fn test_prop_generated_scripts_parse_cleanly() {
    fn prop(script: Script) -> TestResult {
        let code = script.to_code();
        let tree = ParserAdapter::kamailio().unwrap().parse(&code);
        assert!(!tree.has_error(), "errors in:\n{}\n{}", code, tree.root_node().to_sexp());

        let diagnostics =
            DiagnosticAnalyzer::new(&LANGUAGE).analyze(&tree, &AnalysisSettings::all());
        assert!(
            diagnostics.iter().all(|d| d.message != "Syntax error"),
            "syntax errors in:\n{}",
            code
        );
        TestResult::passed()
    }
    QuickCheck::new()
        .tests(100)
        .max_tests(1000)
        .quickcheck(prop as fn(Script) -> TestResult);
}

#[test]
fn test_prop_formatting_is_stable() {
    fn prop(script: Script) -> TestResult {
        let options = FormattingOptions::default();
        let Some(once) = format_text(&script.to_code(), options) else {
            return TestResult::failed();
        };
        TestResult::from_bool(format_text(&once, options).as_deref() == Some(once.as_str()))
    }
    QuickCheck::new().tests(100).quickcheck(prop as fn(Script) -> TestResult);
}
