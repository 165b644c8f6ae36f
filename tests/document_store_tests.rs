//! Document lifecycle and position queries through the public store API.

use std::sync::Arc;

use indoc::indoc;
use tower_lsp::lsp_types::Url;

use kamailio_language_server::docs::{Cookbook, KnowledgeBase, ModuleDocs, modules::parse_readme};
use kamailio_language_server::lsp::document::DocumentStore;
use kamailio_language_server::lsp::features::{CompletionKind, FormattingOptions, NOT_FOUND};
use kamailio_language_server::settings::ServerSettings;
use kamailio_language_server::syntax::Point;

const SCRIPT: &str = indoc! {r#"
    $avp(foo) = "bar";
    request_route {
        route(RELAY);
        xlog("L_INFO", "via $si\n");
    }
    route[RELAY] {
        t_relay();
        exit;
        drop;
    }
"#};

fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///etc/kamailio/{}", name)).unwrap()
}

fn store() -> DocumentStore {
    DocumentStore::new(ServerSettings::default()).expect("store builds")
}

fn documented_store() -> DocumentStore {
    let mut modules = ModuleDocs::default();
    modules.insert(parse_readme(
        "xlog",
        "3. Functions\n3.1. xlog([level,] format)\n   Prints a formatted message.\n",
    ));
    let cookbook =
        Cookbook::from_json(r#"{"docs":[{"name":"request_route","documentation":"Main SIP request route."}]}"#)
            .unwrap();
    let mut store = store();
    store.set_documentation(Arc::new(KnowledgeBase::new(modules, cookbook)));
    store
}

#[test]
fn test_hover_on_assigned_avp() {
    let mut store = store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, SCRIPT);

    let docs = store.hover_docs(&uri, Point::new(0, 6));
    assert!(docs.contains("foo"), "{}", docs);
    assert!(docs.contains("bar"), "{}", docs);

    let (_, range) = store.hover(&uri, Point::new(0, 6)).unwrap();
    assert_eq!(range.start_point.row, 0);
}

#[test]
fn test_hover_on_documented_function_and_keyword() {
    let mut store = documented_store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, SCRIPT);

    let function = store.hover_docs(&uri, Point::new(3, 6));
    assert!(function.starts_with("# Module: xlog"), "{}", function);
    assert!(function.contains("Prints a formatted message."));

    assert_eq!(store.hover_docs(&uri, Point::new(1, 3)), "Main SIP request route.");
    assert_eq!(store.hover_docs(&uri, Point::new(6, 6)), NOT_FOUND);
    let unopened = Url::parse("file:///etc/kamailio/other.cfg").unwrap();
    assert_eq!(store.hover_docs(&unopened, Point::new(0, 0)), NOT_FOUND);
}

#[test]
fn test_repeated_change_is_idempotent() {
    let mut store = store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, "request_route {\n}\n");

    let first = store.change(&uri, 2, SCRIPT);
    let second = store.change(&uri, 3, SCRIPT);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].message, "Unreachable code");
    assert_eq!(store.get(&uri).unwrap().version, 3);
}

#[test]
fn test_completion_includes_document_variables() {
    let mut store = documented_store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, SCRIPT);

    let items = store.list_completions(&uri);
    assert_eq!(items[0].label, "xlog()");
    assert_eq!(items[0].kind, CompletionKind::Function);
    let avp = items.iter().find(|i| i.label == "$avp(foo)").unwrap();
    assert_eq!(avp.kind, CompletionKind::Variable);
    assert!(avp.documentation.contains("bar"));
    assert!(items.iter().any(|i| i.kind == CompletionKind::Module && i.label == "xlog"));
    assert_eq!(items.last().unwrap().label, "request_route");
}

#[test]
fn test_route_navigation_and_symbols() {
    let mut store = store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, SCRIPT);

    let target = store.definition(&uri, Point::new(2, 11)).unwrap();
    assert_eq!(target.name.as_deref(), Some("RELAY"));
    assert_eq!(target.selection_range.start_point, Point::new(5, 6));

    let labels: Vec<String> = store
        .document_symbols(&uri)
        .unwrap()
        .iter()
        .map(|r| r.label())
        .collect();
    assert_eq!(labels, vec!["request_route", "route[RELAY]"]);
}

#[test]
fn test_disabled_diagnostics_and_close() {
    let settings = ServerSettings {
        diagnostics_enabled: false,
        ..ServerSettings::default()
    };
    let mut store = DocumentStore::new(settings).unwrap();
    let uri = uri("kamailio.cfg");
    assert!(store.open(&uri, 1, SCRIPT).is_empty());
    assert!(!store.get(&uri).unwrap().diagnostics.is_empty());

    assert!(store.close(&uri));
    assert!(store.get(&uri).is_none());
    assert!(!store.close(&uri));
}

#[test]
fn test_formatting_round() {
    let mut store = store();
    let uri = uri("kamailio.cfg");
    store.open(&uri, 1, "route[A]{\nexit;\n}\n");

    let formatted = store.format(&uri, FormattingOptions::default()).unwrap();
    assert_eq!(formatted, "route[A] {\n\texit;\n}\n");

    store.change(&uri, 2, &formatted);
    assert_eq!(store.format(&uri, FormattingOptions::default()), None);
}

#[test]
fn test_deeply_nested_documents_open_on_a_small_stack() {
    let documents = [
        format!("request_route {}\n", "{".repeat(20000)),
        format!("request_route {{\n    $var(x) = {}1;\n}}\n", "(".repeat(20000)),
        format!("request_route {{\n    if ({}1) {{ drop; }}\n}}\n", "!".repeat(20000)),
        format!("xlog({}1);\n", "f(".repeat(20000)),
    ];
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let mut store = store();
            documents
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let uri = uri(&format!("nested{}.cfg", i));
                    store.open(&uri, 1, text);
                    store.get(&uri).unwrap().tree.has_error()
                })
                .collect::<Vec<_>>()
        })
        .unwrap();
    let results = worker.join().expect("parsing finishes without overflowing the stack");
    assert_eq!(results, vec![true; 4]);
}
