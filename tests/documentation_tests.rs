//! Loading module READMEs and cookbook files from disk.

use std::fs;
use std::path::Path;

use indoc::indoc;
use tempfile::TempDir;

use kamailio_language_server::docs::{Cookbook, DocumentationProvider, KnowledgeBase, ModuleDocs};

const TM_README: &str = indoc! {"
    TM Module

    1. Overview
    2. Functions

    2.1. t_relay([host, port])

       Relays a message statefully to the destination indicated in the
       current URI.

       Example 1.1. t_relay usage
    ...
    if (!t_relay()) {
        sl_reply_error();
    };
    ...

    2.2. t_on_failure(failure_route)

       Sets the failure route block.
"};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn source_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/modules/tm/README", TM_README);
    write(dir.path(), "src/modules/sl/README", "1. Functions\n1.1. sl_send_reply(code, reason)\n   Sends a stateless reply.\n");
    fs::create_dir_all(dir.path().join("src/modules/empty")).unwrap();
    dir
}

#[test]
fn test_loads_module_readmes() {
    let dir = source_tree();
    let docs = ModuleDocs::load(dir.path()).unwrap();

    let names: Vec<&str> = docs.modules().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["sl", "tm"]);

    let relay = docs.find_function("t_relay").unwrap();
    assert_eq!(relay.module, "tm");
    assert_eq!(relay.parameters, "[host, port]");
    assert!(relay.description.contains("Relays a message statefully"));
    assert_eq!(relay.example, "if (!t_relay()) {\n    sl_reply_error();\n};\n");
    assert!(docs.find_function("t_on_failure").is_some());
}

#[test]
fn test_missing_modules_directory() {
    let dir = TempDir::new().unwrap();
    assert!(ModuleDocs::load(dir.path()).is_err());

    let docs = KnowledgeBase::load(Some(dir.path()), None);
    assert!(docs.functions().is_empty());
    assert!(docs.find_function_doc("t_relay").is_none());
}

#[test]
fn test_knowledge_base_from_disk() {
    let dir = source_tree();
    let cookbook = dir.path().join("cookbook.json");
    fs::write(
        &cookbook,
        r#"{"docs":[{"name":"onreply_route","documentation":"Handles replies."}]}"#,
    )
    .unwrap();

    let docs = KnowledgeBase::load(Some(dir.path()), Some(&cookbook));
    let rendered = docs.find_function_doc("sl_send_reply").unwrap();
    assert!(rendered.starts_with("# Module: sl\n\n## Function:\n\tsl_send_reply"));
    assert_eq!(docs.find_free_text_doc("onreply_route").as_deref(), Some("Handles replies."));
    assert_eq!(docs.cookbook_entries(), vec![("onreply_route", "Handles replies.")]);
    assert_eq!(docs.modules().len(), 2);
}

#[test]
fn test_invalid_cookbook() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookbook.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(Cookbook::load(&path).is_err());

    let docs = KnowledgeBase::load(None, Some(&path));
    assert!(docs.cookbook_entries().is_empty());
    assert!(!docs.keywords().is_empty());
}
