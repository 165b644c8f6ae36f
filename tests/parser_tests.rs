//! Tree shapes produced for common script constructs.

use indoc::indoc;

use kamailio_language_server::parsers::ParserAdapter;
use kamailio_language_server::syntax::{Node, Tree};

fn parse(text: &str) -> Tree {
    ParserAdapter::kamailio().expect("grammar loads").parse(text)
}

fn kinds(node: Node<'_>) -> Vec<&'static str> {
    node.significant_children().map(|c| c.kind()).collect()
}

#[test]
fn test_top_level_items() {
    let tree = parse(indoc! {r#"
        debug=3
        loadmodule "tm.so"
        modparam("tm", "fr_timer", 30000)
        request_route {
        }
    "#});
    assert!(!tree.has_error());
    assert_eq!(
        kinds(tree.root_node()),
        vec![
            "top_level_assignment_expression",
            "loadmodule_statement",
            "modparam_statement",
            "route_definition",
        ]
    );
}

#[test]
fn test_route_definition_fields() {
    let tree = parse("failure_route[MANAGE_FAILURE] {\n    drop;\n}\n");
    let route = tree.root_node().significant_children().next().unwrap();
    assert_eq!(route.child_by_field_name("type").unwrap().text(), "failure_route");
    assert_eq!(route.child_by_field_name("name").unwrap().text(), "MANAGE_FAILURE");
    assert_eq!(route.child_by_field_name("body").unwrap().kind(), "compound_statement");
}

#[test]
fn test_assignment_to_pseudo_variable() {
    let tree = parse("request_route {\n    $var(count) = $var(count) + 1;\n}\n");
    assert!(!tree.has_error());
    let assignment = tree
        .root_node()
        .preorder()
        .find(|n| n.kind() == "assignment_expression")
        .unwrap();
    let left = assignment.child_by_field_name("left").unwrap();
    assert_eq!(left.kind(), "pseudo_variable");
    assert_eq!(left.text(), "$var(count)");
    let right = assignment.child_by_field_name("right").unwrap();
    assert_eq!(right.text(), "$var(count) + 1");
    let name = tree
        .root_node()
        .preorder()
        .find(|n| n.kind() == "variable_name")
        .unwrap();
    assert_eq!(name.parent().unwrap().kind(), "script_var");
}

#[test]
fn test_call_shape() {
    let tree = parse("request_route {\n    sl_send_reply(\"404\", \"Not Found\");\n}\n");
    let call = tree
        .root_node()
        .preorder()
        .find(|n| n.kind() == "call_expression")
        .unwrap();
    assert_eq!(call.child_by_field_name("function").unwrap().text(), "sl_send_reply");
    let arguments = call.child_by_field_name("arguments").unwrap();
    assert_eq!(arguments.kind(), "argument_list");
    assert_eq!(arguments.named_child_count(), 2);
}

#[test]
fn test_control_flow() {
    let tree = parse(indoc! {r#"
        request_route {
            if ($rU == "100") {
                exit;
            } else {
                while ($var(i) < 3) {
                    $var(i) = $var(i) + 1;
                }
            }
            switch ($rm) {
                case "INVITE":
                    break;
                default:
                    return 1;
            }
        }
    "#});
    assert!(!tree.has_error(), "{}", tree.root_node().to_sexp());
    let found: Vec<&str> = tree
        .root_node()
        .preorder()
        .map(|n| n.kind())
        .filter(|k| k.ends_with("_statement") && *k != "compound_statement")
        .collect();
    for kind in [
        "if_statement",
        "while_statement",
        "switch_statement",
        "case_statement",
        "return_statement",
    ] {
        assert!(found.contains(&kind), "missing {} in {:?}", kind, found);
    }
}

#[test]
fn test_errors_are_contained() {
    let tree = parse("request_route {\n    xlog(\"a\";\n    drop;\n}\nroute[B] {\n}\n");
    assert!(tree.has_error());
    let routes: Vec<Node<'_>> = tree
        .root_node()
        .significant_children()
        .filter(|n| n.kind() == "route_definition")
        .collect();
    assert_eq!(routes.len(), 2);
}

#[test]
fn test_braces_in_strings_and_comments() {
    let tree = parse("request_route {\n    /* } */\n    xlog(\"}\");\n}\n");
    assert!(!tree.has_error());
    assert_eq!(kinds(tree.root_node()), vec!["route_definition"]);
}

#[test]
fn test_reparse_reuses_identical_text() {
    let adapter = ParserAdapter::kamailio().unwrap();
    let first = adapter.parse("request_route {\n}\n");
    let same = adapter.reparse("request_route {\n}\n", &first);
    assert!(same.ptr_eq(&first));
    let other = adapter.reparse("request_route {\n  drop;\n}\n", &first);
    assert!(!other.ptr_eq(&first));
}

#[test]
fn test_nesting_past_the_limit_stays_on_its_line() {
    let text = format!("request_route {{\n    $var(x) = {}1{};\n    drop;\n}}\n", "(".repeat(500), ")".repeat(500));
    let tree = parse(&text);
    let errors: Vec<_> = tree.root_node().preorder().filter(|n| n.is_error()).collect();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.start_position().row == 1 && e.end_position().row == 1));
    let depth = |node: Node<'_>| std::iter::successors(Some(node), |n| n.parent()).count();
    assert!(tree.root_node().preorder().map(depth).max().unwrap() < 500);

    // The statement after the over-nested one still parses.
    let drop = tree
        .root_node()
        .preorder()
        .find(|n| n.kind() == "core_function")
        .unwrap();
    assert_eq!(drop.text(), "drop");
}

#[test]
fn test_markup_is_scanned_as_raw_text() {
    let tree = parse("<doc note='it's \"odd\"'>\n  <b>don't</b>\n</doc>\nrequest_route {\n}\n");
    assert!(!tree.has_error(), "{}", tree.root_node().to_sexp());
    let xml = tree.root_node().significant_children().next().unwrap();
    assert_eq!(xml.kind(), "xml");
    assert_eq!(kinds(xml), vec!["xml_tag", "xml_tag", "xml_text", "xml_tag", "xml_tag"]);
    assert!(xml.text().ends_with("</doc>"));
    assert_eq!(kinds(tree.root_node()), vec!["xml", "route_definition"]);
}
