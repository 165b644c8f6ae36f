//! Route blocks and the calls that jump to them

use crate::syntax::kinds::{
    ARGUMENT_LIST, CALL_EXPRESSION, FIELD_BODY, FIELD_FUNCTION, FIELD_NAME, FIELD_TYPE,
    ROUTE_DEFINITION,
};
use crate::syntax::{Node, Range, Tree};

/// A `route[NAME] { }`, `request_route { }`, ... block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// Route keyword, e.g. `failure_route`.
    pub route_type: String,
    pub name: Option<String>,
    /// Whole definition, body included.
    pub range: Range,
    /// The name, or the keyword for unnamed routes.
    pub selection_range: Range,
}

impl RouteDefinition {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}[{}]", self.route_type, name),
            None => self.route_type.clone(),
        }
    }
}

/// A call naming a route, such as `route(RELAY)` or `t_on_failure("MANAGE")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReference {
    pub route_types: &'static [&'static str],
    pub name: String,
    pub range: Range,
}

/// Route blocks of one document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteIndex {
    routes: Vec<RouteDefinition>,
}

impl RouteIndex {
    pub fn from_tree(tree: &Tree) -> Self {
        let routes = tree
            .root_node()
            .significant_children()
            .filter(|n| n.kind() == ROUTE_DEFINITION)
            .filter_map(route_definition)
            .collect();
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Definition a reference jumps to.
    pub fn resolve(&self, reference: &RouteReference) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| {
            reference.route_types.contains(&r.route_type.as_str())
                && r.name.as_deref() == Some(reference.name.as_str())
        })
    }
}

fn route_definition(node: Node<'_>) -> Option<RouteDefinition> {
    node.child_by_field_name(FIELD_BODY)?;
    let keyword = node.child_by_field_name(FIELD_TYPE)?;
    let name = node.child_by_field_name(FIELD_NAME);
    Some(RouteDefinition {
        route_type: keyword.text().to_string(),
        name: name.map(|n| n.text().trim().to_string()),
        range: node.range(),
        selection_range: name.unwrap_or(keyword).range(),
    })
}

/// Route types a call can jump to.
fn route_types_for_call(function: &str) -> Option<&'static [&'static str]> {
    Some(match function {
        "route" => &["route"],
        "t_on_failure" => &["failure_route"],
        "t_on_branch" => &["branch_route"],
        "t_on_branch_failure" => &["branch_failure_route"],
        "t_on_reply" => &["onreply_route", "reply_route"],
        _ => return None,
    })
}

/// Route reference under `node`, if `node` lies in the first argument of a
/// route-jumping call.
pub fn route_reference(node: Node<'_>) -> Option<RouteReference> {
    let mut argument = node;
    let mut arguments = node.parent()?;
    while arguments.kind() != ARGUMENT_LIST {
        argument = arguments;
        arguments = arguments.parent()?;
    }
    if arguments.significant_children().next() != Some(argument) {
        return None;
    }

    let call = arguments.parent().filter(|c| c.kind() == CALL_EXPRESSION)?;
    let function = call
        .child_by_field_name(FIELD_FUNCTION)?
        .significant_children()
        .next()?;
    let route_types = route_types_for_call(function.text())?;
    let name = argument.text().trim_matches(|c| c == '"' || c == '\'');
    if name.is_empty() {
        return None;
    }
    Some(RouteReference {
        route_types,
        name: name.to_string(),
        range: argument.range(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    use crate::parsers::ParserAdapter;
    use crate::syntax::Point;

    const SCRIPT: &str = indoc! {r#"
        request_route {
            route(REQINIT);
            t_on_failure("MANAGE_FAILURE");
            t_on_reply("MANAGE_REPLY");
        }
        route[REQINIT] {
            xlog("init");
        }
        failure_route[MANAGE_FAILURE] {
            drop;
        }
        onreply_route[MANAGE_REPLY] {
            exit;
        }
    "#};

    fn reference_at(tree: &Tree, row: usize, column: usize) -> Option<RouteReference> {
        let point = Point::new(row, column);
        let node = tree.root_node().named_descendant_for_point_range(point, point)?;
        route_reference(node)
    }

    #[test]
    fn test_collects_routes() {
        let tree = ParserAdapter::kamailio().unwrap().parse(SCRIPT);
        let index = RouteIndex::from_tree(&tree);
        let labels: Vec<String> = index.routes().iter().map(|r| r.label()).collect();
        assert_eq!(
            labels,
            vec![
                "request_route",
                "route[REQINIT]",
                "failure_route[MANAGE_FAILURE]",
                "onreply_route[MANAGE_REPLY]"
            ]
        );
        assert_eq!(index.routes()[1].selection_range.start_point, Point::new(5, 6));
    }

    #[test]
    fn test_resolves_references() {
        let tree = ParserAdapter::kamailio().unwrap().parse(SCRIPT);
        let index = RouteIndex::from_tree(&tree);

        let reference = reference_at(&tree, 1, 12).unwrap();
        assert_eq!(reference.name, "REQINIT");
        assert_eq!(index.resolve(&reference).unwrap().label(), "route[REQINIT]");

        let reference = reference_at(&tree, 2, 20).unwrap();
        assert_eq!(reference.name, "MANAGE_FAILURE");
        assert_eq!(
            index.resolve(&reference).unwrap().label(),
            "failure_route[MANAGE_FAILURE]"
        );

        let reference = reference_at(&tree, 3, 18).unwrap();
        assert_eq!(index.resolve(&reference).unwrap().route_type, "onreply_route");
    }

    #[test]
    fn test_other_calls_are_not_references() {
        let tree = ParserAdapter::kamailio().unwrap().parse(SCRIPT);
        assert!(reference_at(&tree, 6, 10).is_none());
        assert!(reference_at(&tree, 1, 6).is_none());
    }
}
