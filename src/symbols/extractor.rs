use tracing::{trace, warn};

use super::{Scope, SymbolTables, Variable};
use crate::query::Query;
use crate::syntax::kinds::{FIELD_LEFT, FIELD_NAME, FIELD_RIGHT, IDENTIFIER, PSEUDO_CONTENT, PSEUDO_VARIABLE};
use crate::syntax::{Language, Node, Tree};

const ASSIGNMENT_QUERY: &str = "(assignment_expression) @assignment";

/// Collects user-defined variables from assignments.
///
/// Extraction is best effort: assignments whose target is not one of the
/// three variable classes, or whose shape is incomplete, are skipped.
#[derive(Debug, Clone)]
pub struct VariableExtractor {
    query: Option<Query>,
}

impl VariableExtractor {
    pub fn new(language: &Language) -> Self {
        let query = match Query::new(language, ASSIGNMENT_QUERY) {
            Ok(query) => Some(query),
            Err(err) => {
                warn!("Variable extraction disabled: {}", err);
                None
            }
        };
        Self { query }
    }

    pub fn extract(&self, tree: &Tree) -> SymbolTables {
        let mut tables = SymbolTables::new();
        let Some(query) = &self.query else {
            return tables;
        };
        for capture in query.captures(tree.root_node()) {
            if let Some(variable) = variable_from_assignment(capture.node) {
                trace!("Found {} = {}", variable.name, variable.value);
                tables.insert(variable);
            }
        }
        tables
    }
}

fn variable_from_assignment(assignment: Node<'_>) -> Option<Variable> {
    let target = assignment.child_by_field_name(FIELD_LEFT)?;
    if target.kind() != PSEUDO_VARIABLE {
        return None;
    }
    let content = target
        .significant_children()
        .find(|c| c.kind() == PSEUDO_CONTENT)?;
    let marker = content.significant_children().next()?;
    let scope = Scope::for_kind(marker.kind())?;
    let identifier = variable_identifier(marker)?;
    let value = assignment.child_by_field_name(FIELD_RIGHT)?;

    Some(Variable {
        name: scope.qualified_name(identifier),
        identifier: identifier.to_string(),
        value: value.text().to_string(),
        scope,
        range: assignment.range(),
    })
}

/// Identifier inside `avp(...)`; for prefixed names such as `s:caller`
/// this is the part after the prefix.
pub(crate) fn variable_identifier<'tree>(marker: Node<'tree>) -> Option<&'tree str> {
    marker
        .child_by_field_name(FIELD_NAME)?
        .named_children()
        .filter(|c| c.kind() == IDENTIFIER)
        .last()
        .map(|c| c.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    use crate::parsers::ParserAdapter;
    use crate::parsers::kamailio::LANGUAGE;

    fn extract(text: &str) -> SymbolTables {
        let tree = ParserAdapter::kamailio().unwrap().parse(text);
        VariableExtractor::new(&LANGUAGE).extract(&tree)
    }

    #[test]
    fn test_scopes() {
        let tables = extract(indoc! {r#"
            $avp(foo) = "bar";
            request_route {
                $var(count) = 1 + 2;
                $dlg_var(caller) = $fU;
            }
        "#});
        let avp = tables.get(Scope::Transaction, "$avp(foo)").unwrap();
        assert_eq!(avp.identifier, "foo");
        assert_eq!(avp.value, "\"bar\"");
        assert_eq!(tables.get(Scope::Local, "$var(count)").unwrap().value, "1 + 2");
        assert_eq!(tables.get(Scope::Dialog, "$dlg_var(caller)").unwrap().value, "$fU");
        assert_eq!(tables.len(), 3);
    }

    #[test]
    fn test_later_assignment_replaces_earlier() {
        let tables = extract("$var(x) = 1;\n$var(x) = 2;\n");
        assert_eq!(tables.get(Scope::Local, "$var(x)").unwrap().value, "2");
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_prefixed_avp_name() {
        let tables = extract("$avp(s:caller) = $fu;\n");
        assert!(tables.get(Scope::Transaction, "$avp(caller)").is_some());
    }

    #[test]
    fn test_other_targets_are_skipped() {
        let tables = extract(indoc! {r#"
            request_route {
                $ru = "sip:a@b";
                $hdr(X-Test) = 1;
                foo = 1;
                $var(x) = ;
            }
        "#});
        assert!(tables.is_empty(), "{:?}", tables);
    }
}
