//! Hover documentation
//!
//! ```text
//! node under cursor
//!       ├─→ function name in a call  → module documentation
//!       ├─→ $avp / $var / $dlg_var   → variable table of the document
//!       └─→ anything else            → cookbook and keyword lookup
//! ```
//!
//! A lookup that misses falls through to the next one; when every lookup
//! misses the caller shows [`NOT_FOUND`].

use tracing::trace;

use crate::docs::DocumentationProvider;
use crate::symbols::{Scope, SymbolTables, variable_identifier};
use crate::syntax::Node;
use crate::syntax::kinds::{
    CALL_EXPRESSION, EXPRESSION, FIELD_FUNCTION, IDENTIFIER, PSEUDO_CONTENT, PSEUDO_VARIABLE,
    VARIABLE_NAME,
};

pub const NOT_FOUND: &str = "Documentation not found";

/// Documentation for `node`, or `None` if no source knows it.
pub fn documentation_for(
    node: Node<'_>,
    symbols: &SymbolTables,
    docs: &dyn DocumentationProvider,
) -> Option<String> {
    if let Some(name) = called_function(node) {
        trace!("Hover on call of '{}'", name);
        if let Some(doc) = docs.find_function_doc(name) {
            return Some(doc);
        }
    }

    if let Some(marker) = variable_marker(node) {
        if let (Some(scope), Some(identifier)) =
            (Scope::for_kind(marker.kind()), variable_identifier(marker))
        {
            let name = scope.qualified_name(identifier);
            trace!("Hover on variable '{}'", name);
            if let Some(variable) = symbols.get(scope, &name) {
                return Some(variable.documentation());
            }
        }
    }

    let key = free_text_key(node.text());
    trace!("Hover free-text lookup of '{}'", key);
    docs.find_free_text_doc(&key)
}

/// Function name if `node` is the callee of a call expression.
fn called_function<'tree>(node: Node<'tree>) -> Option<&'tree str> {
    if node.kind() != IDENTIFIER {
        return None;
    }
    let callee = node.parent().filter(|p| p.kind() == EXPRESSION)?;
    let call = callee.parent().filter(|p| p.kind() == CALL_EXPRESSION)?;
    (callee.field_name() == Some(FIELD_FUNCTION) && call.kind() == CALL_EXPRESSION)
        .then(|| node.text())
}

/// The `avp_var`, `script_var` or `dlg_var` node `node` belongs to.
fn variable_marker(node: Node<'_>) -> Option<Node<'_>> {
    let is_marker = |n: &Node<'_>| Scope::for_kind(n.kind()).is_some();
    match node.kind() {
        PSEUDO_VARIABLE => node
            .significant_children()
            .find(|c| c.kind() == PSEUDO_CONTENT)?
            .significant_children()
            .next()
            .filter(is_marker),
        PSEUDO_CONTENT => node.significant_children().next().filter(is_marker),
        VARIABLE_NAME => node.parent().filter(is_marker),
        IDENTIFIER => node
            .parent()
            .filter(|p| p.kind() == VARIABLE_NAME)?
            .parent()
            .filter(is_marker),
        _ => Some(node).filter(is_marker),
    }
}

/// Keeps ASCII letters, digits, spaces and underscores.
fn free_text_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .collect()
}
