//! User-defined variables and route declarations found in a document
//!
//! Variables are collected per scope. Each table is keyed by the qualified
//! name (`$avp(id)`, `$var(id)`, `$dlg_var(id)`) and keeps only the last
//! assignment seen in document order.

mod extractor;
pub mod routes;

use std::collections::BTreeMap;
use std::fmt;

use crate::syntax::Range;
use crate::syntax::kinds::{AVP_VAR, DLG_VAR, SCRIPT_VAR};

pub use extractor::VariableExtractor;
pub(crate) use extractor::variable_identifier;
pub use routes::{RouteDefinition, RouteIndex};

/// Lifetime of a user-defined variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// `$avp(...)`, lives for the SIP transaction.
    Transaction,
    /// `$var(...)`, private to the worker process.
    Local,
    /// `$dlg_var(...)`, lives for the dialog.
    Dialog,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Transaction, Scope::Local, Scope::Dialog];

    /// Scope of the variable node kind (`avp_var`, `script_var`, `dlg_var`).
    pub fn for_kind(kind: &str) -> Option<Self> {
        match kind {
            AVP_VAR => Some(Scope::Transaction),
            SCRIPT_VAR => Some(Scope::Local),
            DLG_VAR => Some(Scope::Dialog),
            _ => None,
        }
    }

    /// Pseudo-variable class written in scripts.
    pub fn class(self) -> &'static str {
        match self {
            Scope::Transaction => "avp",
            Scope::Local => "var",
            Scope::Dialog => "dlg_var",
        }
    }

    pub fn qualified_name(self, identifier: &str) -> String {
        format!("${}({})", self.class(), identifier)
    }

    /// Heading used in hover documentation.
    pub fn title(self) -> &'static str {
        match self {
            Scope::Transaction => "User defined AVP",
            Scope::Local => "Local variable",
            Scope::Dialog => "Dialog variable",
        }
    }

    /// Completion detail.
    pub fn detail(self) -> &'static str {
        match self {
            Scope::Transaction => "AVP",
            Scope::Local => "Local Variable",
            Scope::Dialog => "Dialog Variable",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Scope::Transaction => "Transaction",
            Scope::Local => "Local",
            Scope::Dialog => "Dialog",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Qualified name, e.g. `$avp(foo)`.
    pub name: String,
    /// Bare identifier, e.g. `foo`.
    pub identifier: String,
    /// Source text of the assigned value.
    pub value: String,
    pub scope: Scope,
    /// Range of the assignment.
    pub range: Range,
}

impl Variable {
    /// Markdown shown on hover and in completion items.
    pub fn documentation(&self) -> String {
        format!(
            "## {}\n\t{}\n### Value\n\t```\n\t{}\n```\n### Scope\n\t{}\n",
            self.scope.title(),
            self.identifier,
            self.value,
            self.scope
        )
    }
}

/// Variables of one document, one table per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTables {
    transaction: BTreeMap<String, Variable>,
    local: BTreeMap<String, Variable>,
    dialog: BTreeMap<String, Variable>,
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `variable`, replacing any earlier entry of the same name.
    pub fn insert(&mut self, variable: Variable) {
        self.table_mut(variable.scope)
            .insert(variable.name.clone(), variable);
    }

    pub fn table(&self, scope: Scope) -> &BTreeMap<String, Variable> {
        match scope {
            Scope::Transaction => &self.transaction,
            Scope::Local => &self.local,
            Scope::Dialog => &self.dialog,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut BTreeMap<String, Variable> {
        match scope {
            Scope::Transaction => &mut self.transaction,
            Scope::Local => &mut self.local,
            Scope::Dialog => &mut self.dialog,
        }
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<&Variable> {
        self.table(scope).get(name)
    }

    /// All variables, scope by scope, each scope sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        Scope::ALL.into_iter().flat_map(move |scope| self.table(scope).values())
    }

    pub fn len(&self) -> usize {
        self.transaction.len() + self.local.len() + self.dialog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(scope: Scope, identifier: &str, value: &str) -> Variable {
        Variable {
            name: scope.qualified_name(identifier),
            identifier: identifier.to_string(),
            value: value.to_string(),
            scope,
            range: Range::default(),
        }
    }

    #[test]
    fn test_documentation_template() {
        let doc = variable(Scope::Transaction, "foo", "\"bar\"").documentation();
        assert_eq!(
            doc,
            "## User defined AVP\n\tfoo\n### Value\n\t```\n\t\"bar\"\n```\n### Scope\n\tTransaction\n"
        );
    }

    #[test]
    fn test_last_write_wins() {
        let mut tables = SymbolTables::new();
        tables.insert(variable(Scope::Local, "x", "1"));
        tables.insert(variable(Scope::Local, "x", "2"));
        tables.insert(variable(Scope::Dialog, "x", "3"));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables.get(Scope::Local, "$var(x)").unwrap().value, "2");
        assert_eq!(tables.get(Scope::Dialog, "$dlg_var(x)").unwrap().value, "3");
        assert!(tables.get(Scope::Transaction, "$avp(x)").is_none());
    }

    #[test]
    fn test_iteration_order() {
        let mut tables = SymbolTables::new();
        tables.insert(variable(Scope::Dialog, "d", "1"));
        tables.insert(variable(Scope::Local, "b", "1"));
        tables.insert(variable(Scope::Local, "a", "1"));
        tables.insert(variable(Scope::Transaction, "z", "1"));
        let names: Vec<&str> = tables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["$avp(z)", "$var(a)", "$var(b)", "$dlg_var(d)"]);
    }
}
