//! Completion candidates
//!
//! Candidates are not filtered by prefix; the client does that. The list is
//! assembled in a fixed order: module functions, keywords, variables of the
//! current document, modules, then cookbook entries.

use crate::docs::DocumentationProvider;
use crate::symbols::SymbolTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Function,
    Keyword,
    Variable,
    Module,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub detail: String,
    pub documentation: String,
    pub kind: CompletionKind,
}

impl CompletionItem {
    fn new(
        label: impl Into<String>,
        detail: impl Into<String>,
        documentation: impl Into<String>,
        kind: CompletionKind,
    ) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
            documentation: documentation.into(),
            kind,
        }
    }
}

/// Every candidate available in a document with `symbols`.
pub fn completion_items(
    symbols: &SymbolTables,
    docs: &dyn DocumentationProvider,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    items.extend(docs.functions().into_iter().map(|function| {
        let documentation = if function.example.is_empty() {
            function.description.clone()
        } else {
            format!("{}\n{}", function.description, function.example)
        };
        CompletionItem::new(
            format!("{}()", function.name),
            function.signature(),
            documentation,
            CompletionKind::Function,
        )
    }));

    items.extend(docs.keywords().into_iter().map(|(name, description)| {
        CompletionItem::new(name, "SIP Header", description, CompletionKind::Keyword)
    }));

    items.extend(symbols.iter().map(|variable| {
        CompletionItem::new(
            variable.name.as_str(),
            variable.scope.detail(),
            variable.documentation(),
            CompletionKind::Variable,
        )
    }));

    items.extend(docs.modules().into_iter().map(|(name, summary)| {
        CompletionItem::new(name, "Module", summary, CompletionKind::Module)
    }));

    items.extend(docs.cookbook_entries().into_iter().map(|(name, documentation)| {
        CompletionItem::new(name, "Cookbook", documentation, CompletionKind::Text)
    }));

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{Cookbook, KnowledgeBase, ModuleDocs, SIP_HEADERS, modules::parse_readme};
    use crate::parsers::ParserAdapter;
    use crate::parsers::kamailio::LANGUAGE;
    use crate::symbols::VariableExtractor;

    #[test]
    fn test_order_and_content() {
        let mut modules = ModuleDocs::default();
        modules.insert(parse_readme(
            "sl",
            "1. Overview\n   Stateless replies.\n4. Functions\n4.1. sl_send_reply(code, reason)\n   Sends a reply.\n",
        ));
        let cookbook =
            Cookbook::from_json(r#"{"docs":[{"name":"fork","documentation":"Parallel forking."}]}"#)
                .unwrap();
        let docs = KnowledgeBase::new(modules, cookbook);

        let tree = ParserAdapter::kamailio()
            .unwrap()
            .parse("request_route {\n  $var(hops) = 1;\n}\n");
        let symbols = VariableExtractor::new(&LANGUAGE).extract(&tree);

        let items = completion_items(&symbols, &docs);
        let kinds: Vec<CompletionKind> = items.iter().map(|i| i.kind).collect();
        let keywords = SIP_HEADERS.len();
        assert_eq!(items.len(), keywords + 4);
        assert_eq!(kinds[0], CompletionKind::Function);
        assert!(kinds[1..=keywords].iter().all(|k| *k == CompletionKind::Keyword));
        assert_eq!(
            &kinds[keywords + 1..],
            &[CompletionKind::Variable, CompletionKind::Module, CompletionKind::Text]
        );

        assert_eq!(items[0].label, "sl_send_reply()");
        assert_eq!(items[0].detail, "sl_send_reply(code, reason)");
        let variable = &items[keywords + 1];
        assert_eq!(variable.label, "$var(hops)");
        assert_eq!(variable.detail, "Local Variable");
        assert!(variable.documentation.contains("hops"));
        assert_eq!(items[keywords + 2].detail, "Module");
        assert_eq!(items[keywords + 3].label, "fork");
    }

    #[test]
    fn test_without_documentation() {
        let items = completion_items(&SymbolTables::new(), &KnowledgeBase::default());
        assert!(items.iter().all(|i| i.kind == CompletionKind::Keyword));
        assert_eq!(items[0].detail, "SIP Header");
    }
}
