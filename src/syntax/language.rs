//! Language descriptor shared by the parser and the query compiler

/// Descriptor version produced by grammars built against this crate.
pub const LANGUAGE_VERSION: u32 = 2;

/// Oldest descriptor version the parser adapter still accepts.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 1;

/// Static description of a grammar: its name, the node kinds it can emit and
/// the field names its productions use.
///
/// Queries are compiled against a `Language` so that a pattern naming a kind
/// or field the grammar never produces is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    name: &'static str,
    version: u32,
    named_kinds: &'static [&'static str],
    anonymous_kinds: &'static [&'static [&'static str]],
    fields: &'static [&'static str],
}

impl Language {
    pub const fn new(
        name: &'static str,
        version: u32,
        named_kinds: &'static [&'static str],
        anonymous_kinds: &'static [&'static [&'static str]],
        fields: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            version,
            named_kinds,
            anonymous_kinds,
            fields,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Looks up the interned string for a node kind.
    ///
    /// # Arguments
    /// * `kind` - Kind to look up
    /// * `named` - Whether to search named kinds or anonymous tokens
    pub fn node_kind_for_name(&self, kind: &str, named: bool) -> Option<&'static str> {
        if named {
            self.named_kinds.iter().find(|k| **k == kind).copied()
        } else {
            self.anonymous_kinds
                .iter()
                .flat_map(|group| group.iter())
                .find(|k| **k == kind)
                .copied()
        }
    }

    pub fn field_for_name(&self, field: &str) -> Option<&'static str> {
        self.fields.iter().find(|f| **f == field).copied()
    }

    pub fn node_kind_count(&self) -> usize {
        self.named_kinds.len() + self.anonymous_kinds.iter().map(|g| g.len()).sum::<usize>()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_LANGUAGE: Language =
        Language::new("test", LANGUAGE_VERSION, &["block", "word"], &[&["{", "}"]], &["body"]);

    #[test]
    fn test_kind_lookup_respects_namedness() {
        assert_eq!(TEST_LANGUAGE.node_kind_for_name("block", true), Some("block"));
        assert_eq!(TEST_LANGUAGE.node_kind_for_name("block", false), None);
        assert_eq!(TEST_LANGUAGE.node_kind_for_name("{", false), Some("{"));
        assert_eq!(TEST_LANGUAGE.node_kind_count(), 4);
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(TEST_LANGUAGE.field_for_name("body"), Some("body"));
        assert!(TEST_LANGUAGE.field_for_name("left").is_none());
        assert_eq!(TEST_LANGUAGE.field_count(), 1);
    }
}
