//! Static analysis over syntax trees
//!
//! Each [`DiagnosticRule`] names a query and turns that query's matches into
//! diagnostics. Rules are independent of one another; [`DiagnosticAnalyzer`]
//! compiles their queries once and runs every enabled rule on each pass,
//! rebuilding the diagnostic list from scratch.

pub mod rules;

use std::fmt;

use tracing::{debug, trace, warn};

use crate::query::{Query, QueryMatch};
use crate::settings::AnalysisSettings;
use crate::syntax::{Language, Range, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
            Severity::Hint => "hint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: Range, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
        }
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Error, message)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Warning, message)
    }

    pub fn hint(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Hint, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}: {}",
            self.range.start_point, self.range.end_point, self.severity, self.message
        )
    }
}

/// One static check.
pub trait DiagnosticRule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Query selecting the nodes the rule inspects.
    fn pattern(&self) -> &'static str;

    /// Whether the rule runs at all under `settings`.
    fn enabled(&self, _settings: &AnalysisSettings) -> bool {
        true
    }

    /// Turns the matches of [`Self::pattern`] into diagnostics.
    fn diagnose(&self, query: &Query, matches: &[QueryMatch<'_>]) -> Vec<Diagnostic>;
}

struct CompiledRule {
    rule: Box<dyn DiagnosticRule>,
    /// `None` if the pattern failed to compile; the rule is then skipped.
    query: Option<Query>,
}

/// Runs a fixed set of rules over a tree.
pub struct DiagnosticAnalyzer {
    rules: Vec<CompiledRule>,
}

impl fmt::Debug for DiagnosticAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAnalyzer")
            .field("rules", &self.rules.iter().map(|r| r.rule.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl DiagnosticAnalyzer {
    /// Analyzer with the built-in rule set.
    pub fn new(language: &Language) -> Self {
        Self::with_rules(language, rules::default_rules())
    }

    /// Analyzer with a custom rule set. Rules whose query does not compile
    /// are logged and contribute nothing.
    pub fn with_rules(language: &Language, rules: Vec<Box<dyn DiagnosticRule>>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let query = match Query::new(language, rule.pattern()) {
                    Ok(query) => Some(query),
                    Err(err) => {
                        warn!("Disabling diagnostic rule '{}': {}", rule.name(), err);
                        None
                    }
                };
                CompiledRule { rule, query }
            })
            .collect();
        Self { rules }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.rule.name())
    }

    /// Runs every enabled rule over `tree`.
    ///
    /// Diagnostics are grouped by rule, in rule order, and within a rule in
    /// document order.
    pub fn analyze(&self, tree: &Tree, settings: &AnalysisSettings) -> Vec<Diagnostic> {
        let root = tree.root_node();
        let mut diagnostics = Vec::new();
        for compiled in &self.rules {
            let rule = compiled.rule.as_ref();
            if !rule.enabled(settings) {
                trace!("Rule '{}' disabled by settings", rule.name());
                continue;
            }
            let Some(query) = &compiled.query else {
                continue;
            };
            let matches = query.matches(root);
            let found = rule.diagnose(query, &matches);
            trace!(
                "Rule '{}': {} matches, {} diagnostics",
                rule.name(),
                matches.len(),
                found.len()
            );
            diagnostics.extend(found);
        }
        debug!("Analysis produced {} diagnostics", diagnostics.len());
        diagnostics
    }
}
