//! Function documentation extracted from Kamailio module READMEs
//!
//! A Kamailio source tree keeps one plain-text `README` per module under
//! `src/modules/<module>/`. Function sections look like:
//!
//! ```text
//! 4.1. t_relay([host, port])
//!
//!    Relays a message statefully...
//!
//!    Example 1.30. t_relay usage
//! ...
//! if (!t_relay()) { sl_reply_error(); };
//! ...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::DocumentationError;

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\s*(\w+)\s*$").expect("valid section regex"));
static FUNCTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\.\d+\.\s*(\w+)\((.*)\)\s*$").expect("valid function regex"));

const EXAMPLE_START: &str = "Example";
const EXAMPLE_DELIMITER: &str = "...";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionDoc {
    pub module: String,
    pub name: String,
    pub parameters: String,
    pub description: String,
    pub example: String,
}

impl FunctionDoc {
    /// Markdown rendering, without the module heading.
    pub fn render(&self) -> String {
        format!(
            "## Function:\n\t{}\n\n## Parameters:\n\t{}\n\n## Description:\n{}\n\n## Example:\n```\n{}\n```",
            self.name, self.parameters, self.description, self.example
        )
    }

    /// Markdown rendering headed by the owning module.
    pub fn render_with_module(&self) -> String {
        format!("# Module: {}\n\n{}", self.module, self.render())
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDoc {
    pub name: String,
    /// Top-level section titles, e.g. `Overview`, `Parameters`, `Functions`.
    pub sections: Vec<String>,
    pub functions: BTreeMap<String, FunctionDoc>,
}

impl ModuleDoc {
    pub fn summary(&self) -> String {
        if self.sections.is_empty() {
            format!("Module {}", self.name)
        } else {
            format!("Module {}\n\nSections: {}", self.name, self.sections.join(", "))
        }
    }
}

/// Parses one module README.
///
/// A function header starts a new entry; following lines form its
/// description until a line mentioning `Example`, after which the lines
/// between the next two `...` lines are the example. Headers repeated later
/// in the file (the table of contents lists them too) replace earlier ones.
pub fn parse_readme(module: &str, text: &str) -> ModuleDoc {
    let mut doc = ModuleDoc {
        name: module.to_string(),
        ..ModuleDoc::default()
    };
    let mut current: Option<FunctionDoc> = None;
    let mut in_example = false;
    let mut delimiters = 0;
    let mut example = String::new();

    for line in text.lines() {
        if let Some(caps) = FUNCTION_HEADER.captures(line) {
            if let Some(done) = current.take() {
                doc.functions.insert(done.name.clone(), done);
            }
            current = Some(FunctionDoc {
                module: module.to_string(),
                name: caps[1].to_string(),
                parameters: caps[2].to_string(),
                ..FunctionDoc::default()
            });
            in_example = false;
            delimiters = 0;
            example.clear();
            continue;
        }

        let Some(function) = current.as_mut() else {
            if let Some(caps) = SECTION_HEADER.captures(line) {
                let title = caps[1].to_string();
                if !doc.sections.contains(&title) {
                    doc.sections.push(title);
                }
            }
            continue;
        };

        if !in_example {
            if line.contains(EXAMPLE_START) {
                in_example = true;
            } else {
                function.description.push_str(line);
                function.description.push('\n');
            }
        } else if line.contains(EXAMPLE_DELIMITER) {
            delimiters += 1;
            if delimiters == 2 {
                in_example = false;
                delimiters = 0;
            }
            function.example = example.clone();
        } else {
            example.push_str(line);
            example.push('\n');
        }
    }
    if let Some(done) = current {
        doc.functions.insert(done.name.clone(), done);
    }
    doc
}

/// Documentation of every module in a source tree.
#[derive(Debug, Clone, Default)]
pub struct ModuleDocs {
    modules: BTreeMap<String, ModuleDoc>,
    /// Function name to the first module (by name) documenting it.
    by_function: FxHashMap<String, String>,
}

impl ModuleDocs {
    /// Reads `{source}/src/modules/*/README`.
    ///
    /// Unreadable READMEs are logged and skipped; a missing modules
    /// directory is an error.
    pub fn load(source: &Path) -> Result<Self, DocumentationError> {
        let modules_dir: PathBuf = source.join("src").join("modules");
        if !modules_dir.is_dir() {
            return Err(DocumentationError::MissingModules(modules_dir));
        }

        let mut docs = ModuleDocs::default();
        for entry in WalkDir::new(&modules_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            let module = entry.file_name().to_string_lossy().to_string();
            let readme = entry.path().join("README");
            match fs::read_to_string(&readme) {
                Ok(text) => docs.insert(parse_readme(&module, &text)),
                Err(err) => warn!("Skipping module '{}': {:?}: {}", module, readme, err),
            }
        }
        debug!(
            "Loaded documentation for {} modules, {} functions",
            docs.modules.len(),
            docs.by_function.len()
        );
        Ok(docs)
    }

    pub fn insert(&mut self, module: ModuleDoc) {
        self.modules.insert(module.name.clone(), module);
        self.by_function.clear();
        for (name, module) in &self.modules {
            for function in module.functions.keys() {
                self.by_function
                    .entry(function.clone())
                    .or_insert_with(|| name.clone());
            }
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDoc> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleDoc> {
        self.modules.values()
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDoc> {
        let module = self.by_function.get(name)?;
        self.modules.get(module)?.functions.get(name)
    }

    /// All functions, sorted by module then name.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDoc> {
        self.modules.values().flat_map(|m| m.functions.values())
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const README: &str = indoc! {"
        TM Module

        1. Overview
        2. Parameters
        3. Functions

              3.1. t_relay([host, port])
              3.2. t_on_failure(failure_route)

        3. Functions

        3.1. t_relay([host, port])

           Relays a message statefully.

           Example 1.1. t_relay usage
        ...
        if (!t_relay()) {
            sl_reply_error();
        }
        ...

        3.2. t_on_failure(failure_route)

           Sets the failure route.
    "};

    #[test]
    fn test_parses_functions() {
        let doc = parse_readme("tm", README);
        assert_eq!(doc.functions.len(), 2);

        let relay = &doc.functions["t_relay"];
        assert_eq!(relay.parameters, "[host, port]");
        assert!(relay.description.contains("Relays a message statefully."));
        assert!(!relay.description.contains("3.2."));
        assert_eq!(relay.example, "if (!t_relay()) {\n    sl_reply_error();\n}\n");

        let failure = &doc.functions["t_on_failure"];
        assert!(failure.description.contains("Sets the failure route."));
        assert!(failure.example.is_empty());
    }

    #[test]
    fn test_collects_sections() {
        let doc = parse_readme("tm", README);
        assert_eq!(doc.sections, vec!["Overview", "Parameters", "Functions"]);
    }

    #[test]
    fn test_rendering() {
        let function = FunctionDoc {
            module: "sl".to_string(),
            name: "sl_send_reply".to_string(),
            parameters: "code, reason".to_string(),
            description: "Sends a reply.".to_string(),
            example: "sl_send_reply(\"404\", \"Not found\");".to_string(),
        };
        assert_eq!(
            function.render_with_module(),
            "# Module: sl\n\n## Function:\n\tsl_send_reply\n\n## Parameters:\n\tcode, reason\n\n\
             ## Description:\nSends a reply.\n\n## Example:\n```\nsl_send_reply(\"404\", \"Not found\");\n```"
        );
        assert_eq!(function.signature(), "sl_send_reply(code, reason)");
    }

    #[test]
    fn test_first_module_wins_for_shared_names() {
        let mut docs = ModuleDocs::default();
        docs.insert(parse_readme("zeta", "1.1. shared()\n   from zeta\n"));
        docs.insert(parse_readme("alpha", "1.1. shared()\n   from alpha\n"));
        assert_eq!(docs.find_function("shared").unwrap().module, "alpha");
        assert!(docs.find_function("missing").is_none());
    }
}
