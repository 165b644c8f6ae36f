//! Compiler for structural query patterns
//!
//! Accepts the S-expression dialect used by tree-sitter queries:
//!
//! ```text
//! (assignment_expression left: (pseudo_variable) @target) @assignment
//! (statement [(core_function) (return_statement)] @terminal) @statement
//! (_)  _  "="  ; comments run to end of line
//! ```
//!
//! Kinds and fields are checked against a [`Language`] while compiling.

use thiserror::Error;

use crate::syntax::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Syntax,
    NodeType,
    Field,
}

/// A pattern that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} error at offset {offset}: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub offset: usize,
    pub message: String,
}

impl QueryError {
    fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Syntax,
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeMatcher {
    /// `(kind ...)`
    Named(&'static str),
    /// `(_ ...)`
    NamedWildcard,
    /// `_`
    Any,
    /// `"token"`
    Anonymous(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pattern {
    Node {
        matcher: NodeMatcher,
        children: Vec<ChildPattern>,
        captures: Vec<u32>,
    },
    Alternation {
        alternatives: Vec<Pattern>,
        captures: Vec<u32>,
    },
}

impl Pattern {
    fn captures_mut(&mut self) -> &mut Vec<u32> {
        match self {
            Pattern::Node { captures, .. } | Pattern::Alternation { captures, .. } => captures,
        }
    }

    /// Whether the pattern can only match named nodes.
    pub(crate) fn requires_named(&self) -> bool {
        match self {
            Pattern::Node { matcher, .. } => {
                matches!(matcher, NodeMatcher::Named(_) | NodeMatcher::NamedWildcard)
            }
            Pattern::Alternation { alternatives, .. } => {
                alternatives.iter().all(Pattern::requires_named)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildPattern {
    pub(crate) field: Option<&'static str>,
    pub(crate) pattern: Pattern,
}

/// Compiled form of a query source.
#[derive(Debug, Clone)]
pub(crate) struct CompiledQuery {
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) capture_names: Vec<String>,
}

pub(crate) fn compile(language: &Language, source: &str) -> Result<CompiledQuery, QueryError> {
    let mut compiler = Compiler {
        language,
        source,
        pos: 0,
        capture_names: Vec::new(),
    };
    let mut patterns = Vec::new();
    loop {
        compiler.skip_whitespace();
        if compiler.pos >= source.len() {
            break;
        }
        patterns.push(compiler.pattern()?);
    }
    if patterns.is_empty() {
        return Err(QueryError::syntax(0, "query contains no patterns"));
    }
    Ok(CompiledQuery {
        patterns,
        capture_names: compiler.capture_names,
    })
}

struct Compiler<'a> {
    language: &'a Language,
    source: &'a str,
    pos: usize,
    capture_names: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += c.len_utf8(),
                Some(';') => {
                    let line_end = self.rest().find('\n').map_or(self.source.len(), |i| self.pos + i);
                    self.pos = line_end;
                }
                _ => break,
            }
        }
    }

    fn identifier(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn pattern(&mut self) -> Result<Pattern, QueryError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut pattern = match self.peek() {
            Some('(') => self.node_pattern()?,
            Some('[') => self.alternation()?,
            Some('"') => {
                let text = self.string()?;
                let kind = self.language.node_kind_for_name(&text, false).ok_or(QueryError {
                    kind: QueryErrorKind::NodeType,
                    offset: start,
                    message: format!("unknown token \"{}\"", text),
                })?;
                Pattern::Node {
                    matcher: NodeMatcher::Anonymous(kind),
                    children: Vec::new(),
                    captures: Vec::new(),
                }
            }
            Some('_') if !self.rest()[1..].starts_with(|c: char| c.is_alphanumeric() || c == '_') => {
                self.pos += 1;
                Pattern::Node {
                    matcher: NodeMatcher::Any,
                    children: Vec::new(),
                    captures: Vec::new(),
                }
            }
            Some(c) => {
                return Err(QueryError::syntax(start, format!("unexpected character '{}'", c)));
            }
            None => return Err(QueryError::syntax(start, "unexpected end of query")),
        };

        loop {
            self.skip_whitespace();
            if self.peek() != Some('@') {
                break;
            }
            self.pos += 1;
            let at = self.pos;
            let name = self.identifier();
            if name.is_empty() {
                return Err(QueryError::syntax(at, "empty capture name"));
            }
            let index = self.capture_index(name);
            pattern.captures_mut().push(index);
        }
        Ok(pattern)
    }

    fn capture_index(&mut self, name: &str) -> u32 {
        match self.capture_names.iter().position(|n| n == name) {
            Some(index) => index as u32,
            None => {
                self.capture_names.push(name.to_string());
                (self.capture_names.len() - 1) as u32
            }
        }
    }

    fn node_pattern(&mut self) -> Result<Pattern, QueryError> {
        self.pos += 1;
        self.skip_whitespace();
        let kind_offset = self.pos;
        let kind = self.identifier();
        let matcher = match kind {
            "" => return Err(QueryError::syntax(kind_offset, "expected a node kind")),
            "_" => NodeMatcher::NamedWildcard,
            _ => {
                let kind = self.language.node_kind_for_name(kind, true).ok_or(QueryError {
                    kind: QueryErrorKind::NodeType,
                    offset: kind_offset,
                    message: format!("unknown node kind '{}'", kind),
                })?;
                NodeMatcher::Named(kind)
            }
        };

        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(QueryError::syntax(self.pos, "unclosed '('")),
                Some(c) if c.is_alphabetic() => {
                    let field_offset = self.pos;
                    let name = self.identifier();
                    self.skip_whitespace();
                    if self.peek() != Some(':') {
                        return Err(QueryError::syntax(
                            field_offset,
                            format!("expected ':' after field '{}'", name),
                        ));
                    }
                    self.pos += 1;
                    let field = self.language.field_for_name(name).ok_or(QueryError {
                        kind: QueryErrorKind::Field,
                        offset: field_offset,
                        message: format!("unknown field '{}'", name),
                    })?;
                    let pattern = self.pattern()?;
                    children.push(ChildPattern {
                        field: Some(field),
                        pattern,
                    });
                }
                Some(_) => {
                    let pattern = self.pattern()?;
                    children.push(ChildPattern { field: None, pattern });
                }
            }
        }

        Ok(Pattern::Node {
            matcher,
            children,
            captures: Vec::new(),
        })
    }

    fn alternation(&mut self) -> Result<Pattern, QueryError> {
        let open = self.pos;
        self.pos += 1;
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(QueryError::syntax(open, "unclosed '['")),
                Some(_) => alternatives.push(self.pattern()?),
            }
        }
        if alternatives.is_empty() {
            return Err(QueryError::syntax(open, "empty alternation"));
        }
        Ok(Pattern::Alternation {
            alternatives,
            captures: Vec::new(),
        })
    }

    fn string(&mut self) -> Result<String, QueryError> {
        let open = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(value);
                }
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                _ => value.push(c),
            }
        }
        Err(QueryError::syntax(open, "unterminated string"))
    }
}
