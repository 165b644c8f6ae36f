//! Error-recovering recursive-descent parser for Kamailio routing scripts
//!
//! The parser never fails: malformed regions are wrapped in `ERROR` nodes and
//! parsing resumes at the next statement boundary (`;`, `}` or a new line).
//! A missing `;` directly before a line break or `}` is tolerated silently.
//!
//! Comments and directives are buffered while tokens are consumed and
//! attached to the innermost node whose span encloses them, so extras always
//! appear in source order among their siblings.

use tracing::trace;

use super::lexer::{Token, TokenKind, tokenize};
use crate::syntax::RawNode;
use crate::syntax::kinds::*;

/// Result of parsing an expression: the node, or the nodes consumed before
/// the parse failed (possibly none).
type Parsed = Result<RawNode, Vec<RawNode>>;

/// Statements, expressions and unary operands nested deeper than this are
/// not parsed; the rest of the nested region becomes a single `ERROR` node.
const MAX_NESTING_DEPTH: usize = 64;

/// Parses `text` into the raw `source_file` node.
pub fn parse(text: &str) -> RawNode {
    let mut parser = Parser::new(text);
    let root = parser.parse_source_file();
    trace!("Parsed {} bytes into {} top-level items", text.len(), root.children.len());
    root
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    pending: Vec<RawNode>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            tokens: tokenize(text),
            pos: 0,
            pending: Vec::new(),
            depth: 0,
        }
    }

    // ========================================================================
    // Token stream
    // ========================================================================

    fn collect_trivia(&mut self) {
        while let Some(tok) = self.tokens.get(self.pos).copied() {
            if !tok.kind.is_trivia() {
                break;
            }
            let kind = match tok.kind {
                TokenKind::DeprecatedComment => DEPRECATED_COMMENT,
                TokenKind::Directive => PREPROC_DIRECTIVE,
                _ => COMMENT,
            };
            self.pending
                .push(RawNode::leaf(kind, true, tok.start, tok.end).into_extra());
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<Token> {
        self.collect_trivia();
        self.tokens.get(self.pos).copied()
    }

    /// Looks `n` significant tokens past the next one without consuming.
    fn peek_nth(&mut self, n: usize) -> Option<Token> {
        self.collect_trivia();
        self.tokens[self.pos..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
            .copied()
    }

    fn peek_kind(&mut self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(tok) => tok.kind == TokenKind::Identifier && self.slice(tok) == keyword,
            None => false,
        }
    }

    fn slice(&self, tok: Token) -> &'a str {
        &self.text[tok.start..tok.end]
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    /// Next token starts right where `prev` ended.
    fn adjacent(&mut self, prev_end: usize, kind: TokenKind) -> bool {
        matches!(self.peek(), Some(tok) if tok.kind == kind && tok.start == prev_end)
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    /// Leaf for an arbitrary token, classified by its kind.
    fn token_leaf(&self, tok: Token) -> RawNode {
        match tok.kind {
            TokenKind::Identifier => RawNode::leaf(IDENTIFIER, true, tok.start, tok.end),
            TokenKind::Number => RawNode::leaf(NUMBER, true, tok.start, tok.end),
            TokenKind::String => RawNode::leaf(STRING, true, tok.start, tok.end),
            TokenKind::UnterminatedString | TokenKind::Unknown => {
                RawNode::leaf(ERROR, true, tok.start, tok.end)
            }
            kind => {
                let spelling = kind.punctuation().unwrap_or(ERROR);
                RawNode::leaf(spelling, false, tok.start, tok.end)
            }
        }
    }

    fn keyword_leaf(&self, tok: Token) -> RawNode {
        let kind = anonymous_kind(self.slice(tok)).unwrap_or(IDENTIFIER);
        RawNode::leaf(kind, kind == IDENTIFIER, tok.start, tok.end)
    }

    fn bump_leaf(&mut self) -> Option<RawNode> {
        let tok = self.bump()?;
        Some(self.token_leaf(tok))
    }

    fn bump_keyword(&mut self) -> Option<RawNode> {
        let tok = self.bump()?;
        Some(self.keyword_leaf(tok))
    }

    /// Moves buffered extras that lie inside `children`'s span into it.
    fn absorb_trivia(&mut self, children: &mut Vec<RawNode>) {
        let Some(end) = children.last().map(|c| c.end) else {
            return;
        };
        let start = children.first().map_or(end, |c| c.start);
        let mut absorbed = false;
        let mut i = 0;
        while i < self.pending.len() {
            let trivia = &self.pending[i];
            if trivia.start >= start && trivia.end <= end {
                children.push(self.pending.remove(i));
                absorbed = true;
            } else {
                i += 1;
            }
        }
        if absorbed {
            children.sort_by_key(|c| c.start);
        }
    }

    fn node(&mut self, kind: &'static str, mut children: Vec<RawNode>) -> RawNode {
        self.absorb_trivia(&mut children);
        RawNode::branch(kind, children)
    }

    fn error_node(&mut self, mut children: Vec<RawNode>) -> RawNode {
        self.absorb_trivia(&mut children);
        RawNode::error(children)
    }

    fn expression(&mut self, inner: RawNode) -> RawNode {
        RawNode::branch(EXPRESSION, vec![inner])
    }

    /// Appends an item to a container, placing preceding extras first.
    fn push_item(&mut self, children: &mut Vec<RawNode>, item: RawNode) {
        let split = self.pending.partition_point(|t| t.start < item.start);
        children.extend(self.pending.drain(..split));
        children.push(item);
    }

    fn flush_trivia(&mut self, children: &mut Vec<RawNode>) {
        self.collect_trivia();
        children.append(&mut self.pending);
    }

    /// Consumes tokens up to the end of the current statement.
    ///
    /// Stops before `;`, `{`, `}`, end of input, or a token on a new line
    /// (except the very first one).
    fn skip_statement_rest(&mut self, consumed: &mut Vec<RawNode>) {
        let mut first = true;
        while let Some(tok) = self.peek() {
            let boundary = matches!(
                tok.kind,
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace
            );
            if boundary || (tok.newline_before && !first) {
                break;
            }
            first = false;
            self.pos += 1;
            consumed.push(self.token_leaf(tok));
        }
    }

    /// Runs `parse` one nesting level deeper, or returns `None` at the limit.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return None;
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        Some(result)
    }

    /// Consumes the rest of a region nested past the limit as flat leaves.
    ///
    /// Stops before a closer, `;` or `,` outside any group opened here, and
    /// before a token on a new line outside any group.
    fn skip_nested_region(&mut self) -> Vec<RawNode> {
        let mut open = 0usize;
        let mut leaves = Vec::new();
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => open += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    if open == 0 {
                        break;
                    }
                    open -= 1;
                }
                TokenKind::Semicolon | TokenKind::Comma if open == 0 => break,
                _ if open == 0 && tok.newline_before && !leaves.is_empty() => break,
                _ => {}
            }
            self.pos += 1;
            leaves.push(self.token_leaf(tok));
        }
        if leaves.len() > 1 {
            trace!("Skipped {} tokens nested past depth {}", leaves.len(), MAX_NESTING_DEPTH);
        }
        leaves
    }

    // ========================================================================
    // Top level
    // ========================================================================

    fn parse_source_file(&mut self) -> RawNode {
        let mut children = Vec::new();
        while let Some(tok) = self.peek() {
            let item = self.parse_top_level_item(tok);
            self.push_item(&mut children, item);
        }
        self.flush_trivia(&mut children);
        RawNode::branch(SOURCE_FILE, children).spanning(0, self.text.len())
    }

    fn parse_top_level_item(&mut self, tok: Token) -> RawNode {
        match tok.kind {
            TokenKind::Identifier => {
                let word = self.slice(tok);
                let next = self.peek_nth(1).map(|t| t.kind);
                match word {
                    "loadmodule" => self.parse_string_directive(LOADMODULE_STATEMENT, FIELD_MODULE),
                    "loadpath" => self.parse_string_directive(LOADPATH_STATEMENT, FIELD_PATH),
                    "include_file" | "import_file" => {
                        self.parse_string_directive(INCLUDE_STATEMENT, FIELD_FILE)
                    }
                    "modparam" if next == Some(TokenKind::LParen) => self.parse_modparam(),
                    _ if route_keyword(word).is_some()
                        && matches!(next, Some(TokenKind::LBracket | TokenKind::LBrace)) =>
                    {
                        self.parse_route_definition()
                    }
                    _ if next == Some(TokenKind::Assign) => self.parse_top_level_assignment(),
                    _ => self.parse_statement(),
                }
            }
            TokenKind::Lt => self.parse_xml(),
            TokenKind::RBrace => {
                let stray = self.bump_leaf().into_iter().collect();
                self.error_node(stray)
            }
            _ => self.parse_statement(),
        }
    }

    /// `loadmodule "tm.so"`, `loadpath "..."`, `include_file "..."`.
    fn parse_string_directive(&mut self, kind: &'static str, field: &'static str) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        if self.at(TokenKind::String) && !self.peek().is_some_and(|t| t.newline_before) {
            if let Some(value) = self.bump_leaf() {
                children.push(value.with_field(field));
            }
        } else {
            self.skip_statement_rest(&mut children);
            return self.error_node(children);
        }
        if self.at(TokenKind::Semicolon) {
            children.extend(self.bump_leaf());
        }
        self.node(kind, children)
    }

    /// `modparam("module", "parameter", value)`.
    fn parse_modparam(&mut self) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        match self.parse_argument_list() {
            Ok(arguments) => children.push(arguments.with_field(FIELD_ARGUMENTS)),
            Err(consumed) => {
                children.extend(consumed);
                self.skip_statement_rest(&mut children);
                return self.error_node(children);
            }
        }
        if self.at(TokenKind::Semicolon) {
            children.extend(self.bump_leaf());
        }
        self.node(MODPARAM_STATEMENT, children)
    }

    /// `route[NAME] { ... }`, `request_route { ... }`, ...
    fn parse_route_definition(&mut self) -> RawNode {
        let mut children = Vec::new();
        if let Some(tok) = self.bump() {
            children.push(RawNode::leaf(ROUTE_TYPE, true, tok.start, tok.end).with_field(FIELD_TYPE));
        }

        if self.at(TokenKind::LBracket) {
            children.extend(self.bump_leaf());
            let mut name = Vec::new();
            while let Some(tok) = self.peek() {
                if matches!(
                    tok.kind,
                    TokenKind::RBracket | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon
                ) {
                    break;
                }
                self.pos += 1;
                name.push(self.token_leaf(tok));
            }
            if !name.is_empty() {
                let name = self.node(ROUTE_NAME, name);
                children.push(name.with_field(FIELD_NAME));
            }
            if self.at(TokenKind::RBracket) {
                children.extend(self.bump_leaf());
            } else {
                self.skip_statement_rest(&mut children);
                return self.error_node(children);
            }
        }

        if self.at(TokenKind::LBrace) {
            let body = self.parse_compound_statement();
            children.push(body.with_field(FIELD_BODY));
            self.node(ROUTE_DEFINITION, children)
        } else {
            self.skip_statement_rest(&mut children);
            self.error_node(children)
        }
    }

    /// `debug=2`, `listen=udp:127.0.0.1:5060`, ...; the value runs to end of line.
    fn parse_top_level_assignment(&mut self) -> RawNode {
        let mut children = Vec::new();
        if let Some(key) = self.bump_leaf() {
            children.push(key.with_field(FIELD_KEY));
        }
        children.extend(self.bump_leaf());

        let mut value = Vec::new();
        while let Some(tok) = self.peek() {
            if tok.newline_before
                || matches!(tok.kind, TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace)
            {
                break;
            }
            self.pos += 1;
            value.push(self.token_leaf(tok));
        }
        if !value.is_empty() {
            let value = self.node(CORE_VALUE, value);
            children.push(value.with_field(FIELD_VALUE));
        }
        if self.at(TokenKind::Semicolon) && !self.peek().is_some_and(|t| t.newline_before) {
            children.extend(self.bump_leaf());
        }
        self.node(TOP_LEVEL_ASSIGNMENT_EXPRESSION, children)
    }

    /// Inline markup: `<tag ...> ... </tag>`, `<?xml ...?>`, `<!-- -->`.
    ///
    /// Markup is scanned as raw bytes, not script tokens, so apostrophes and
    /// quotes in text or attributes cannot open a string that runs past the
    /// closing tag. Tags become `xml_tag` leaves and non-blank text between
    /// them `xml_text` leaves; a tag missing its `>` is an error leaf running
    /// to the end of input. The token stream is re-lexed from where the
    /// markup ends.
    fn parse_xml(&mut self) -> RawNode {
        let Some(first) = self.peek() else {
            return self.node(XML, Vec::new());
        };
        let text = self.text;
        let mut children = Vec::new();
        let mut depth: i32 = 0;
        let mut pos = first.start;

        while pos < text.len() {
            if !text[pos..].starts_with('<') {
                let stop = text[pos..].find('<').map_or(text.len(), |i| pos + i);
                let run = &text[pos..stop];
                let start = pos + (run.len() - run.trim_start().len());
                let end = pos + run.trim_end().len();
                if start < end {
                    children.push(RawNode::leaf(XML_TEXT, true, start, end));
                }
                pos = stop;
                continue;
            }

            let Some(close) = text[pos..].find('>') else {
                children.push(RawNode::leaf(ERROR, true, pos, text.len()));
                pos = text.len();
                break;
            };
            let end = pos + close + 1;
            let tag = &text[pos..end];
            children.push(RawNode::leaf(XML_TAG, true, pos, end));
            pos = end;

            if tag.starts_with("</") {
                depth -= 1;
            } else if !(tag.starts_with("<?") || tag.starts_with("<!") || tag.ends_with("/>")) {
                depth += 1;
            }

            if depth <= 0 {
                let rest = &text[pos..];
                let next = pos + (rest.len() - rest.trim_start().len());
                if !text[next..].starts_with('<') {
                    break;
                }
                pos = next;
            }
        }

        self.relex_from(pos);
        self.node(XML, children)
    }

    /// Replaces the unconsumed tokens with a fresh lexing of `text[offset..]`.
    fn relex_from(&mut self, offset: usize) {
        let mut rest = tokenize(&self.text[offset..]);
        for tok in &mut rest {
            tok.start += offset;
            tok.end += offset;
        }
        if let Some(tok) = rest.iter_mut().find(|t| !t.kind.is_trivia()) {
            tok.newline_before = self.text[offset..tok.start].contains('\n');
        }
        self.tokens.truncate(self.pos);
        self.tokens.extend(rest);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block_item(&mut self) -> RawNode {
        if self.at(TokenKind::Lt) {
            self.parse_xml()
        } else {
            self.parse_statement()
        }
    }

    fn parse_statement(&mut self) -> RawNode {
        if let Some(statement) = self.nested(Self::parse_statement_at_depth) {
            return statement;
        }
        let mut consumed = self.skip_nested_region();
        if consumed.is_empty() && !self.at(TokenKind::Semicolon) {
            consumed.extend(self.bump_leaf());
        }
        if consumed.is_empty() {
            return self.finish_statement(Vec::new());
        }
        let error = self.error_node(consumed);
        self.finish_statement(vec![error])
    }

    fn parse_statement_at_depth(&mut self) -> RawNode {
        let Some(tok) = self.peek() else {
            return self.node(STATEMENT, Vec::new());
        };

        if tok.kind == TokenKind::Identifier {
            let word = self.slice(tok);
            let next = self.peek_nth(1).map(|t| t.kind);
            match word {
                "if" => return self.wrap_statement(Self::parse_if_statement),
                "switch" => return self.wrap_statement(Self::parse_switch_statement),
                "while" => return self.wrap_statement(Self::parse_while_statement),
                "case" => return self.wrap_statement(Self::parse_case_statement),
                "default" if next == Some(TokenKind::Colon) => {
                    return self.wrap_statement(Self::parse_case_statement);
                }
                "return" => {
                    let ret = self.parse_return_statement();
                    return self.finish_statement(vec![ret]);
                }
                _ if CORE_ACTIONS.contains(&word) && next != Some(TokenKind::LParen) => {
                    let action = self.bump_keyword().into_iter().collect();
                    let action = self.node(CORE_FUNCTION, action);
                    return self.finish_statement(vec![action]);
                }
                _ => {}
            }
        }

        match tok.kind {
            TokenKind::LBrace => {
                let block = self.parse_compound_statement();
                self.node(STATEMENT, vec![block])
            }
            TokenKind::Semicolon => {
                let semi = self.bump_leaf().into_iter().collect();
                self.node(STATEMENT, semi)
            }
            _ => match self.parse_expression() {
                Ok(expression) => self.finish_statement(vec![expression]),
                Err(mut consumed) => {
                    if consumed.is_empty() {
                        consumed.extend(self.bump_leaf());
                    }
                    self.skip_statement_rest(&mut consumed);
                    let error = self.error_node(consumed);
                    self.finish_statement(vec![error])
                }
            },
        }
    }

    fn wrap_statement(&mut self, parse: fn(&mut Self) -> RawNode) -> RawNode {
        let inner = parse(self);
        self.node(STATEMENT, vec![inner])
    }

    /// Adds the terminating `;`, or an error node for trailing garbage.
    fn finish_statement(&mut self, mut children: Vec<RawNode>) -> RawNode {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Semicolon => {
                children.extend(self.bump_leaf());
            }
            None => {}
            Some(tok) if tok.kind == TokenKind::RBrace || tok.newline_before => {}
            Some(_) => {
                let mut garbage = Vec::new();
                self.skip_statement_rest(&mut garbage);
                if !garbage.is_empty() {
                    children.push(self.error_node(garbage));
                }
                if self.at(TokenKind::Semicolon) {
                    children.extend(self.bump_leaf());
                }
            }
        }
        self.node(STATEMENT, children)
    }

    fn parse_compound_statement(&mut self) -> RawNode {
        let mut children = Vec::new();
        let Some(open) = self.bump() else {
            return self.node(COMPOUND_STATEMENT, children);
        };
        children.push(RawNode::leaf(BLOCK_START, true, open.start, open.end));

        loop {
            match self.peek_kind() {
                None => {
                    // Unclosed block: the opening brace itself is the error.
                    self.flush_trivia(&mut children);
                    let brace = RawNode::leaf("{", false, open.start, open.end);
                    children[0] = RawNode::error(vec![brace]);
                    break;
                }
                Some(TokenKind::RBrace) => {
                    if let Some(close) = self.bump() {
                        let end = RawNode::leaf(BLOCK_END, true, close.start, close.end);
                        self.push_item(&mut children, end);
                    }
                    break;
                }
                Some(_) => {
                    let item = self.parse_block_item();
                    self.push_item(&mut children, item);
                }
            }
        }
        self.node(COMPOUND_STATEMENT, children)
    }

    /// Body of `if`/`else`/`while`: a block or a single statement.
    fn parse_body(&mut self, children: &mut Vec<RawNode>, field: &'static str) {
        match self.peek_kind() {
            None => {}
            Some(TokenKind::LBrace) => {
                let block = self.parse_compound_statement();
                children.push(block.with_field(field));
            }
            Some(_) => {
                let statement = self.parse_statement();
                children.push(statement.with_field(field));
            }
        }
    }

    /// `( expression )` in a control statement header.
    fn parse_condition(&mut self, children: &mut Vec<RawNode>) {
        if self.at(TokenKind::LParen) {
            match self.parse_parenthesized() {
                Ok(condition) => children.push(condition.with_field(FIELD_CONDITION)),
                Err(mut consumed) => {
                    self.skip_to_closing_paren(&mut consumed);
                    let error = self.error_node(consumed);
                    children.push(error);
                }
            }
        } else {
            let mut consumed = Vec::new();
            while let Some(tok) = self.peek() {
                if matches!(tok.kind, TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon) {
                    break;
                }
                self.pos += 1;
                consumed.push(self.token_leaf(tok));
            }
            if !consumed.is_empty() {
                let error = self.error_node(consumed);
                children.push(error);
            }
        }
    }

    fn skip_to_closing_paren(&mut self, consumed: &mut Vec<RawNode>) {
        while let Some(tok) = self.peek() {
            if matches!(tok.kind, TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon) {
                break;
            }
            self.pos += 1;
            consumed.push(self.token_leaf(tok));
            if tok.kind == TokenKind::RParen {
                break;
            }
        }
    }

    fn parse_if_statement(&mut self) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        self.parse_condition(&mut children);
        self.parse_body(&mut children, FIELD_CONSEQUENCE);
        if self.at_keyword("else") {
            children.extend(self.bump_keyword());
            self.parse_body(&mut children, FIELD_ALTERNATIVE);
        }
        self.node(IF_STATEMENT, children)
    }

    fn parse_while_statement(&mut self) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        self.parse_condition(&mut children);
        self.parse_body(&mut children, FIELD_BODY);
        self.node(WHILE_STATEMENT, children)
    }

    fn parse_switch_statement(&mut self) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        self.parse_condition(&mut children);
        if self.at(TokenKind::LBrace) {
            let body = self.parse_compound_statement();
            children.push(body.with_field(FIELD_BODY));
        } else {
            let mut garbage = Vec::new();
            self.skip_statement_rest(&mut garbage);
            if !garbage.is_empty() {
                let error = self.error_node(garbage);
                children.push(error);
            }
        }
        self.node(SWITCH_STATEMENT, children)
    }

    /// `case VALUE:` or `default:`; the label stands alone as a statement.
    fn parse_case_statement(&mut self) -> RawNode {
        let is_default = self.at_keyword("default");
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        if !is_default {
            match self.parse_binary(0) {
                Ok(value) => children.push(value.with_field(FIELD_VALUE)),
                Err(consumed) if consumed.is_empty() => {}
                Err(consumed) => {
                    let error = self.error_node(consumed);
                    children.push(error);
                }
            }
        }
        if self.at(TokenKind::Colon) {
            children.extend(self.bump_leaf());
        }
        self.node(CASE_STATEMENT, children)
    }

    fn parse_return_statement(&mut self) -> RawNode {
        let mut children: Vec<RawNode> = self.bump_keyword().into_iter().collect();
        let has_value = match self.peek() {
            Some(tok) => {
                !tok.newline_before
                    && !matches!(tok.kind, TokenKind::Semicolon | TokenKind::RBrace)
            }
            None => false,
        };
        if has_value {
            match self.parse_expression() {
                Ok(value) => children.push(value),
                Err(consumed) if consumed.is_empty() => {}
                Err(consumed) => {
                    let error = self.error_node(consumed);
                    children.push(error);
                }
            }
        }
        self.node(RETURN_STATEMENT, children)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) -> Parsed {
        match self.nested(Self::parse_assignment) {
            Some(parsed) => parsed,
            None => Err(self.skip_nested_region()),
        }
    }

    fn parse_assignment(&mut self) -> Parsed {
        let left = self.parse_binary(0)?;
        if !self.at(TokenKind::Assign) {
            return Ok(left);
        }

        let mut children = vec![unwrap_expression(left).with_field(FIELD_LEFT)];
        children.extend(self.bump_leaf());
        match self.parse_expression() {
            Ok(right) => children.push(right.with_field(FIELD_RIGHT)),
            Err(consumed) if consumed.is_empty() => {}
            Err(consumed) => {
                let error = self.error_node(consumed).with_field(FIELD_RIGHT);
                children.push(error);
            }
        }
        let assignment = self.node(ASSIGNMENT_EXPRESSION, children);
        Ok(self.expression(assignment))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Parsed {
        let mut left = self.parse_unary()?;
        loop {
            let Some(precedence) = self.peek_kind().and_then(binary_precedence) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let Some(operator) = self.bump_leaf() else {
                break;
            };
            match self.parse_binary(precedence + 1) {
                Ok(right) => {
                    let children = vec![
                        left.with_field(FIELD_LEFT),
                        operator.with_field(FIELD_OPERATOR),
                        right.with_field(FIELD_RIGHT),
                    ];
                    let binary = self.node(BINARY_EXPRESSION, children);
                    left = self.expression(binary);
                }
                Err(consumed) => {
                    let mut partial = vec![left, operator];
                    partial.extend(consumed);
                    return Err(partial);
                }
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Parsed {
        let is_operator = match self.peek() {
            Some(tok) => match tok.kind {
                TokenKind::Bang | TokenKind::Minus | TokenKind::Tilde => true,
                TokenKind::Identifier => {
                    self.slice(tok) == "defined"
                        && self.peek_nth(1).is_some_and(|t| t.kind == TokenKind::Dollar)
                }
                _ => false,
            },
            None => false,
        };
        if !is_operator {
            return self.parse_primary();
        }

        let Some(tok) = self.bump() else {
            return Err(Vec::new());
        };
        let operator = if tok.kind == TokenKind::Identifier {
            self.keyword_leaf(tok)
        } else {
            self.token_leaf(tok)
        };
        let argument = match self.nested(Self::parse_unary) {
            Some(parsed) => parsed,
            None => Err(self.skip_nested_region()),
        };
        match argument {
            Ok(argument) => {
                let children = vec![
                    operator.with_field(FIELD_OPERATOR),
                    argument.with_field(FIELD_ARGUMENT),
                ];
                let unary = self.node(UNARY_EXPRESSION, children);
                Ok(self.expression(unary))
            }
            Err(consumed) => {
                let mut partial = vec![operator];
                partial.extend(consumed);
                Err(partial)
            }
        }
    }

    fn parse_primary(&mut self) -> Parsed {
        let Some(tok) = self.peek() else {
            return Err(Vec::new());
        };
        match tok.kind {
            TokenKind::LParen => {
                let parenthesized = self.parse_parenthesized()?;
                Ok(self.expression(parenthesized))
            }
            TokenKind::Dollar => self.parse_pseudo_variable(),
            TokenKind::String | TokenKind::Number => {
                self.pos += 1;
                let leaf = self.token_leaf(tok);
                Ok(self.expression(leaf))
            }
            TokenKind::Identifier => {
                self.pos += 1;
                let identifier = self.token_leaf(tok);
                if self.at(TokenKind::LParen) {
                    self.parse_call(identifier)
                } else {
                    Ok(self.expression(identifier))
                }
            }
            _ => Err(Vec::new()),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<RawNode, Vec<RawNode>> {
        let mut children: Vec<RawNode> = self.bump_leaf().into_iter().collect();
        match self.parse_expression() {
            Ok(inner) => children.push(inner),
            Err(consumed) => {
                children.extend(consumed);
                return Err(children);
            }
        }
        if !self.at(TokenKind::RParen) {
            return Err(children);
        }
        children.extend(self.bump_leaf());
        Ok(self.node(PARENTHESIZED_EXPRESSION, children))
    }

    fn parse_call(&mut self, name: RawNode) -> Parsed {
        let function = self.expression(name).with_field(FIELD_FUNCTION);
        match self.parse_argument_list() {
            Ok(arguments) => {
                let children = vec![function, arguments.with_field(FIELD_ARGUMENTS)];
                let call = self.node(CALL_EXPRESSION, children);
                Ok(self.expression(call))
            }
            Err(consumed) => {
                let mut partial = vec![function];
                partial.extend(consumed);
                Err(partial)
            }
        }
    }

    fn parse_argument_list(&mut self) -> Result<RawNode, Vec<RawNode>> {
        let mut children: Vec<RawNode> = self.bump_leaf().into_iter().collect();
        if self.at(TokenKind::RParen) {
            children.extend(self.bump_leaf());
            return Ok(self.node(ARGUMENT_LIST, children));
        }

        loop {
            match self.parse_expression() {
                Ok(argument) => children.push(argument),
                Err(mut consumed) => {
                    while let Some(tok) = self.peek() {
                        if matches!(
                            tok.kind,
                            TokenKind::Comma
                                | TokenKind::RParen
                                | TokenKind::Semicolon
                                | TokenKind::LBrace
                                | TokenKind::RBrace
                        ) || tok.newline_before
                        {
                            break;
                        }
                        self.pos += 1;
                        consumed.push(self.token_leaf(tok));
                    }
                    if consumed.is_empty() && !self.at(TokenKind::Comma) && !self.at(TokenKind::RParen) {
                        return Err(children);
                    }
                    if !consumed.is_empty() {
                        let error = self.error_node(consumed);
                        children.push(error);
                    }
                }
            }

            match self.peek_kind() {
                Some(TokenKind::Comma) => children.extend(self.bump_leaf()),
                Some(TokenKind::RParen) => {
                    children.extend(self.bump_leaf());
                    return Ok(self.node(ARGUMENT_LIST, children));
                }
                _ => return Err(children),
            }
        }
    }

    // ========================================================================
    // Pseudo-variables
    // ========================================================================

    /// `$ru`, `$avp(name)`, `$var(name)`, `$dlg_var(name)`, `$hdr(From)`,
    /// `$(ru{uri.user})`.
    fn parse_pseudo_variable(&mut self) -> Parsed {
        let Some(dollar) = self.bump() else {
            return Err(Vec::new());
        };

        if self.adjacent(dollar.end, TokenKind::LParen) {
            return self.parse_pvar_expression(dollar);
        }

        let dollar_leaf = RawNode::leaf("$", false, dollar.start, dollar.end);
        if !self.adjacent(dollar.end, TokenKind::Identifier) {
            return Err(vec![dollar_leaf]);
        }
        match self.parse_pseudo_content() {
            Ok(content) => {
                let pvar = self.node(PSEUDO_VARIABLE, vec![dollar_leaf, content]);
                Ok(self.expression(pvar))
            }
            Err(consumed) => {
                let mut partial = vec![dollar_leaf];
                partial.extend(consumed);
                Err(partial)
            }
        }
    }

    fn parse_pvar_expression(&mut self, dollar: Token) -> Parsed {
        let Some(open) = self.bump() else {
            return Err(Vec::new());
        };
        let mut children = vec![RawNode::leaf("$(", false, dollar.start, open.end)];
        if !self.adjacent(open.end, TokenKind::Identifier) {
            return Err(children);
        }
        match self.parse_pseudo_content() {
            Ok(content) => children.push(content),
            Err(consumed) => {
                children.extend(consumed);
                return Err(children);
            }
        }

        while self.at(TokenKind::LBrace) || self.at(TokenKind::LBracket) {
            let (open_kind, close_kind, kind) = if self.at(TokenKind::LBrace) {
                (TokenKind::LBrace, TokenKind::RBrace, TRANSFORMATION)
            } else {
                (TokenKind::LBracket, TokenKind::RBracket, PVAR_INDEX)
            };
            match self.parse_balanced(open_kind, close_kind) {
                Some(tokens) => {
                    let node = self.node(kind, tokens);
                    children.push(node);
                }
                None => return Err(children),
            }
        }

        if !self.at(TokenKind::RParen) {
            return Err(children);
        }
        children.extend(self.bump_leaf());
        let pvar = self.node(PVAR_EXPRESSION, children);
        Ok(self.expression(pvar))
    }

    fn parse_pseudo_content(&mut self) -> Result<RawNode, Vec<RawNode>> {
        let Some(class) = self.bump() else {
            return Err(Vec::new());
        };
        let class_name = self.slice(class);

        if !self.adjacent(class.end, TokenKind::LParen) {
            let identifier = self.token_leaf(class);
            return Ok(self.node(PSEUDO_CONTENT, vec![identifier]));
        }

        let scoped_kind = match class_name {
            "avp" => Some(AVP_VAR),
            "var" => Some(SCRIPT_VAR),
            "dlg_var" => Some(DLG_VAR),
            _ => None,
        };

        let Some(mut tokens) = self.parse_balanced(TokenKind::LParen, TokenKind::RParen) else {
            return Err(vec![self.token_leaf(class)]);
        };
        if tokens.len() < 3 {
            let mut consumed = vec![self.token_leaf(class)];
            consumed.extend(tokens);
            return Err(consumed);
        }

        let close = tokens.pop();
        let open = tokens.remove(0);
        let inner = match scoped_kind {
            Some(kind) => {
                let name = self.node(VARIABLE_NAME, tokens).with_field(FIELD_NAME);
                let mut children = vec![self.keyword_leaf(class), open, name];
                children.extend(close);
                self.node(kind, children)
            }
            None => {
                let argument = self.node(PVAR_ARGUMENT, tokens).with_field(FIELD_ARGUMENT);
                let mut children = vec![self.token_leaf(class).with_field(FIELD_CLASS), open, argument];
                children.extend(close);
                self.node(PVAR_CALL, children)
            }
        };

        let mut content = vec![inner];
        if self.adjacent(content[0].end, TokenKind::LBracket) {
            if let Some(index) = self.parse_balanced(TokenKind::LBracket, TokenKind::RBracket) {
                let index = self.node(PVAR_INDEX, index);
                content.push(index);
            }
        }
        Ok(self.node(PSEUDO_CONTENT, content))
    }

    /// Consumes an `open ... close` group on one line, nesting included.
    ///
    /// Returns the leaves including both delimiters, or `None` (after
    /// consuming nothing) if the group is not closed.
    fn parse_balanced(&mut self, open: TokenKind, close: TokenKind) -> Option<Vec<RawNode>> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut leaves = Vec::new();
        while let Some(tok) = self.peek() {
            if !leaves.is_empty() && (tok.newline_before || tok.kind == TokenKind::Semicolon) {
                break;
            }
            self.pos += 1;
            leaves.push(self.token_leaf(tok));
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(leaves);
                }
            }
        }
        // Unclosed: rewind, keeping any extras already buffered.
        self.pos = start;
        let limit = self.tokens.get(start).map_or(usize::MAX, |t| t.start);
        self.pending.retain(|t| t.start < limit);
        None
    }
}

/// Operator precedence, higher binds tighter.
fn binary_precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match kind {
        OrOr => 1,
        AndAnd => 2,
        Pipe => 3,
        Caret => 4,
        Amp => 5,
        Eq | NotEq | RegexMatch | RegexNotMatch => 6,
        Lt | Gt | LtEq | GtEq => 7,
        Plus | Minus => 8,
        Star | Slash | Percent => 9,
        _ => return None,
    })
}

/// Strips the `expression` wrapper from an assignment target.
fn unwrap_expression(node: RawNode) -> RawNode {
    if node.kind == EXPRESSION && node.children.len() == 1 {
        node.children.into_iter().next().unwrap_or_else(|| RawNode::leaf(ERROR, true, 0, 0))
    } else {
        node
    }
}
