//! Tokenizer for Kamailio routing scripts
//!
//! Produces every token of the input, trivia included. Comments and
//! preprocessor directives are kept as tokens so the parser can attach them
//! to the tree as extras.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    /// A string literal that reached end of line without its closing quote.
    UnterminatedString,
    /// `/* ... */` or `// ...`
    Comment,
    /// `# ...`
    DeprecatedComment,
    /// `#!define`, `!!ifdef`, ...
    Directive,
    Dollar,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Dot,
    Assign,
    Eq,
    NotEq,
    RegexMatch,
    RegexNotMatch,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Amp,
    AndAnd,
    Pipe,
    OrOr,
    Caret,
    Tilde,
    Arrow,
    /// Any character the language has no use for.
    Unknown,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Comment | TokenKind::DeprecatedComment | TokenKind::Directive
        )
    }

    /// Fixed spelling of punctuation tokens.
    pub fn punctuation(self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            Dollar => "$",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semicolon => ";",
            Comma => ",",
            Colon => ":",
            Dot => ".",
            Assign => "=",
            Eq => "==",
            NotEq => "!=",
            RegexMatch => "=~",
            RegexNotMatch => "!~",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Bang => "!",
            Amp => "&",
            AndAnd => "&&",
            Pipe => "|",
            OrOr => "||",
            Caret => "^",
            Tilde => "~",
            Arrow => "=>",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line break separates this token from the previous significant one.
    pub newline_before: bool,
}

/// Splits `text` into tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    newline_pending: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            newline_pending: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b'\n' => {
                    self.newline_pending = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' | 0x0c => self.pos += 1,
                _ => self.lex_token(),
            }
        }
        self.tokens
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at_line_start(&self) -> bool {
        self.bytes[..self.pos]
            .iter()
            .rev()
            .take_while(|&&b| b != b'\n')
            .all(|&b| b == b' ' || b == b'\t')
    }

    fn emit(&mut self, kind: TokenKind, start: usize) {
        let newline_before = self.newline_pending;
        if kind.is_trivia() {
            if kind == TokenKind::Comment && self.text[start..self.pos].contains('\n') {
                self.newline_pending = true;
            }
        } else {
            self.newline_pending = false;
        }
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
            newline_before,
        });
    }

    fn skip_to_line_end(&mut self) {
        while let Some(b) = self.peek_at(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn lex_token(&mut self) {
        let start = self.pos;
        let b = self.bytes[self.pos];

        match (b, self.peek_at(1)) {
            (b'/', Some(b'*')) => {
                self.pos += 2;
                match self.text[self.pos..].find("*/") {
                    Some(offset) => self.pos += offset + 2,
                    None => self.pos = self.bytes.len(),
                }
                self.emit(TokenKind::Comment, start);
            }
            (b'/', Some(b'/')) => {
                self.skip_to_line_end();
                self.emit(TokenKind::Comment, start);
            }
            (b'#', Some(b'!')) => {
                self.lex_directive();
                self.emit(TokenKind::Directive, start);
            }
            (b'!', Some(b'!')) if self.at_line_start() => {
                self.lex_directive();
                self.emit(TokenKind::Directive, start);
            }
            (b'#', _) => {
                self.skip_to_line_end();
                self.emit(TokenKind::DeprecatedComment, start);
            }
            (b'"', _) | (b'\'', _) => {
                let kind = self.lex_string(b);
                self.emit(kind, start);
            }
            (b'0'..=b'9', _) => {
                self.lex_number();
                self.emit(TokenKind::Number, start);
            }
            (b'a'..=b'z' | b'A'..=b'Z' | b'_', _) => {
                while matches!(self.peek_at(0), Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')) {
                    self.pos += 1;
                }
                self.emit(TokenKind::Identifier, start);
            }
            _ => {
                let kind = self.lex_punctuation();
                self.emit(kind, start);
            }
        }
    }

    /// Directives run to end of line, continuing over trailing backslashes.
    fn lex_directive(&mut self) {
        loop {
            self.skip_to_line_end();
            let line = &self.text[..self.pos];
            if line.trim_end_matches('\r').ends_with('\\') && self.pos < self.bytes.len() {
                self.pos += 1;
                continue;
            }
            break;
        }
    }

    fn lex_string(&mut self, quote: u8) -> TokenKind {
        self.pos += 1;
        while let Some(b) = self.peek_at(0) {
            match b {
                b'\\' => {
                    self.pos += 1;
                    if matches!(self.peek_at(0), Some(c) if c != b'\n') {
                        self.pos += 1;
                    }
                }
                b'\n' => return TokenKind::UnterminatedString,
                _ if b == quote => {
                    self.pos += 1;
                    return TokenKind::String;
                }
                _ => self.pos += 1,
            }
        }
        TokenKind::UnterminatedString
    }

    fn lex_number(&mut self) {
        if self.bytes[self.pos] == b'0' && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            while matches!(self.peek_at(0), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return;
        }
        while matches!(self.peek_at(0), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn lex_punctuation(&mut self) -> TokenKind {
        use TokenKind::*;
        let two = (self.bytes[self.pos], self.peek_at(1));
        let (kind, len) = match two {
            (b'=', Some(b'=')) => (Eq, 2),
            (b'=', Some(b'~')) => (RegexMatch, 2),
            (b'=', Some(b'>')) => (Arrow, 2),
            (b'!', Some(b'=')) => (NotEq, 2),
            (b'!', Some(b'~')) => (RegexNotMatch, 2),
            (b'<', Some(b'=')) => (LtEq, 2),
            (b'>', Some(b'=')) => (GtEq, 2),
            (b'&', Some(b'&')) => (AndAnd, 2),
            (b'|', Some(b'|')) => (OrOr, 2),
            (b'$', _) => (Dollar, 1),
            (b'(', _) => (LParen, 1),
            (b')', _) => (RParen, 1),
            (b'{', _) => (LBrace, 1),
            (b'}', _) => (RBrace, 1),
            (b'[', _) => (LBracket, 1),
            (b']', _) => (RBracket, 1),
            (b';', _) => (Semicolon, 1),
            (b',', _) => (Comma, 1),
            (b':', _) => (Colon, 1),
            (b'.', _) => (Dot, 1),
            (b'=', _) => (Assign, 1),
            (b'<', _) => (Lt, 1),
            (b'>', _) => (Gt, 1),
            (b'+', _) => (Plus, 1),
            (b'-', _) => (Minus, 1),
            (b'*', _) => (Star, 1),
            (b'/', _) => (Slash, 1),
            (b'%', _) => (Percent, 1),
            (b'!', _) => (Bang, 1),
            (b'&', _) => (Amp, 1),
            (b'|', _) => (Pipe, 1),
            (b'^', _) => (Caret, 1),
            (b'~', _) => (Tilde, 1),
            _ => {
                let width = self.text[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                (Unknown, width)
            }
        };
        self.pos += len;
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_comment_forms() {
        assert_eq!(
            kinds("/* a */ // b\n# c\n#!define X\n"),
            vec![
                TokenKind::Comment,
                TokenKind::Comment,
                TokenKind::DeprecatedComment,
                TokenKind::Directive
            ]
        );
    }

    #[test]
    fn test_pseudo_variable_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("$avp(foo) = \"bar\";"),
            vec![Dollar, Identifier, LParen, Identifier, RParen, Assign, String, Semicolon]
        );
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        use TokenKind::*;
        assert_eq!(
            kinds("== =~ != !~ <= >= && || => ="),
            vec![Eq, RegexMatch, NotEq, RegexNotMatch, LtEq, GtEq, AndAnd, OrOr, Arrow, Assign]
        );
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end() {
        let tokens = tokenize("\"abc\nx");
        assert_eq!(tokens[0].kind, TokenKind::UnterminatedString);
        assert_eq!(tokens[0].end, 4);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert!(tokens[1].newline_before);
    }

    #[test]
    fn test_newline_tracking_ignores_same_line_comments() {
        let tokens = tokenize("a /* c */ b\nc");
        assert!(!tokens[2].newline_before);
        assert!(tokens[3].newline_before);
    }

    #[test]
    fn test_unknown_characters_are_single_tokens() {
        let tokens = tokenize("?é");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Unknown));
        assert_eq!(tokens[1].end, 3);
    }
}
