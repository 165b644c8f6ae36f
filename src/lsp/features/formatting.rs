//! Brace-depth re-indentation
//!
//! Every line is indented by the number of `{` still open at its start,
//! minus the `}` it begins with. Braces inside strings and comments do not
//! count, and lines that start inside a multi-line comment are copied as
//! they are. A `{` ending a line gets exactly one space in front of it.

use tracing::debug;

use crate::parsers::kamailio::lexer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingOptions {
    pub insert_spaces: bool,
    pub tab_size: u32,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            insert_spaces: false,
            tab_size: 4,
        }
    }
}

impl FormattingOptions {
    fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size as usize)
        } else {
            "\t".to_string()
        }
    }
}

/// Re-indented `text`, or `None` if its braces do not balance.
pub fn format_text(text: &str, options: FormattingOptions) -> Option<String> {
    let tokens = tokenize(text);
    let unit = options.indent_unit();
    let mut out = String::with_capacity(text.len());
    let mut depth: usize = 0;
    let mut next_token = 0;
    let mut line_start = 0;

    for raw_line in text.split_inclusive('\n') {
        let line_end = line_start + raw_line.len();
        let body = raw_line.trim_end_matches(['\n', '\r']);
        let ending = &raw_line[body.len()..];

        while next_token < tokens.len() && tokens[next_token].end <= line_start {
            next_token += 1;
        }
        let continues_token = tokens
            .get(next_token)
            .is_some_and(|t| t.start < line_start && t.end > line_start);
        let first = next_token;
        while next_token < tokens.len() && tokens[next_token].start < line_end {
            next_token += 1;
        }
        let on_line = &tokens[first..next_token];

        let leading_closes = on_line
            .iter()
            .skip(usize::from(continues_token))
            .take_while(|t| t.kind == TokenKind::RBrace)
            .count();

        if continues_token {
            out.push_str(raw_line);
        } else if body.trim().is_empty() {
            out.push_str(ending);
        } else {
            let level = depth.checked_sub(leading_closes)?;
            for _ in 0..level {
                out.push_str(&unit);
            }
            out.push_str(&normalize_line(body, line_start, on_line));
            out.push_str(ending);
        }

        for token in on_line {
            match token.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.checked_sub(1)?,
                _ => {}
            }
        }
        // A token running past this line is revisited by the next one.
        if on_line.last().is_some_and(|t| t.end > line_end) {
            next_token = next_token.saturating_sub(1);
        }
        line_start = line_end;
    }

    if depth != 0 {
        debug!("Not formatting: {} unclosed braces", depth);
        return None;
    }
    Some(out)
}

/// Trims `body` and puts one space before a trailing `{`.
fn normalize_line(body: &str, offset: usize, tokens: &[Token]) -> String {
    let trimmed = body.trim();
    let Some(last) = tokens.last().filter(|t| t.kind == TokenKind::LBrace) else {
        return trimmed.to_string();
    };
    let brace = last.start - offset;
    let before = body[..brace].trim();
    if before.is_empty() {
        return trimmed.to_string();
    }
    format!("{} {}", before, body[brace..].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn format(text: &str) -> Option<String> {
        format_text(text, FormattingOptions::default())
    }

    #[test]
    fn test_reindents_by_depth() {
        let input = indoc! {r#"
            request_route{
            if (is_method("INVITE"))   {
                  xlog("L_INFO", "{ not a brace }");
            }
              }
        "#};
        let expected = "request_route {\n\tif (is_method(\"INVITE\")) {\n\t\txlog(\"L_INFO\", \"{ not a brace }\");\n\t}\n}\n";
        assert_eq!(format(input).as_deref(), Some(expected));
    }

    #[test]
    fn test_spaces_and_blank_lines() {
        let options = FormattingOptions {
            insert_spaces: true,
            tab_size: 2,
        };
        let input = "route[A] {\n\n\texit;   \n}";
        assert_eq!(
            format_text(input, options).as_deref(),
            Some("route[A] {\n\n  exit;\n}")
        );
    }

    #[test]
    fn test_multiline_comment_kept() {
        let input = "route[A] {\n/* first\n      second { */\nexit;\n}\n";
        assert_eq!(
            format(input).as_deref(),
            Some("route[A] {\n\t/* first\n      second { */\n\texit;\n}\n")
        );
    }

    #[test]
    fn test_unbalanced_is_left_alone() {
        assert_eq!(format("request_route {\n  drop;\n"), None);
        assert_eq!(format("}\nrequest_route {\n}\n"), None);
    }

    #[test]
    fn test_formatting_is_stable() {
        let once = format("route[A]{\nif($rU==\"x\"){\nexit;\n}\n}\n").unwrap();
        assert_eq!(format(&once).as_deref(), Some(once.as_str()));
    }
}
