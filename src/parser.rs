//! Hyperlambda text to [`Node`] trees.
//!
//! Every line holds one node, `name`, `name:value` or `name:type:value`,
//! indented by three spaces per level below its parent. Values without a
//! type are strings. The returned root is an unnamed node whose children are
//! the top-level nodes of the document.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    expression::Expression,
    lexer::{Lexer, Token, TokenKind},
    node::Node,
    value::{Value, ValueType},
};

pub const INDENT_WIDTH: usize = 3;

pub fn parse(source: &str) -> Result<Node, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(source, tokens).parse_document()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    current: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    fn parse_document(&mut self) -> Result<Node, Diagnostic> {
        let root = Node::new("");
        let mut open = vec![root.clone()];
        loop {
            while self.matches(TokenKind::Newline) {}
            if self.is_at_end() {
                break;
            }
            let indent = self.consume(TokenKind::Indent, "expected the start of a node")?;
            let depth = self.depth(&indent, open.len())?;
            let node = self.parse_node()?;
            open.truncate(depth + 1);
            open[depth].add(node.clone());
            open.push(node);
        }
        Ok(root)
    }

    fn depth(&self, indent: &Token, open: usize) -> Result<usize, Diagnostic> {
        let width = indent.lexeme.len();
        if width % INDENT_WIDTH != 0 {
            return Err(self
                .error(indent, "indentation must be a multiple of three spaces")
                .with_note(format!("found {width} spaces")));
        }
        let depth = width / INDENT_WIDTH;
        if depth >= open {
            return Err(self.error(indent, "node is indented more than one level below its parent"));
        }
        Ok(depth)
    }

    fn parse_node(&mut self) -> Result<Node, Diagnostic> {
        let name = match self.peek().map(|token| token.kind.clone()) {
            Some(TokenKind::Text | TokenKind::String) => self.advance().lexeme,
            Some(TokenKind::Colon) => String::new(),
            _ => return Err(self.error_here("expected a node name")),
        };
        if !self.matches(TokenKind::Colon) {
            self.end_of_line()?;
            return Ok(Node::new(name));
        }
        let value = self.parse_value()?;
        Ok(Node::with_value(name, value))
    }

    /// Everything after the first colon of a line.
    fn parse_value(&mut self) -> Result<Value, Diagnostic> {
        let value_start = self.previous().span.end;
        let first = self.peek().cloned();
        let Some(first) = first else {
            return Err(self.error_eof("unexpected end of input"));
        };
        match first.kind {
            TokenKind::Newline | TokenKind::Eof => return Ok(Value::String(String::new())),
            TokenKind::Colon => return Err(self.error(&first, "type name must not be empty")),
            _ => {}
        }

        let typed = self
            .tokens
            .get(self.current + 1)
            .is_some_and(|token| token.kind == TokenKind::Colon);
        if typed {
            self.advance();
            let colon = self.advance();
            let type_name = first.lexeme.trim();
            let kind = ValueType::from_name(type_name)
                .ok_or_else(|| self.error(&first, &format!("unknown type `{type_name}`")))?;
            let (text, span) = self.rest_of_line(colon.span.end)?;
            return convert(kind, &text, span);
        }

        let (text, _) = self.rest_of_line(value_start)?;
        Ok(Value::String(text))
    }

    /// Text of the remaining line, either a lone quoted string or the raw
    /// source up to the line break.
    fn rest_of_line(&mut self, start: usize) -> Result<(String, SourceSpan), Diagnostic> {
        if let Some(token) = self.peek().cloned() {
            if token.kind == TokenKind::String && self.quoted_until_line_end() {
                self.advance();
                self.end_of_line()?;
                return Ok((token.lexeme, token.span));
            }
        }
        while !self.check(TokenKind::Newline) && !self.is_at_end() {
            self.advance();
        }
        let end = self.peek().map_or(self.source.len(), |token| token.span.start);
        let text = self.source[start..end].trim_end_matches('\r').to_string();
        Ok((text, SourceSpan::new(start, end)))
    }

    fn quoted_until_line_end(&self) -> bool {
        let mut rest = self.tokens[self.current + 1..].iter();
        loop {
            match rest.next() {
                Some(token) if token.kind == TokenKind::Text && token.lexeme.trim().is_empty() => {}
                Some(token) => return matches!(token.kind, TokenKind::Newline | TokenKind::Eof),
                None => return true,
            }
        }
    }

    fn end_of_line(&mut self) -> Result<(), Diagnostic> {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Newline | TokenKind::Eof => return Ok(()),
                TokenKind::Text if token.lexeme.trim().is_empty() => {
                    self.advance();
                }
                _ => return Err(self.error(token, "unexpected content after node")),
            }
        }
        Ok(())
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self
                .peek()
                .map(|tok| self.error(tok, message))
                .unwrap_or_else(|| self.error_eof(message)))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        if let Some(token) = self.peek() {
            token.kind == kind
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eof) | None)
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message.to_string()).with_span(token.span)
    }

    fn error_here(&self, message: &str) -> Diagnostic {
        self.peek()
            .map(|tok| self.error(tok, message))
            .unwrap_or_else(|| self.error_eof(message))
    }

    fn error_eof(&self, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message.to_string())
    }
}

/// Converts the textual form of a typed value.
pub fn convert(kind: ValueType, text: &str, span: SourceSpan) -> Result<Value, Diagnostic> {
    let invalid = |detail: String| {
        Diagnostic::new(
            DiagnosticKind::Parser,
            format!("`{text}` is not a valid {kind}"),
        )
        .with_span(span)
        .with_note(detail)
    };
    let value = match kind {
        ValueType::Null => {
            return Err(Diagnostic::new(
                DiagnosticKind::Parser,
                "`null` cannot be written as a type",
            )
            .with_span(span));
        }
        ValueType::String => Value::String(text.to_string()),
        ValueType::Bool => match text.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid("expected `true` or `false`".to_string())),
        },
        ValueType::Int => Value::Int(
            text.trim()
                .parse()
                .map_err(|err: std::num::ParseIntError| invalid(err.to_string()))?,
        ),
        ValueType::Float => Value::Float(
            text.trim()
                .parse()
                .map_err(|err: std::num::ParseFloatError| invalid(err.to_string()))?,
        ),
        ValueType::Decimal => Value::Decimal(
            Decimal::from_str(text.trim()).map_err(|err| invalid(err.to_string()))?,
        ),
        ValueType::Date => Value::DateTime(
            DateTime::parse_from_rfc3339(text.trim()).map_err(|err| invalid(err.to_string()))?,
        ),
        ValueType::Expression => Value::Expression(
            Expression::parse(text.trim()).map_err(|err| invalid(err.to_string()))?,
        ),
        ValueType::Node => Value::Node(parse(text).map_err(|err| {
            Diagnostic::new(DiagnosticKind::Parser, "invalid embedded node value")
                .with_span(span)
                .with_note(err.to_string())
        })?),
        ValueType::Opaque => {
            return Err(Diagnostic::new(
                DiagnosticKind::Parser,
                "opaque values cannot be written as text",
            )
            .with_span(span));
        }
    };
    Ok(value)
}
