use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Leading spaces of a line holding a node. Emitted for every such line,
    /// possibly empty.
    Indent,
    /// Unquoted text running up to the next `:` or the end of the line.
    Text,
    /// Double quoted or `@"` verbatim string. The lexeme is the decoded text.
    String,
    Colon,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
    line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
            line_start: true,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    /// The character after the peeked one.
    fn peek_second(&mut self) -> Option<char> {
        self.peek();
        self.chars.clone().next().map(|(_, ch)| ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    fn skip_line(&mut self) {
        while let Some((_, ch)) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn block_comment(&mut self, start: usize) -> Result<(), Diagnostic> {
        self.bump();
        self.bump();
        while let Some((_, ch)) = self.bump() {
            if ch == '*' && self.match_next('/') {
                return Ok(());
            }
        }
        Err(
            Diagnostic::new(DiagnosticKind::Lexer, "unterminated block comment")
                .with_span(SourceSpan::new(start, self.current)),
        )
    }

    /// Consumes the indentation of a line. Returns `None` for lines holding
    /// nothing but whitespace or comments, which produce no tokens.
    fn indentation(&mut self) -> Result<Option<Token>, Diagnostic> {
        let start = self.current;
        let mut end = start;
        loop {
            match self.peek() {
                Some((idx, ' ')) => {
                    self.bump();
                    end = idx + 1;
                }
                Some((idx, '\t')) => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Lexer,
                        "tabs are not allowed in indentation",
                    )
                    .with_span(SourceSpan::new(idx, idx + 1)));
                }
                Some((_, '\r')) => {
                    self.bump();
                }
                Some((_, '\n')) | None => return Ok(None),
                Some((idx, '/')) => match self.peek_second() {
                    Some('/') => {
                        self.skip_line();
                        return Ok(None);
                    }
                    Some('*') => {
                        self.block_comment(idx)?;
                        self.trailing_blank(idx)?;
                        return Ok(None);
                    }
                    _ => break,
                },
                Some(_) => break,
            }
        }
        Ok(Some(Token {
            kind: TokenKind::Indent,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }))
    }

    fn trailing_blank(&mut self, comment_start: usize) -> Result<(), Diagnostic> {
        while let Some((idx, ch)) = self.peek() {
            match ch {
                '\n' => break,
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                _ => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Lexer,
                        "unexpected content after block comment",
                    )
                    .with_span(SourceSpan::new(comment_start, idx + ch.len_utf8())));
                }
            }
        }
        Ok(())
    }

    fn text(&mut self, start: usize) -> Token {
        let mut end = self.current;
        while let Some((idx, ch)) = self.peek() {
            if matches!(ch, ':' | '\n' | '\r') {
                break;
            }
            self.bump();
            end = idx + ch.len_utf8();
        }
        Token {
            kind: TokenKind::Text,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }
    }

    fn string_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        let mut end = self.current;
        let mut value = String::new();
        while let Some((idx, ch)) = self.bump() {
            end = idx + ch.len_utf8();
            match ch {
                '"' => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        span: SourceSpan::new(start, end),
                    });
                }
                '\\' => {
                    if let Some((_, esc)) = self.bump() {
                        end = idx + 1 + esc.len_utf8();
                        match esc {
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            '"' => value.push('"'),
                            '\\' => value.push('\\'),
                            other => value.push(other),
                        }
                    } else {
                        break;
                    }
                }
                _ => value.push(ch),
            }
        }
        Err(
            Diagnostic::new(DiagnosticKind::Lexer, "unterminated string literal")
                .with_span(SourceSpan::new(start, end)),
        )
    }

    /// `@"..."` strings keep backslashes and line breaks as written; `""`
    /// stands for a single quote.
    fn verbatim_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.bump();
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            if ch == '"' {
                if self.match_next('"') {
                    value.push('"');
                    continue;
                }
                return Ok(Token {
                    kind: TokenKind::String,
                    lexeme: value,
                    span: SourceSpan::new(start, self.current),
                });
            }
            value.push(ch);
        }
        Err(
            Diagnostic::new(DiagnosticKind::Lexer, "unterminated verbatim string")
                .with_span(SourceSpan::new(start, self.current)),
        )
    }

    fn simple_token(&self, start: usize, kind: TokenKind) -> Token {
        let end = self.current;
        Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan::new(start, end),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            if self.line_start {
                self.line_start = false;
                if let Some(indent) = self.indentation()? {
                    tokens.push(indent);
                }
            }
            let Some((start, ch)) = self.bump() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    span: SourceSpan::new(self.current, self.current),
                });
                break;
            };

            let token = match ch {
                '\n' => {
                    self.line_start = true;
                    self.simple_token(start, TokenKind::Newline)
                }
                '\r' => continue,
                ':' => self.simple_token(start, TokenKind::Colon),
                '"' => self.string_literal(start)?,
                '@' if self.peek().is_some_and(|(_, next)| next == '"') => {
                    self.verbatim_literal(start)?
                }
                _ => self.text(start),
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}
