use std::fmt;

use thiserror::Error;

/// Represents a byte span within a Hyperlambda source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
}

/// Source-positioned diagnostic produced while turning text into a tree.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        if !self.notes.is_empty() {
            writeln!(f)?;
            for note in &self.notes {
                writeln!(f, "  note: {note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Fieldless view of [`HyperlambdaError`], convenient for matching in callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedExpression,
    Shape,
    Arity,
    MissingLambda,
    TooManySources,
    UnknownSlot,
    UnknownArgument,
    DuplicateSlotName,
    RecursionLimit,
    Diagnostic,
    Io,
}

/// Unified error type for the engine and its host tooling.
#[derive(Debug, Error)]
pub enum HyperlambdaError {
    #[error("malformed expression `{expression}`: {reason}")]
    MalformedExpression { expression: String, reason: String },
    #[error("[{slot}] {message}")]
    Shape { slot: String, message: String },
    #[error("[{slot}] expected {expected} but received {received}")]
    Arity {
        slot: String,
        expected: String,
        received: usize,
    },
    #[error("[{slot}] requires exactly one [.lambda] child")]
    MissingLambda { slot: String },
    #[error("too many sources for [{slot}]")]
    TooManySources { slot: String },
    #[error("no slot named [{name}] exists")]
    UnknownSlot { name: String },
    #[error("slot [{slot}] does not know how to handle argument [{argument}]")]
    UnknownArgument { slot: String, argument: String },
    #[error("a native slot named [{name}] is already registered")]
    DuplicateSlotName { name: String },
    #[error("evaluation nested deeper than {limit} levels")]
    RecursionLimit { limit: usize },
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HyperlambdaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedExpression { .. } => ErrorKind::MalformedExpression,
            Self::Shape { .. } => ErrorKind::Shape,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::MissingLambda { .. } => ErrorKind::MissingLambda,
            Self::TooManySources { .. } => ErrorKind::TooManySources,
            Self::UnknownSlot { .. } => ErrorKind::UnknownSlot,
            Self::UnknownArgument { .. } => ErrorKind::UnknownArgument,
            Self::DuplicateSlotName { .. } => ErrorKind::DuplicateSlotName,
            Self::RecursionLimit { .. } => ErrorKind::RecursionLimit,
            Self::Diagnostic(_) => ErrorKind::Diagnostic,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn shape(slot: &str, message: impl Into<String>) -> Self {
        Self::Shape {
            slot: slot.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HyperlambdaError>;
