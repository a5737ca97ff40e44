//! Path expressions addressing nodes of a tree.
//!
//! An expression is a `/`-separated list of segments compiled once by
//! [`Expression::parse`] and evaluated any number of times against a set of
//! context nodes. Evaluation hands out handles into the tree, never copies,
//! and never mutates the tree. See [`Segment`] for the segment grammar.

mod segment;

use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    diagnostics::{HyperlambdaError, Result},
    node::Node,
};

pub use segment::Segment;

/// A compiled, immutable path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: Arc<str>,
    segments: Arc<[Segment]>,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(HyperlambdaError::malformed(source, "expression is empty"));
        }
        let raw = split_segments(source)?;
        let mut segments = Vec::with_capacity(raw.len());
        for (index, segment) in raw.iter().enumerate() {
            segments.push(Segment::parse(source, segment, index)?);
        }
        Ok(Self {
            source: Arc::from(source),
            segments: segments.into(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Binds the expression to its context. Nothing is resolved until the
    /// returned [`Matches`] is iterated.
    pub fn evaluate(&self, roots: &[Node]) -> Matches {
        Matches {
            expression: self.clone(),
            roots: roots.to_vec(),
        }
    }

    /// Convenience for the common single-context case.
    pub fn evaluate_from(&self, context: &Node) -> Matches {
        self.evaluate(std::slice::from_ref(context))
    }
}

impl FromStr for Expression {
    type Err = HyperlambdaError;

    fn from_str(source: &str) -> Result<Self> {
        Expression::parse(source)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Lazy result of evaluating an expression. Every call to [`Matches::iter`]
/// restarts resolution from the context roots, observing the tree as it is
/// at that moment.
pub struct Matches {
    expression: Expression,
    roots: Vec<Node>,
}

impl Matches {
    pub fn iter(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        let mut current: Box<dyn Iterator<Item = Node> + '_> = Box::new(self.roots.iter().cloned());
        for segment in self.expression.segments.iter() {
            current = segment.apply(current);
        }
        current
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.iter().collect()
    }

    pub fn first(&self) -> Option<Node> {
        self.iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl<'a> IntoIterator for &'a Matches {
    type Item = Node;
    type IntoIter = Box<dyn Iterator<Item = Node> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub(crate) struct RawSegment {
    pub text: String,
    pub quoted: bool,
}

fn split_segments(source: &str) -> Result<Vec<RawSegment>> {
    let mut segments = Vec::new();
    let mut chars = source.chars().peekable();
    let mut current = String::new();
    let mut quoted = false;

    loop {
        match chars.next() {
            None => {
                segments.push(RawSegment {
                    text: current,
                    quoted,
                });
                break;
            }
            Some('/') => {
                segments.push(RawSegment {
                    text: std::mem::take(&mut current),
                    quoted,
                });
                quoted = false;
            }
            Some('"') if current.is_empty() && !quoted => {
                loop {
                    match chars.next() {
                        None => {
                            return Err(HyperlambdaError::malformed(
                                source,
                                "unterminated quoted segment",
                            ));
                        }
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => {
                                return Err(HyperlambdaError::malformed(
                                    source,
                                    "dangling escape in quoted segment",
                                ));
                            }
                        },
                        Some(ch) => current.push(ch),
                    }
                }
                quoted = true;
                if !matches!(chars.peek(), None | Some('/')) {
                    return Err(HyperlambdaError::malformed(
                        source,
                        "quoted segment must be followed by `/` or end the expression",
                    ));
                }
            }
            Some(ch) => current.push(ch),
        }
    }

    Ok(segments)
}
