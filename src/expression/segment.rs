use crate::{
    diagnostics::{HyperlambdaError, Result},
    node::Node,
    value::ValueType,
};

use super::RawSegment;

type Stream<'a> = Box<dyn Iterator<Item = Node> + 'a>;

/// One step of a path expression.
///
/// | text | segment |
/// |---|---|
/// | `..` | [`Segment::Parent`] |
/// | `.` or an empty interior segment | [`Segment::This`] |
/// | empty first segment (path starts with `/`) | [`Segment::Root`] |
/// | `*` / `**` | [`Segment::Children`] / [`Segment::Descendants`] |
/// | `#` | [`Segment::Reference`] |
/// | `-` / `+` | [`Segment::PreviousSibling`] / [`Segment::NextSibling`] |
/// | `@name` | [`Segment::Upwards`] |
/// | `=text` | [`Segment::ValueEquals`] |
/// | `%type` | [`Segment::OfType`] |
/// | `[n]` / `[start,count]` | [`Segment::Range`] |
/// | `\name`, `"name"`, anything else | [`Segment::Name`] |
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Parent,
    This,
    Root,
    Children,
    Descendants,
    Reference,
    PreviousSibling,
    NextSibling,
    /// Closest older sibling, ancestor, or older sibling of an ancestor with
    /// the given name.
    Upwards(String),
    ValueEquals(String),
    OfType(ValueType),
    Range { start: usize, count: usize },
    Name(String),
}

impl Segment {
    pub(crate) fn parse(source: &str, raw: &RawSegment, index: usize) -> Result<Self> {
        if raw.quoted {
            return Ok(Segment::Name(raw.text.clone()));
        }
        let text = raw.text.as_str();
        let segment = match text {
            "" if index == 0 => Segment::Root,
            "" | "." => Segment::This,
            ".." => Segment::Parent,
            "*" => Segment::Children,
            "**" => Segment::Descendants,
            "#" => Segment::Reference,
            "-" => Segment::PreviousSibling,
            "+" => Segment::NextSibling,
            _ => {
                if let Some(filter) = text.strip_prefix('[') {
                    parse_range(source, filter)?
                } else if let Some(expected) = text.strip_prefix('=') {
                    Segment::ValueEquals(expected.to_string())
                } else if let Some(name) = text.strip_prefix('@') {
                    if name.is_empty() {
                        return Err(HyperlambdaError::malformed(
                            source,
                            "`@` must be followed by a node name",
                        ));
                    }
                    Segment::Upwards(name.to_string())
                } else if let Some(type_name) = text.strip_prefix('%') {
                    let kind = ValueType::from_name(type_name).ok_or_else(|| {
                        HyperlambdaError::malformed(
                            source,
                            format!("unknown type filter `%{type_name}`"),
                        )
                    })?;
                    Segment::OfType(kind)
                } else if let Some(name) = text.strip_prefix('\\') {
                    Segment::Name(name.to_string())
                } else {
                    Segment::Name(text.to_string())
                }
            }
        };
        Ok(segment)
    }

    pub(crate) fn apply<'a>(&'a self, input: Stream<'a>) -> Stream<'a> {
        match self {
            Segment::Parent => Box::new(input.filter_map(|node| node.parent())),
            Segment::This => input,
            Segment::Root => Box::new(input.map(|node| node.root())),
            Segment::Children => Box::new(input.flat_map(|node| node.children())),
            Segment::Descendants => Box::new(input.flat_map(|node| node.descendants())),
            Segment::Reference => Box::new(input.filter_map(|node| {
                node.value()
                    .and_then(|value| value.as_node().cloned())
            })),
            Segment::PreviousSibling => Box::new(input.filter_map(|node| node.previous_sibling())),
            Segment::NextSibling => Box::new(input.filter_map(|node| node.next_sibling())),
            Segment::Upwards(name) => Box::new(input.filter_map(move |node| upwards(&node, name))),
            Segment::ValueEquals(expected) => Box::new(input.filter(move |node| {
                node.value()
                    .map(|value| value.to_string() == *expected)
                    .unwrap_or(false)
            })),
            Segment::OfType(kind) => {
                Box::new(input.filter(move |node| ValueType::of(node.value().as_ref()) == *kind))
            }
            Segment::Range { start, count } => Box::new(input.skip(*start).take(*count)),
            Segment::Name(name) => Box::new(input.filter(move |node| node.has_name(name))),
        }
    }
}

fn parse_range(source: &str, filter: &str) -> Result<Segment> {
    let Some(body) = filter.strip_suffix(']') else {
        return Err(HyperlambdaError::malformed(source, "unterminated `[` filter"));
    };
    let bounds: Vec<&str> = body.split(',').map(str::trim).collect();
    let parse = |text: &str| {
        text.parse::<usize>().map_err(|_| {
            HyperlambdaError::malformed(
                source,
                format!("range bound `{text}` is not a non-negative integer"),
            )
        })
    };
    match bounds.as_slice() {
        [index] => Ok(Segment::Range {
            start: parse(index)?,
            count: 1,
        }),
        [start, count] => Ok(Segment::Range {
            start: parse(start)?,
            count: parse(count)?,
        }),
        _ => Err(HyperlambdaError::malformed(
            source,
            "range filter takes `[index]` or `[start,count]`",
        )),
    }
}

fn upwards(node: &Node, name: &str) -> Option<Node> {
    let mut current = node.clone();
    loop {
        let mut sibling = current.previous_sibling();
        while let Some(candidate) = sibling {
            if candidate.has_name(name) {
                return Some(candidate);
            }
            sibling = candidate.previous_sibling();
        }
        current = current.parent()?;
        if current.has_name(name) {
            return Some(current);
        }
    }
}
