//! [`Node`] trees back to Hyperlambda text, in the form the parser reads.

use crate::{node::Node, parser::INDENT_WIDTH, value::Value};

/// `node` and its descendants, `node` at the outermost level.
pub fn to_hyperlambda(node: &Node) -> String {
    let mut generator = Generator::default();
    generator.write_node(node, 0);
    generator.out
}

/// The descendants of `node`, its children at the outermost level. This is
/// the inverse of [`crate::parser::parse`].
pub fn children_to_hyperlambda(node: &Node) -> String {
    let mut generator = Generator::default();
    generator.active.push(node.clone());
    for child in node.children() {
        generator.write_node(&child, 0);
    }
    generator.out
}

#[derive(Default)]
struct Generator {
    out: String,
    /// Nodes currently being written, used to cut reference cycles.
    active: Vec<Node>,
}

impl Generator {
    fn write_node(&mut self, node: &Node, depth: usize) {
        self.out.push_str(&" ".repeat(depth * INDENT_WIDTH));
        let name = node.name();
        if needs_quotes(&name) || name.starts_with("//") || name.starts_with("/*") {
            self.out.push_str(&quoted(&name));
        } else {
            self.out.push_str(&name);
        }
        if let Some(value) = node.value() {
            self.out.push(':');
            let text = self.value_text(&value);
            self.out.push_str(&text);
        }
        self.out.push('\n');

        self.active.push(node.clone());
        for child in node.children() {
            self.write_node(&child, depth + 1);
        }
        self.active.pop();
    }

    fn value_text(&mut self, value: &Value) -> String {
        match value {
            Value::String(text) if needs_quotes(text) => quoted(text),
            Value::String(text) => text.clone(),
            Value::Opaque(_) => quoted(&value.to_string()),
            Value::Node(target) => {
                if self.is_cyclic(target) {
                    return quoted(&format!("<node {:?}>", target.name()));
                }
                let mut inner = Generator {
                    out: String::new(),
                    active: self.active.clone(),
                };
                inner.active.push(target.clone());
                for child in target.children() {
                    inner.write_node(&child, 0);
                }
                let text = inner.out.trim_end_matches('\n').to_string();
                format!("node:{}", typed_text(&text))
            }
            other => format!("{}:{}", other.type_name(), typed_text(&other.to_string())),
        }
    }

    fn is_cyclic(&self, target: &Node) -> bool {
        self.active
            .iter()
            .any(|node| node.ptr_eq(target) || node.is_descendant_of(target))
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.starts_with('"')
        || text.starts_with("@\"")
        || text.contains([':', '\n', '\r'])
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
}

fn typed_text(text: &str) -> String {
    if text.starts_with('"')
        || text.starts_with("@\"")
        || text.contains(['\n', '\r'])
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
    {
        quoted(text)
    } else {
        text.to_string()
    }
}

fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
