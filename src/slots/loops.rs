use crate::{
    diagnostics::Result,
    node::Node,
    signaler::{Signaler, Slot},
    value::Value,
};

use super::utilities::expression_of;

/// `for-each` runs its own children once per node its expression matched.
/// Each iteration starts from a fresh copy of the body, with a `.dp` child
/// prepended whose value is the current match.
#[derive(Default)]
pub struct ForEach;

impl Slot for ForEach {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let matches = expression_of("for-each", input)?.evaluate_from(input).to_vec();
        let body = input.take_children();
        let result = iterate(signaler, input, &body, &matches);
        input.clear();
        input.add_range(body);
        result
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [Node::with_value(":", "x"), Node::with_value("*", "*")],
        ))
    }
}

fn iterate(signaler: &mut Signaler, input: &Node, body: &[Node], matches: &[Node]) -> Result<()> {
    for current in matches {
        input.clear();
        input.add(Node::with_value(".dp", Value::Node(current.clone())));
        input.add_range(body.iter().map(Node::deep_clone));
        signaler.evaluate(input)?;
    }
    Ok(())
}
