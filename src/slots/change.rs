use crate::{
    diagnostics::Result,
    node::Node,
    signaler::{Signaler, Slot},
};

use super::utilities::{expression_of, single_source};

/// `set` overwrites every destination with a copy of its single source. With
/// no source the destinations are emptied.
#[derive(Default)]
pub struct Set;

impl Slot for Set {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let destinations = expression_of("set", input)?;
        signaler.evaluate(input)?;
        let source = single_source("set", input)?.map(|source| source.deep_clone());
        for destination in destinations.evaluate_from(input).to_vec() {
            match &source {
                Some(source) => destination.assign_from(source),
                None => {
                    destination.set_name("");
                    destination.set_value(None);
                    destination.clear();
                }
            }
        }
        Ok(())
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [Node::with_value(":", "x"), Node::with_value("*", 1)],
        ))
    }
}

/// `add` appends copies of the grandchildren of every argument to every
/// destination.
#[derive(Default)]
pub struct Add;

impl Slot for Add {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let destinations = expression_of("add", input)?;
        signaler.evaluate(input)?;
        let sources: Vec<Vec<Node>> = input
            .children()
            .iter()
            .map(|argument| argument.children().iter().map(Node::deep_clone).collect())
            .collect();
        let destinations = destinations.evaluate_from(input).to_vec();
        for fragment in &sources {
            for destination in &destinations {
                for node in fragment {
                    destination.add(node.deep_clone());
                }
            }
        }
        Ok(())
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [Node::with_value(":", "x"), Node::with_value("*", "*")],
        ))
    }
}
