use crate::{
    diagnostics::{HyperlambdaError, Result},
    node::Node,
    signaler::{Signaler, Slot},
    value::Value,
};

use super::utilities::get_ex;

/// `if` takes exactly two children, a condition and a `.lambda`. The lambda
/// runs when the condition, resolved through its expression if it has one,
/// is `true`. A condition that matches nothing counts as `false`.
#[derive(Default)]
pub struct If;

impl Slot for If {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        if input.child_count() != 2 {
            return Err(HyperlambdaError::Arity {
                slot: "if".to_string(),
                expected: "exactly two children, a condition and a [.lambda]".to_string(),
                received: input.child_count(),
            });
        }
        let lambda = input.child(1).filter(|lambda| lambda.has_name(".lambda"));
        let Some(lambda) = lambda else {
            return Err(HyperlambdaError::shape(
                "if",
                "the second child must be a [.lambda]",
            ));
        };

        signaler.evaluate(input)?;

        let Some(condition) = input.first_child() else {
            return Ok(());
        };
        let passed = match get_ex(&condition)? {
            None => false,
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(HyperlambdaError::shape(
                    "if",
                    format!("condition must be a bool, found {}", other.type_name()),
                ));
            }
        };
        if passed {
            signaler.evaluate(&lambda)?;
        }
        Ok(())
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [Node::with_value("*", 1), Node::with_value(".lambda", 1)],
        ))
    }
}
