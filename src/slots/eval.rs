use crate::{
    diagnostics::Result,
    node::Node,
    signaler::{Signaler, Slot},
    value::Value,
};

/// `eval` executes its own children, or, when its value is an expression,
/// each matched node as a lambda of its own.
#[derive(Default)]
pub struct Eval;

impl Slot for Eval {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let Some(Value::Expression(expression)) = input.value() else {
            return signaler.evaluate(input);
        };
        let targets = expression.evaluate_from(input).to_vec();
        for target in &targets {
            signaler.evaluate(target)?;
        }
        Ok(())
    }
}
