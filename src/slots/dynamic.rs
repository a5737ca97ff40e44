//! Slots a program defines and invokes at runtime.
//!
//! `slot` stores a template, `signal` runs a fresh copy of it with the
//! caller's arguments prepended as `.arguments`, and `return` writes into the
//! result of the innermost running invocation.

use crate::{
    contract::ArgumentContract,
    diagnostics::{HyperlambdaError, Result},
    node::Node,
    signaler::{Signaler, Slot, SlotDefinition},
    value::Value,
};

use super::utilities::{get_ex, slot_name};

/// Result of the innermost running `signal` invocation. Lives on the
/// resource stack for the duration of the invocation.
#[derive(Debug, Clone)]
pub struct InvocationResult(pub Node);

/// `slot:name` with a `.lambda` and an optional `.arguments` child.
#[derive(Default)]
pub struct SlotDefine;

impl Slot for SlotDefine {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let name = slot_name("slot", input)?;

        let mut lambda = None;
        let mut declaration = None;
        for child in input.children() {
            match child.name().as_str() {
                ".lambda" if lambda.is_some() => {
                    return Err(HyperlambdaError::MissingLambda { slot: name });
                }
                ".lambda" => lambda = Some(child),
                ".arguments" if declaration.is_some() => {
                    return Err(HyperlambdaError::shape(
                        &name,
                        "at most one [.arguments] child is allowed",
                    ));
                }
                ".arguments" => declaration = Some(child),
                other => {
                    return Err(HyperlambdaError::shape(
                        &name,
                        format!("unexpected child [{other}] in slot definition"),
                    ));
                }
            }
        }
        let Some(lambda) = lambda else {
            return Err(HyperlambdaError::MissingLambda { slot: name });
        };
        if signaler.is_native(&name) {
            return Err(HyperlambdaError::DuplicateSlotName { name });
        }
        let contract = match &declaration {
            Some(declaration) => ArgumentContract::from_declaration(&name, declaration)?,
            None => ArgumentContract::default(),
        };

        signaler.define(SlotDefinition::new(name, &lambda, contract))
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [
                Node::with_value(":", "string"),
                Node::with_value(".arguments", 1),
                Node::with_value(".lambda", 1),
            ],
        ))
    }
}

/// `signal:name` invokes a slot defined with `slot`. Its children are the
/// arguments, and after the invocation its value and children hold what the
/// body returned.
#[derive(Default)]
pub struct SignalSlot;

impl Slot for SignalSlot {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let name = slot_name("signal", input)?;
        let Some(definition) = signaler.definition(&name) else {
            return Err(HyperlambdaError::UnknownSlot { name });
        };

        let supplied = input.children();
        definition.contract.check_names(&name, &supplied)?;
        let resolved = supplied
            .iter()
            .map(|argument| Ok((argument.name(), get_ex(argument)?)))
            .collect::<Result<Vec<(String, Option<Value>)>>>()?;
        definition.contract.check_types(&name, &resolved)?;
        for (argument, (_, value)) in supplied.iter().zip(resolved) {
            if let Some(Value::Expression(_)) = argument.value() {
                argument.set_value(value);
            }
        }

        let body = definition.instantiate();
        let arguments = Node::new(".arguments");
        arguments.add_range(input.take_children());
        body.insert(0, arguments);

        let result = Node::new("");
        signaler.scope(InvocationResult(result.clone()), |signaler| {
            signaler.evaluate(&body)
        })?;

        input.set_value(result.value());
        input.clear();
        input.add_range(result.take_children());
        Ok(())
    }

    fn arguments(&self) -> Option<Node> {
        Some(Node::with_children(
            "",
            [Node::with_value(":", "string"), Node::with_value("*", "*")],
        ))
    }
}

/// `return` sets the value and children of the running invocation's result.
/// The value is resolved through its expression if it has one.
#[derive(Default)]
pub struct Return;

impl Slot for Return {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        let value = get_ex(input)?;
        let children: Vec<Node> = input.children().iter().map(Node::deep_clone).collect();
        let Some(InvocationResult(result)) = signaler.peek::<InvocationResult>().cloned() else {
            return Err(HyperlambdaError::shape(
                "return",
                "can only be used inside a slot invoked with [signal]",
            ));
        };
        if value.is_some() {
            result.set_value(value);
        }
        result.add_range(children);
        Ok(())
    }
}
