use crate::{
    diagnostics::{HyperlambdaError, Result},
    expression::Expression,
    node::Node,
    value::Value,
};

/// The compiled expression a slot like `set` or `for-each` carries as its
/// value.
pub fn expression_of(slot: &str, input: &Node) -> Result<Expression> {
    match input.value() {
        Some(Value::Expression(expression)) => Ok(expression),
        Some(other) => Err(HyperlambdaError::shape(
            slot,
            format!("requires an expression as its value, found {}", other.type_name()),
        )),
        None => Err(HyperlambdaError::shape(
            slot,
            "requires an expression as its value",
        )),
    }
}

/// Value of `node`, resolved through its expression if it carries one. An
/// expression must match at most one node; no match yields `None`.
pub fn get_ex(node: &Node) -> Result<Option<Value>> {
    let Some(Value::Expression(expression)) = node.value() else {
        return Ok(node.value());
    };
    let matches = expression.evaluate_from(node);
    let mut iter = matches.iter();
    let first = iter.next();
    if iter.next().is_some() {
        return Err(HyperlambdaError::TooManySources { slot: node.name() });
    }
    Ok(first.and_then(|source| source.value()))
}

/// Single source of an already evaluated `input`: the only child of its only
/// child.
pub(crate) fn single_source(slot: &str, input: &Node) -> Result<Option<Node>> {
    if input.child_count() > 1 {
        return Err(HyperlambdaError::TooManySources {
            slot: slot.to_string(),
        });
    }
    let Some(argument) = input.first_child() else {
        return Ok(None);
    };
    if argument.child_count() > 1 {
        return Err(HyperlambdaError::TooManySources {
            slot: slot.to_string(),
        });
    }
    Ok(argument.first_child())
}

pub(crate) fn slot_name(slot: &str, input: &Node) -> Result<String> {
    match get_ex(input)? {
        Some(Value::String(name)) if !name.is_empty() => Ok(name),
        _ => Err(HyperlambdaError::shape(
            slot,
            "requires the name of a slot as its value",
        )),
    }
}
