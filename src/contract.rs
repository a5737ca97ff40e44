use std::collections::HashMap;

use crate::{
    diagnostics::{HyperlambdaError, Result},
    node::Node,
    value::{Value, ValueType},
};

/// How many times an argument may be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Any,
    AtMost(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub arity: Arity,
    /// `None` accepts any type.
    pub kind: Option<ValueType>,
}

/// Declared arguments of a user-defined slot, read from its `.arguments`
/// node. Each child names one argument; its value is either absent or `*`
/// (anything goes), a type name, or an integer giving the maximum number of
/// occurrences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentContract {
    arguments: Vec<ArgumentSpec>,
}

impl ArgumentContract {
    pub fn from_declaration(slot: &str, declaration: &Node) -> Result<Self> {
        let mut arguments: Vec<ArgumentSpec> = Vec::new();
        for child in declaration.children() {
            let name = child.name();
            if arguments.iter().any(|declared| declared.name == name) {
                return Err(HyperlambdaError::shape(
                    slot,
                    format!("argument [{name}] is declared twice"),
                ));
            }
            let (arity, kind) = match child.value() {
                None => (Arity::Any, None),
                Some(Value::String(text)) if text == "*" => (Arity::Any, None),
                Some(Value::String(text)) => {
                    let kind = ValueType::from_name(&text).ok_or_else(|| {
                        HyperlambdaError::shape(
                            slot,
                            format!("argument [{name}] declares unknown type `{text}`"),
                        )
                    })?;
                    (Arity::Any, Some(kind))
                }
                Some(Value::Int(count)) => {
                    let count = usize::try_from(count).map_err(|_| {
                        HyperlambdaError::shape(
                            slot,
                            format!("argument [{name}] declares a negative arity"),
                        )
                    })?;
                    (Arity::AtMost(count), None)
                }
                Some(other) => {
                    return Err(HyperlambdaError::shape(
                        slot,
                        format!(
                            "argument [{name}] must be declared with a type name or an arity, found {}",
                            other.type_name()
                        ),
                    ));
                }
            };
            arguments.push(ArgumentSpec { name, arity, kind });
        }
        Ok(Self { arguments })
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Rejects undeclared arguments and arguments supplied more often than
    /// their declared arity. Values are not inspected.
    pub fn check_names(&self, slot: &str, supplied: &[Node]) -> Result<()> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for argument in supplied {
            let name = argument.name();
            let declared = self.declared(slot, &name)?;
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            if let Arity::AtMost(limit) = declared.arity {
                if *count > limit {
                    return Err(HyperlambdaError::Arity {
                        slot: slot.to_string(),
                        expected: format!("at most {limit} [{name}] argument(s)"),
                        received: *count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks resolved argument values against their declared types.
    pub fn check_types(&self, slot: &str, values: &[(String, Option<Value>)]) -> Result<()> {
        for (name, value) in values {
            let Some(kind) = self.declared(slot, name)?.kind else {
                continue;
            };
            let found = ValueType::of(value.as_ref());
            if found != kind {
                return Err(HyperlambdaError::shape(
                    slot,
                    format!("argument [{name}] must be of type {kind}, found {found}"),
                ));
            }
        }
        Ok(())
    }

    fn declared(&self, slot: &str, name: &str) -> Result<&ArgumentSpec> {
        self.arguments
            .iter()
            .find(|declared| declared.name == name)
            .ok_or_else(|| HyperlambdaError::UnknownArgument {
                slot: slot.to_string(),
                argument: name.to_string(),
            })
    }
}
