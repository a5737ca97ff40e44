use std::{any::Any, fmt, rc::Rc};

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use crate::{expression::Expression, generator, node::Node};

/// Closed set of values a [`Node`] can carry. A node without a value holds
/// `None` in its value slot, which is how "null" is represented.
///
/// Cloning a `Value::Node` copies the reference, not the referenced subtree.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<FixedOffset>),
    /// Reference to another node, dereferenced by the `#` path segment.
    Node(Node),
    Expression(Expression),
    Opaque(Opaque),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Decimal(_) => ValueType::Decimal,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::Date,
            Value::Node(_) => ValueType::Node,
            Value::Expression(_) => ValueType::Expression,
            Value::Opaque(_) => ValueType::Opaque,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Value::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
            (Value::Expression(a), Value::Expression(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}m"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::DateTime(date) => write!(f, "{}", date.to_rfc3339()),
            // shallow, a reference may point back into its own ancestry
            Value::Node(node) => write!(f, "<node {:?}>", node.name()),
            Value::Expression(expression) => write!(f, "x:{expression}"),
            Value::Opaque(opaque) => write!(f, "{opaque:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::DateTime(date) => write!(f, "{}", date.to_rfc3339()),
            Value::Node(node) => write!(f, "{}", generator::children_to_hyperlambda(node)),
            Value::Expression(expression) => write!(f, "{expression}"),
            Value::Opaque(opaque) => write!(f, "<{}>", opaque.type_name),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<Expression> for Value {
    fn from(value: Expression) -> Self {
        Value::Expression(value)
    }
}

/// Host-provided value the engine carries around without inspecting.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    inner: Rc<dyn Any>,
}

impl Opaque {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Rc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

/// Type tags shared by the parser, the `%type` path filter and argument
/// contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    String,
    Date,
    Node,
    Expression,
    Opaque,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Decimal => "decimal",
            ValueType::String => "string",
            ValueType::Date => "date",
            ValueType::Node => "node",
            ValueType::Expression => "x",
            ValueType::Opaque => "opaque",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "null" => ValueType::Null,
            "bool" => ValueType::Bool,
            "int" | "long" => ValueType::Int,
            "float" | "double" => ValueType::Float,
            "decimal" => ValueType::Decimal,
            "string" => ValueType::String,
            "date" => ValueType::Date,
            "node" => ValueType::Node,
            "x" => ValueType::Expression,
            "opaque" => ValueType::Opaque,
            _ => return None,
        };
        Some(kind)
    }

    /// Type of an optional value slot, mapping an absent value to `Null`.
    pub fn of(value: Option<&Value>) -> Self {
        value.map(Value::value_type).unwrap_or(ValueType::Null)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
