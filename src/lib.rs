//! Hyperlambda: programs as trees of named nodes, executed by dispatching
//! node names to slots.
//!
//! A program is parsed into a [`Node`] tree and evaluated by signaling
//! `eval` on its root. Every child whose name is a registered slot runs
//! against itself, mutating the tree in place; everything else is data.

pub mod config;
pub mod contract;
pub mod diagnostics;
pub mod engine;
pub mod expression;
pub mod generator;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod repl;
pub mod resources;
pub mod signaler;
pub mod slots;
pub mod value;

pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, ErrorKind, HyperlambdaError, SourceSpan};
pub use engine::Engine;
pub use expression::Expression;
pub use node::Node;
pub use repl::Repl;
pub use signaler::{Signaler, Slot, SlotRegistry};
pub use value::{Value, ValueType};
