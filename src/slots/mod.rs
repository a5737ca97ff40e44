//! Built-in control-flow slots.
//!
//! The table below is the whole native vocabulary an engine starts with;
//! hosts add plugin slots on top through
//! [`SlotRegistry::register`](crate::signaler::SlotRegistry::register).

mod branching;
mod change;
mod dynamic;
mod eval;
mod loops;
mod utilities;

use crate::signaler::Slot;

pub use branching::If;
pub use change::{Add, Set};
pub use dynamic::{InvocationResult, Return, SignalSlot, SlotDefine};
pub use eval::Eval;
pub use loops::ForEach;
pub use utilities::{expression_of, get_ex};

pub(crate) type Constructor = fn() -> Box<dyn Slot>;

fn construct<S: Slot + Default + 'static>() -> Box<dyn Slot> {
    Box::new(S::default())
}

pub(crate) static BUILTINS: &[(&str, Constructor)] = &[
    ("eval", construct::<Eval>),
    ("set", construct::<Set>),
    ("add", construct::<Add>),
    ("if", construct::<If>),
    ("for-each", construct::<ForEach>),
    ("slot", construct::<SlotDefine>),
    ("signal", construct::<SignalSlot>),
    ("return", construct::<Return>),
];
