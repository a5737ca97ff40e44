//! Slot registry and dispatcher.
//!
//! Native slots live in a [`SlotRegistry`] that is filled once, at start-up,
//! from the built-in table plus whatever a host registers, and is then shared
//! read-only behind an `Arc`. Every program run gets its own [`Signaler`],
//! which owns the slots the program defines at runtime and the scoped
//! resource stacks of that run.

use std::{fmt, rc::Rc, sync::Arc};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{
    config::EngineConfig,
    contract::ArgumentContract,
    diagnostics::{HyperlambdaError, Result},
    node::Node,
    resources::Resources,
    slots,
};

/// An executable operation invoked by name against a node.
pub trait Slot {
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()>;

    /// Optional description of the arguments the slot understands, one child
    /// per argument. Documentation only, never enforced for native slots.
    fn arguments(&self) -> Option<Node> {
        None
    }
}

/// Produces a fresh slot instance per dispatch.
pub type SlotFactory = Arc<dyn Fn() -> Box<dyn Slot> + Send + Sync>;

struct FnSlot<F>(Arc<F>);

impl<F> Slot for FnSlot<F>
where
    F: Fn(&mut Signaler, &Node) -> Result<()>,
{
    fn signal(&self, signaler: &mut Signaler, input: &Node) -> Result<()> {
        (self.0)(signaler, input)
    }
}

#[derive(Clone, Default)]
pub struct SlotRegistry {
    slots: IndexMap<String, SlotFactory>,
}

impl SlotRegistry {
    /// An empty registry, without even `eval`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in control-flow slots.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, constructor) in slots::BUILTINS {
            registry
                .slots
                .insert((*name).to_string(), Arc::new(*constructor));
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: SlotFactory) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name.starts_with('.') {
            return Err(HyperlambdaError::shape(
                &name,
                "slot names must be non-empty and must not start with `.`",
            ));
        }
        if self.slots.contains_key(&name) {
            return Err(HyperlambdaError::DuplicateSlotName { name });
        }
        debug!(slot = %name, "native slot registered");
        self.slots.insert(name, factory);
        Ok(())
    }

    /// Registers a closure as a native slot.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&mut Signaler, &Node) -> Result<()> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.register(
            name,
            Arc::new(move || Box::new(FnSlot(Arc::clone(&handler))) as Box<dyn Slot>),
        )
    }

    pub fn factory(&self, name: &str) -> Option<SlotFactory> {
        self.slots.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn arguments(&self, name: &str) -> Option<Node> {
        self.slots.get(name).and_then(|factory| factory().arguments())
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}

/// A slot created by a program through `slot`. The lambda is a template and
/// is never executed itself, every invocation runs a deep copy.
#[derive(Debug)]
pub struct SlotDefinition {
    pub name: String,
    lambda: Node,
    pub contract: ArgumentContract,
}

impl SlotDefinition {
    pub fn new(name: impl Into<String>, lambda: &Node, contract: ArgumentContract) -> Self {
        Self {
            name: name.into(),
            lambda: lambda.deep_clone(),
            contract,
        }
    }

    pub fn instantiate(&self) -> Node {
        self.lambda.deep_clone()
    }
}

pub struct Signaler {
    natives: Arc<SlotRegistry>,
    dynamic: IndexMap<String, Rc<SlotDefinition>>,
    resources: Resources,
    config: EngineConfig,
    depth: usize,
}

impl Signaler {
    pub fn new(natives: Arc<SlotRegistry>, config: EngineConfig) -> Self {
        debug!(label = config.label.as_deref().unwrap_or("-"), "session opened");
        Self {
            natives,
            dynamic: IndexMap::new(),
            resources: Resources::new(),
            config,
            depth: 0,
        }
    }

    /// Dispatches `name` against `input`, failing when no native slot has
    /// that name.
    pub fn signal(&mut self, name: &str, input: &Node) -> Result<()> {
        if self.try_signal(name, input)? {
            Ok(())
        } else {
            Err(HyperlambdaError::UnknownSlot {
                name: name.to_string(),
            })
        }
    }

    /// Like [`Signaler::signal`], but reports a missing slot as `Ok(false)`.
    pub fn try_signal(&mut self, name: &str, input: &Node) -> Result<bool> {
        let Some(factory) = self.natives.factory(name) else {
            return Ok(false);
        };
        trace!(slot = name, depth = self.depth, "signal");
        let slot = factory();
        slot.signal(self, input)?;
        Ok(true)
    }

    /// Executes `lambda` as a block: every child whose name is a native slot
    /// is dispatched, in order, against itself. Children whose names start
    /// with `.` are data and never dispatched, and so are children that an
    /// earlier sibling moved out of `lambda`. The first error aborts the
    /// block.
    pub fn evaluate(&mut self, lambda: &Node) -> Result<()> {
        self.descend(|signaler| {
            for child in lambda.children() {
                if !child.parent().is_some_and(|parent| parent.ptr_eq(lambda)) {
                    continue;
                }
                let name = child.name();
                if name.is_empty() || name.starts_with('.') {
                    continue;
                }
                signaler.try_signal(&name, &child)?;
            }
            Ok(())
        })
    }

    pub fn is_native(&self, name: &str) -> bool {
        self.natives.contains(name)
    }

    pub fn natives(&self) -> &SlotRegistry {
        &self.natives
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `unit` one nesting level deeper, failing once the configured
    /// maximum depth is reached.
    pub fn descend<R>(&mut self, unit: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.depth >= self.config.max_depth {
            return Err(HyperlambdaError::RecursionLimit {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = unit(self);
        self.depth -= 1;
        result
    }

    pub fn define(&mut self, definition: SlotDefinition) -> Result<()> {
        if self.natives.contains(&definition.name) {
            return Err(HyperlambdaError::DuplicateSlotName {
                name: definition.name,
            });
        }
        let name = definition.name.clone();
        if self.dynamic.insert(name.clone(), Rc::new(definition)).is_some() {
            warn!(slot = %name, "user slot redefined");
        } else {
            debug!(slot = %name, "user slot defined");
        }
        Ok(())
    }

    pub fn definition(&self, name: &str) -> Option<Rc<SlotDefinition>> {
        self.dynamic.get(name).cloned()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.dynamic.keys().map(String::as_str)
    }

    /// Makes `resource` the innermost resource of its type while `unit` runs.
    /// The resource is dropped when `unit` ends, on success and on error.
    pub fn scope<T: 'static, R>(
        &mut self,
        resource: T,
        unit: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let depth = self.resources.depth::<T>();
        self.resources.push(resource);
        let result = unit(self);
        self.resources.unwind::<T>(depth);
        result
    }

    pub fn peek<T: 'static>(&self) -> Option<&T> {
        self.resources.peek::<T>()
    }

    pub fn peek_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources.peek_mut::<T>()
    }
}
