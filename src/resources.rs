//! Scoped resource stacks.
//!
//! Slots that open something for the duration of a unit of work (a database
//! connection, an invocation result, ...) push it here so that nested slots
//! can reach the innermost one without knowing where it was opened. A pushed
//! resource is popped, and thereby dropped, when its unit of work ends,
//! whether the unit returned normally or with an error.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use tracing::trace;

/// LIFO stack of live resources of one type.
#[derive(Debug)]
pub struct ResourceStack<T> {
    items: Vec<T>,
}

impl<T> Default for ResourceStack<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ResourceStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: T) {
        self.items.push(resource);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Runs `unit` with `resource` as the innermost entry and releases it
    /// afterwards, also when `unit` fails.
    pub fn scope<R, E>(
        &mut self,
        resource: T,
        unit: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, E> {
        let depth = self.items.len();
        self.items.push(resource);
        let result = unit(self);
        while self.items.len() > depth {
            self.items.pop();
        }
        result
    }
}

/// Type-keyed collection of [`ResourceStack`]s.
#[derive(Default)]
pub struct Resources {
    stacks: HashMap<TypeId, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: 'static>(&mut self, resource: T) {
        trace!(resource = std::any::type_name::<T>(), "scope push");
        self.stack_mut::<T>().push(resource);
    }

    pub fn pop<T: 'static>(&mut self) -> Option<T> {
        trace!(resource = std::any::type_name::<T>(), "scope pop");
        self.stacks
            .get_mut(&TypeId::of::<T>())
            .and_then(|stack| stack.downcast_mut::<ResourceStack<T>>())
            .and_then(ResourceStack::pop)
    }

    pub fn peek<T: 'static>(&self) -> Option<&T> {
        self.stack::<T>().and_then(ResourceStack::peek)
    }

    pub fn peek_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.stacks
            .get_mut(&TypeId::of::<T>())
            .and_then(|stack| stack.downcast_mut::<ResourceStack<T>>())
            .and_then(ResourceStack::peek_mut)
    }

    /// Pops entries of type `T`, innermost first, until `depth` remain.
    pub fn unwind<T: 'static>(&mut self, depth: usize) {
        while self.depth::<T>() > depth {
            self.pop::<T>();
        }
    }

    pub fn depth<T: 'static>(&self) -> usize {
        self.stack::<T>().map(ResourceStack::len).unwrap_or(0)
    }

    fn stack<T: 'static>(&self) -> Option<&ResourceStack<T>> {
        self.stacks
            .get(&TypeId::of::<T>())
            .and_then(|stack| stack.downcast_ref::<ResourceStack<T>>())
    }

    fn stack_mut<T: 'static>(&mut self) -> &mut ResourceStack<T> {
        self.stacks
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ResourceStack::<T>::new()))
            .downcast_mut::<ResourceStack<T>>()
            .expect("resource stacks are keyed by their element type")
    }
}
