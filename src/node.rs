//! The universal tree value. A [`Node`] is at the same time program text,
//! runtime state and result payload.
//!
//! `Node` is a handle: cloning it with [`Clone::clone`] yields another handle
//! to the same node, which is how path expressions hand out references into
//! a tree. Copying a subtree is always explicit through [`Node::deep_clone`].
//! Every node has at most one parent; adding a node that already sits in a
//! tree moves it out of its previous parent first.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use crate::value::Value;

struct NodeData {
    name: String,
    value: Option<Value>,
    children: Vec<Node>,
    parent: Weak<RefCell<NodeData>>,
}

#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            name: name.into(),
            value: None,
            children: Vec::new(),
            parent: Weak::new(),
        })))
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let node = Self::new(name);
        node.set_value(Some(value.into()));
        node
    }

    /// Builds a detached node owning `children`.
    pub fn with_children(name: impl Into<String>, children: impl IntoIterator<Item = Node>) -> Self {
        let node = Self::new(name);
        node.add_range(children);
        node
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.0.borrow().name == name
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = name.into();
    }

    pub fn value(&self) -> Option<Value> {
        self.0.borrow().value.clone()
    }

    pub fn set_value(&self, value: Option<Value>) {
        self.0.borrow_mut().value = value;
    }

    /// Snapshot of the child handles. Later structural changes do not affect
    /// the returned vector.
    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.borrow().children.get(index).cloned()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.child(0)
    }

    pub fn child_named(&self, name: &str) -> Option<Node> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|child| child.has_name(name))
            .cloned()
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    /// Topmost ancestor, or the node itself when it has no parent.
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Position of this node within its parent.
    pub fn position(&self) -> Option<usize> {
        let parent = self.parent()?;
        let data = parent.0.borrow();
        data.children.iter().position(|child| child.ptr_eq(self))
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.position()?;
        index.checked_sub(1).and_then(|prev| parent.child(prev))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.position()?;
        parent.child(index + 1)
    }

    /// Appends `child`, moving it out of any tree it currently belongs to.
    ///
    /// # Panics
    ///
    /// Panics if `child` is this node or one of its ancestors.
    pub fn add(&self, child: Node) {
        assert!(
            !self.is_descendant_of(&child),
            "a node cannot become a child of its own descendant"
        );
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child);
    }

    pub fn add_range(&self, children: impl IntoIterator<Item = Node>) {
        for child in children {
            self.add(child);
        }
    }

    /// Inserts `child` at `index` (clamped to the child count).
    ///
    /// # Panics
    ///
    /// Panics if `child` is this node or one of its ancestors.
    pub fn insert(&self, index: usize, child: Node) {
        assert!(
            !self.is_descendant_of(&child),
            "a node cannot become a child of its own descendant"
        );
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        let mut data = self.0.borrow_mut();
        let index = index.min(data.children.len());
        data.children.insert(index, child);
    }

    /// Removes the node from its parent. Detached nodes keep their own
    /// children.
    pub fn detach(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent
            .0
            .borrow_mut()
            .children
            .retain(|sibling| !sibling.ptr_eq(self));
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Removes and returns all children.
    pub fn take_children(&self) -> Vec<Node> {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in &children {
            child.0.borrow_mut().parent = Weak::new();
        }
        children
    }

    pub fn clear(&self) {
        self.take_children();
    }

    /// Copies name, value and the whole subtree into a new detached node.
    /// Node-reference values inside the subtree keep pointing at their
    /// original targets.
    pub fn deep_clone(&self) -> Node {
        let data = self.0.borrow();
        let copy = Node::new(data.name.clone());
        copy.set_value(data.value.clone());
        for child in &data.children {
            copy.add(child.deep_clone());
        }
        copy
    }

    /// Overwrites name, value and children with deep copies of `source`'s.
    pub fn assign_from(&self, source: &Node) {
        let copy = source.deep_clone();
        self.set_name(copy.name());
        self.set_value(copy.value());
        self.clear();
        self.add_range(copy.take_children());
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_descendant_of(&self, ancestor: &Node) -> bool {
        let mut current = self.clone();
        loop {
            if current.ptr_eq(ancestor) {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All descendants in pre-order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut result = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(next.children().into_iter().rev());
            result.push(next);
        }
        result
    }

    /// Name, value and children compared recursively. Node-reference values
    /// compare by identity.
    pub fn structurally_eq(&self, other: &Node) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let left = self.0.borrow();
        let right = other.0.borrow();
        left.name == right.name
            && left.value == right.value
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(right.children.iter())
                .all(|(a, b)| a.structurally_eq(b))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let mut debug = f.debug_struct("Node");
        debug.field("name", &data.name);
        if let Some(value) = &data.value {
            debug.field("value", value);
        }
        if !data.children.is_empty() {
            debug.field("children", &data.children);
        }
        debug.finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::generator::to_hyperlambda(self))
    }
}
