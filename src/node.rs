use crate::error::TreeError;
use crate::key::NodeKey;
use crate::matcher::matches_subset;
use crate::tree::{NodeId, Tree};

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Read-only view of a single node: the owning tree plus the node's
/// index. Cheap to copy; every relationship accessor walks the links
/// on demand, nothing is cached.
pub struct NodeRef<'a, T> {
    tree: &'a Tree<T>,
    id: NodeId,
}

impl<'a, T> NodeRef<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, id: NodeId) -> NodeRef<'a, T> {
        NodeRef { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &'a NodeKey {
        &self.tree.entry(self.id).key
    }

    pub fn data(&self) -> &'a T {
        &self.tree.entry(self.id).data
    }

    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        self.tree
            .entry(self.id)
            .parent
            .map(|id| NodeRef::new(self.tree, id))
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Hops to the root; the root itself is at depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = *self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }

    pub fn root(&self) -> NodeRef<'a, T> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Whether a children container exists at all. True even when the
    /// container is empty, which only happens for a node built from a
    /// record with an empty `children` list.
    pub fn has_children(&self) -> bool {
        self.tree.entry(self.id).children.is_some()
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> Vec<NodeRef<'a, T>> {
        match self.tree.entry(self.id).children.as_ref() {
            Some(ids) => ids.iter().map(|id| NodeRef::new(self.tree, *id)).collect(),
            None => Vec::new(),
        }
    }

    /// Nearest ancestor first, root last. Empty for the root.
    pub fn ancestors(&self) -> Vec<NodeRef<'a, T>> {
        let mut out = Vec::new();
        let mut current = *self;
        while let Some(parent) = current.parent() {
            out.push(parent);
            current = parent;
        }
        out
    }

    /// Everything below this node: each direct child in order, each
    /// immediately followed by its own descendants.
    pub fn descendants(&self) -> Vec<NodeRef<'a, T>> {
        let mut out = Vec::new();
        for child in self.children() {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }

    /// The parent's other children, in order. Empty for the root.
    pub fn siblings(&self) -> Vec<NodeRef<'a, T>> {
        match self.parent() {
            Some(parent) => parent
                .children()
                .into_iter()
                .filter(|node| node.id != self.id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// This node if its key matches, otherwise the first matching
    /// descendant. Walks the whole subtree; no key index is kept.
    pub fn get(&self, key: &str) -> Option<NodeRef<'a, T>> {
        let wanted = NodeKey::parse(key)?;
        if *self.key() == wanted {
            return Some(*self);
        }
        self.descendants()
            .into_iter()
            .find(|node| *node.key() == wanted)
    }

    /// Pre-order walk: this node first, then each child subtree in
    /// order. The visitor cannot stop the walk early.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(NodeRef<'a, T>),
    {
        self.walk(&mut visit);
    }

    fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(NodeRef<'a, T>),
    {
        visit(*self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

impl<'a, T: Serialize> NodeRef<'a, T> {
    /// Serialized nested-record form of the subtree rooted here.
    pub fn to_value(&self) -> Result<Value, TreeError> {
        self.tree.node_to_value(self.id)
    }

    /// Values of `field` from the root down to and including this
    /// node. With `include_root` false the root's value is left off —
    /// unless this node is the root itself, which then contributes the
    /// only value. A node without the field contributes null.
    pub fn get_path(&self, field: &str, include_root: bool) -> Result<Vec<Value>, TreeError> {
        let mut line = self.ancestors();
        if !include_root {
            // the root is the last ancestor
            line.pop();
        }
        line.reverse();
        let mut out = Vec::with_capacity(line.len() + 1);
        for node in line {
            out.push(field_value(&node.payload_value()?, field));
        }
        out.push(field_value(&self.payload_value()?, field));
        Ok(out)
    }

    /// Direct children whose payload structurally contains `predicate`.
    pub fn find_all_children(&self, predicate: &Value) -> Result<Vec<NodeRef<'a, T>>, TreeError> {
        filter_matching(self.children(), predicate)
    }

    /// First direct child whose payload matches, if any.
    pub fn find_one_child(&self, predicate: &Value) -> Result<Option<NodeRef<'a, T>>, TreeError> {
        first_matching(self.children(), predicate)
    }

    /// Descendants (in [`NodeRef::descendants`] order) whose payload
    /// structurally contains `predicate`.
    pub fn find_all_descendants(
        &self,
        predicate: &Value,
    ) -> Result<Vec<NodeRef<'a, T>>, TreeError> {
        filter_matching(self.descendants(), predicate)
    }

    /// First descendant whose payload matches, if any.
    pub fn find_one_descendant(
        &self,
        predicate: &Value,
    ) -> Result<Option<NodeRef<'a, T>>, TreeError> {
        first_matching(self.descendants(), predicate)
    }

    fn payload_value(&self) -> Result<Value, TreeError> {
        Ok(serde_json::to_value(self.data())?)
    }
}

fn filter_matching<'a, T: Serialize>(
    nodes: Vec<NodeRef<'a, T>>,
    predicate: &Value,
) -> Result<Vec<NodeRef<'a, T>>, TreeError> {
    let mut out = Vec::new();
    for node in nodes {
        if matches_subset(&node.payload_value()?, predicate) {
            out.push(node);
        }
    }
    Ok(out)
}

fn first_matching<'a, T: Serialize>(
    nodes: Vec<NodeRef<'a, T>>,
    predicate: &Value,
) -> Result<Option<NodeRef<'a, T>>, TreeError> {
    for node in nodes {
        if matches_subset(&node.payload_value()?, predicate) {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

fn field_value(payload: &Value, field: &str) -> Value {
    payload.get(field).cloned().unwrap_or(Value::Null)
}

impl<'a, T> Clone for NodeRef<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for NodeRef<'a, T> {}

impl<'a, T> PartialEq for NodeRef<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a, T> Eq for NodeRef<'a, T> {}

impl<'a, T> fmt::Debug for NodeRef<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.key())
    }
}
