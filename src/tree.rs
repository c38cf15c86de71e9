use crate::error::TreeError;
use crate::key::NodeKey;
use crate::node::NodeRef;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Field reserved in the serialized record for the nested children.
const CHILDREN_FIELD: &str = "children";

/// Index of a node within its owning [`Tree`]. Only meaningful for the
/// tree that handed it out.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
pub(crate) struct NodeEntry<T> {
    pub(crate) key: NodeKey,
    pub(crate) data: T,
    pub(crate) parent: Option<NodeId>,
    // None means the node never had a children container, as opposed
    // to a container that is present but empty.
    pub(crate) children: Option<Vec<NodeId>>,
}

/// A tree of `T` payloads. The tree owns every node; parent links are
/// plain back-indices and never an ownership edge. Reads go through
/// [`NodeRef`] views, mutation through `&mut` methods here.
#[derive(Debug)]
pub struct Tree<T> {
    nodes: Vec<NodeEntry<T>>,
}

impl<T> Tree<T> {
    /// Single-node tree: a root with key "0" and no children container.
    pub fn new(data: T) -> Tree<T> {
        Tree {
            nodes: vec![NodeEntry {
                key: NodeKey::root(),
                data,
                parent: None,
                children: None,
            }],
        }
    }

    pub fn root(&self) -> NodeRef<'_, T> {
        NodeRef::new(self, NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_, T> {
        NodeRef::new(self, id)
    }

    /// Searches the whole tree for a node with the given rendered key.
    pub fn get(&self, key: &str) -> Option<NodeRef<'_, T>> {
        self.root().get(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn entry(&self, id: NodeId) -> &NodeEntry<T> {
        &self.nodes[id.0]
    }

    /// Key the next child appended under `parent` will receive.
    /// Derived from the last inserted child rather than a counter;
    /// children are append-only so the sequence stays monotonic.
    /// Does not mutate anything.
    pub fn next_child_key(&self, parent: NodeId) -> NodeKey {
        let entry = self.entry(parent);
        match entry.children.as_ref().and_then(|children| children.last()) {
            Some(last) => self.entry(*last).key.next_sibling(),
            None => entry.key.first_child(),
        }
    }

    /// Appends a leaf child holding `data`, creating the parent's
    /// children container if it does not exist yet.
    pub fn append(&mut self, parent: NodeId, data: T) -> NodeId {
        let key = self.next_child_key(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            key,
            data,
            parent: Some(parent),
            children: None,
        });
        self.nodes[parent.0]
            .children
            .get_or_insert_with(Vec::new)
            .push(id);
        id
    }
}

impl<T: DeserializeOwned> Tree<T> {
    /// Builds a tree from a nested record: the payload's fields at the
    /// top level plus an optional `children` array of the same shape.
    /// Children are built recursively in array order, each claiming
    /// the next key from its partially built parent.
    pub fn from_value(record: Value) -> Result<Tree<T>, TreeError> {
        let mut tree = Tree { nodes: Vec::new() };
        tree.build(record, None)?;
        Ok(tree)
    }

    /// Appends the subtree described by `record` under `parent` and
    /// returns the id of its root.
    pub fn append_child(&mut self, parent: NodeId, record: Value) -> Result<NodeId, TreeError> {
        self.build(record, Some(parent))
    }

    fn build(&mut self, record: Value, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let (payload, children) = split_record(record)?;
        let data = serde_json::from_value(payload)?;
        let key = match parent {
            Some(parent) => self.next_child_key(parent),
            None => NodeKey::root(),
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            key,
            data,
            parent,
            children: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0]
                .children
                .get_or_insert_with(Vec::new)
                .push(id);
        }
        if let Some(entries) = children {
            // a children list in the record means the container
            // exists, even when the list is empty
            self.nodes[id.0].children = Some(Vec::with_capacity(entries.len()));
            for entry in entries {
                self.build(entry, Some(id))?;
            }
        }
        Ok(id)
    }
}

impl<T: Serialize> Tree<T> {
    /// Inverse of [`Tree::from_value`]: the nested record form of the
    /// whole tree.
    pub fn to_value(&self) -> Result<Value, TreeError> {
        self.node_to_value(NodeId(0))
    }

    pub(crate) fn node_to_value(&self, id: NodeId) -> Result<Value, TreeError> {
        let entry = self.entry(id);
        let payload = serde_json::to_value(&entry.data)?;
        let children = match entry.children.as_ref() {
            Some(children) => children,
            // no container: the payload is the whole record
            None => return Ok(payload),
        };
        let mut fields = match payload {
            Value::Object(fields) => fields,
            _ => return Err(TreeError::NonRecordPayload(entry.key.to_string())),
        };
        let mut serialized = Vec::with_capacity(children.len());
        for child in children {
            serialized.push(self.node_to_value(*child)?);
        }
        fields.insert(CHILDREN_FIELD.to_string(), Value::Array(serialized));
        Ok(Value::Object(fields))
    }
}

fn split_record(record: Value) -> Result<(Value, Option<Vec<Value>>), TreeError> {
    match record {
        Value::Object(mut fields) => {
            let children = match fields.remove(CHILDREN_FIELD) {
                Some(Value::Array(entries)) => Some(entries),
                Some(_) => return Err(TreeError::ChildrenNotAnArray),
                None => None,
            };
            Ok((Value::Object(fields), children))
        }
        // not an object: the whole value is a leaf payload
        other => Ok((other, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_derive::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    fn sample() -> Tree<Item> {
        Tree::from_value(json!({
            "name": "r",
            "children": [
                {"name": "a"},
                {"name": "b", "children": [{"name": "c"}]},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn test_keys_follow_position() {
        let tree = sample();
        let root = tree.root();
        assert_eq!(root.key().to_string(), "0");

        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key().to_string(), "0.0");
        assert_eq!(children[0].data().name, "a");
        assert_eq!(children[1].key().to_string(), "0.1");
        assert_eq!(children[1].data().name, "b");

        let grandchildren = children[1].children();
        assert_eq!(grandchildren.len(), 1);
        assert_eq!(grandchildren[0].key().to_string(), "0.1.0");
        assert_eq!(grandchildren[0].data().name, "c");
    }

    #[test]
    fn test_keys_are_unique() {
        let tree = sample();
        let mut keys = Vec::new();
        tree.root().traverse(|node| keys.push(node.key().to_string()));
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), keys.len());
    }

    #[test]
    fn test_data_excludes_children_field() {
        let tree = sample();
        assert_eq!(tree.root().data(), &Item { name: "r".to_string() });
    }

    #[test]
    fn test_root_only_tree() {
        let tree = Tree::new(Item { name: "solo".to_string() });
        assert!(tree.root().is_root());
        assert!(!tree.root().has_children());
        assert_eq!(tree.root().depth(), 0);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_next_child_key_is_pure() {
        let tree = sample();
        let root = tree.root().id();
        assert_eq!(tree.next_child_key(root).to_string(), "0.2");
        assert_eq!(tree.next_child_key(root).to_string(), "0.2");
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_append_assigns_sequential_keys() {
        let mut tree = Tree::new(Item { name: "r".to_string() });
        let root = tree.root().id();
        let first = tree.append(root, Item { name: "a".to_string() });
        let second = tree.append(root, Item { name: "b".to_string() });
        let nested = tree.append(first, Item { name: "c".to_string() });

        assert_eq!(tree.node(first).key().to_string(), "0.0");
        assert_eq!(tree.node(second).key().to_string(), "0.1");
        assert_eq!(tree.node(nested).key().to_string(), "0.0.0");
        assert_eq!(tree.node(first).parent().unwrap().id(), root);
        assert_eq!(tree.root().children().len(), 2);
    }

    #[test]
    fn test_append_creates_children_container() {
        let mut tree = Tree::new(Item { name: "r".to_string() });
        assert!(!tree.root().has_children());
        let before = tree.root().children().len();

        let root = tree.root().id();
        let child = tree.append(root, Item { name: "a".to_string() });

        assert!(tree.root().has_children());
        assert_eq!(tree.root().children().len(), before + 1);
        assert_eq!(tree.root().children()[0].id(), child);
    }

    #[test]
    fn test_append_child_builds_whole_subtree() {
        let mut tree = sample();
        let root = tree.root().id();
        let id = tree
            .append_child(root, json!({"name": "d", "children": [{"name": "e"}]}))
            .unwrap();

        assert_eq!(tree.node(id).key().to_string(), "0.2");
        assert_eq!(tree.node(id).data(), &Item { name: "d".to_string() });
        let inner = tree.node(id).children();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].key().to_string(), "0.2.0");
        assert_eq!(inner[0].data().name, "e");
    }

    #[test]
    fn test_round_trip() {
        let record = json!({
            "name": "r",
            "children": [
                {"name": "a"},
                {"name": "b", "children": [{"name": "c"}]},
            ],
        });
        let tree: Tree<Item> = Tree::from_value(record.clone()).unwrap();
        assert_eq!(tree.to_value().unwrap(), record);
    }

    #[test]
    fn test_round_trip_leaf() {
        let record = json!({"name": "solo"});
        let tree: Tree<Item> = Tree::from_value(record.clone()).unwrap();
        assert_eq!(tree.to_value().unwrap(), record);
    }

    #[test]
    fn test_empty_children_list_is_kept() {
        let record = json!({"name": "r", "children": []});
        let tree: Tree<Item> = Tree::from_value(record.clone()).unwrap();
        assert!(tree.root().has_children());
        assert_eq!(tree.root().children().len(), 0);
        assert_eq!(tree.to_value().unwrap(), record);
    }

    #[test]
    fn test_children_must_be_an_array() {
        let result: Result<Tree<Item>, _> =
            Tree::from_value(json!({"name": "r", "children": 5}));
        assert!(matches!(result, Err(TreeError::ChildrenNotAnArray)));
    }

    #[test]
    fn test_branch_payload_must_be_an_object() {
        let mut tree: Tree<Value> = Tree::new(json!("just a string"));
        let root = tree.root().id();
        tree.append(root, json!("child"));
        assert!(matches!(
            tree.to_value(),
            Err(TreeError::NonRecordPayload(_))
        ));
    }

    #[test]
    fn test_non_object_leaf_payload_round_trips() {
        let tree: Tree<Value> = Tree::from_value(json!("bare")).unwrap();
        assert_eq!(tree.to_value().unwrap(), json!("bare"));
    }
}
