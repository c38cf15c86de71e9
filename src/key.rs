use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// Position of a node within its tree, written as a dot-separated path
/// of child indices from the root: the root is "0", its third child is
/// "0.2", that child's first child "0.2.0".
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct NodeKey {
    segments: Vec<u64>,
}

impl NodeKey {
    pub fn root() -> NodeKey {
        NodeKey { segments: vec![0] }
    }

    /// Key of the first child slot under this key.
    pub fn first_child(&self) -> NodeKey {
        let mut segments = self.segments.clone();
        segments.push(0);
        NodeKey { segments }
    }

    /// Key of the sibling slot right after this one.
    pub fn next_sibling(&self) -> NodeKey {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            *last += 1;
        }
        NodeKey { segments }
    }

    /// Parses a rendered key. Anything that is not dot-separated
    /// base-10 integers is rejected.
    pub fn parse(s: &str) -> Option<NodeKey> {
        let mut segments = Vec::new();
        for part in s.split('.') {
            segments.push(part.parse::<u64>().ok()?);
        }
        Some(NodeKey { segments })
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.iter().join("."))
    }
}
