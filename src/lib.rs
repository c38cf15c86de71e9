pub mod error;
pub mod key;
pub mod matcher;
pub mod node;
pub mod tree;

pub use error::TreeError;
pub use key::NodeKey;
pub use node::NodeRef;
pub use tree::{NodeId, Tree};
