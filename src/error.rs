use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    /// The payload portion of a record failed to (de)serialize.
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("`children` must be an array of records")]
    ChildrenNotAnArray,

    /// A node with children must have an object payload, otherwise
    /// there is nothing to flatten the `children` field into.
    #[error("node {0} has children but its payload is not an object")]
    NonRecordPayload(String),
}
