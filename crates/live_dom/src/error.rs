use crate::arena::NodeHandle;
use core_types::NodeId;
use thiserror::Error;

/// Structural failures of the live tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("no live node with id {0}")]
    MissingNode(NodeId),
    #[error("handle {0} no longer refers to a live node")]
    StaleHandle(NodeHandle),
    #[error("id {0} is already in use")]
    DuplicateId(NodeId),
    #[error("inserting {child} under {parent} would create a cycle")]
    CycleDetected {
        parent: NodeHandle,
        child: NodeHandle,
    },
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },
    #[error("{0} cannot have children")]
    InvalidParent(NodeHandle),
    #[error("the tree root must be an element")]
    InvalidRoot,
}

/// A delta that could not be applied; aborts the rest of its batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} aborted: {source}")]
pub struct ApplyError {
    pub action: &'static str,
    #[source]
    pub source: DomError,
}

impl ApplyError {
    pub fn new(action: &'static str, source: DomError) -> Self {
        ApplyError { action, source }
    }
}
