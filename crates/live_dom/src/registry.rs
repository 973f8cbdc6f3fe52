use crate::arena::NodeHandle;
use core_types::NodeId;
use std::collections::HashMap;

/// Index from producer-issued ids to arena handles.
///
/// Only id-bearing nodes are registered; anonymous nodes are reachable
/// through their parent alone.
#[derive(Default)]
pub struct NodeRegistry {
    by_id: HashMap<NodeId, NodeHandle>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, id: &NodeId) -> Option<NodeHandle> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn register(&mut self, id: NodeId, handle: NodeHandle) {
        self.by_id.insert(id, handle);
    }

    /// Drops `id` only if it still points at `handle`.
    pub(crate) fn unregister(&mut self, id: &NodeId, handle: NodeHandle) {
        if self.by_id.get(id) == Some(&handle) {
            self.by_id.remove(id);
        }
    }
}
