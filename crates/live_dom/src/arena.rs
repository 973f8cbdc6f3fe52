//! Slot arena holding live nodes.
//!
//! Invariants:
//! - A handle is never reused; removed slots stay `None` so a stale handle
//!   resolves to nothing instead of to an unrelated node.
//! - A node has at most one parent, and appears exactly once in that
//!   parent's `children`.
//! - Operations never create cycles.

use crate::error::DomError;
use core_types::NodeId;
use std::fmt;

/// Opaque index of a node slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    /// Slot of the first allocation in a fresh arena.
    pub(crate) const FIRST: NodeHandle = NodeHandle(0);
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementData {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) classes: Vec<String>,
    pub(crate) style: Vec<(String, String)>,
}

impl ElementData {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Boolean property (e.g. `checked`): set while the attribute is present
    /// with any value other than `"false"`.
    pub fn property(&self, key: &str) -> bool {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .is_some_and(|(_, v)| v != "false")
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn style(&self, name: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn styles(&self) -> &[(String, String)] {
        &self.style
    }

    pub(crate) fn set_attribute(&mut self, key: &str, value: &str) {
        set_pair(&mut self.attributes, key, value.to_string());
    }

    pub(crate) fn remove_attribute(&mut self, key: &str) {
        self.attributes.retain(|(k, _)| k != key);
    }

    /// Reflects a boolean property onto its attribute: `"true"` or absent.
    pub(crate) fn set_property(&mut self, key: &str, value: bool) {
        self.attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        if value {
            self.attributes.push((key.to_string(), "true".to_string()));
        }
    }

    pub(crate) fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub(crate) fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub(crate) fn set_style(&mut self, name: &str, value: &str) {
        set_pair(&mut self.style, name, value.to_string());
    }

    pub(crate) fn remove_style(&mut self, name: &str) {
        self.style.retain(|(k, _)| k != name);
    }
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: String) {
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some((_, existing)) => *existing = value,
        None => pairs.push((key.to_string(), value)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text { text: String },
}

#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub(crate) id: Option<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
}

impl NodeRecord {
    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text { .. } => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text { .. } => None,
        }
    }

    /// Own text for text nodes; `None` for elements.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text } => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}

pub(crate) struct DomArena {
    nodes: Vec<Option<NodeRecord>>,
}

impl DomArena {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, id: Option<NodeId>, kind: NodeKind) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len() as u32);
        self.nodes.push(Some(NodeRecord {
            id,
            kind,
            parent: None,
            children: Vec::new(),
        }));
        handle
    }

    pub(crate) fn get(&self, handle: NodeHandle) -> Option<&NodeRecord> {
        self.nodes.get(handle.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(handle.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn live(&self, handle: NodeHandle) -> Result<&NodeRecord, DomError> {
        self.get(handle).ok_or(DomError::StaleHandle(handle))
    }

    pub(crate) fn live_mut(&mut self, handle: NodeHandle) -> Result<&mut NodeRecord, DomError> {
        self.get_mut(handle).ok_or(DomError::StaleHandle(handle))
    }

    pub(crate) fn len_live(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn ensure_container(&self, parent: NodeHandle) -> Result<(), DomError> {
        if !self.live(parent)?.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        Ok(())
    }

    /// Inserts `child` before `before` (or last when `before` is `None`),
    /// detaching it from any previous parent first.
    pub(crate) fn insert_before(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
        before: Option<NodeHandle>,
    ) -> Result<(), DomError> {
        self.ensure_container(parent)?;
        self.live(child)?;
        if parent == child || self.is_descendant(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if let Some(before) = before {
            if before == child {
                return Ok(());
            }
            if self.live(before)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: before,
                });
            }
        }
        self.detach(child)?;
        let siblings = &mut self.live_mut(parent)?.children;
        let pos = match before {
            Some(before) => siblings
                .iter()
                .position(|k| *k == before)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: before,
                })?,
            None => siblings.len(),
        };
        siblings.insert(pos, child);
        self.live_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlinks `handle` from its parent; the subtree stays allocated.
    pub(crate) fn detach(&mut self, handle: NodeHandle) -> Result<(), DomError> {
        if let Some(parent) = self.live_mut(handle)?.parent.take() {
            if let Some(record) = self.get_mut(parent) {
                record.children.retain(|k| *k != handle);
            }
        }
        Ok(())
    }

    /// Detaches and frees the subtree rooted at `handle`.
    ///
    /// Returns every freed handle, root first, so callers can drop index
    /// entries pointing at them.
    pub(crate) fn remove_subtree(
        &mut self,
        handle: NodeHandle,
    ) -> Result<Vec<(NodeHandle, Option<NodeId>)>, DomError> {
        self.detach(handle)?;
        let mut freed = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(record) = self
                .nodes
                .get_mut(current.0 as usize)
                .and_then(Option::take)
            else {
                continue;
            };
            stack.extend(record.children.iter().rev().copied());
            freed.push((current, record.id));
        }
        Ok(freed)
    }

    /// Handles in the subtree rooted at `handle`, in pre-order.
    pub(crate) fn subtree(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(record) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(record.children.iter().rev().copied());
        }
        out
    }

    pub(crate) fn is_descendant(&self, ancestor: NodeHandle, maybe_descendant: NodeHandle) -> bool {
        let mut current = self.get(maybe_descendant).and_then(|r| r.parent);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).and_then(|r| r.parent);
        }
        false
    }
}
