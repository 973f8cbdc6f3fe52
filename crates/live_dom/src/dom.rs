use crate::arena::{DomArena, ElementData, NodeHandle, NodeKind, NodeRecord};
use crate::error::DomError;
use crate::registry::NodeRegistry;
use core_types::NodeId;
use std::collections::HashSet;
use vdom::VNode;

/// The live, mutable tree plus its id registry and focus state.
///
/// Owned by a single thread; every mutation goes through `&mut self`.
pub struct LiveDom {
    arena: DomArena,
    registry: NodeRegistry,
    root: NodeHandle,
    focused: Option<NodeHandle>,
}

impl LiveDom {
    /// Id given to the root of [`LiveDom::new`].
    pub const ROOT_ID: &'static str = "body";

    /// A tree holding only an empty `<body id="body">` root.
    pub fn new() -> Self {
        let mut arena = DomArena::new();
        let root_id = NodeId::from(Self::ROOT_ID);
        let root = arena.alloc(
            Some(root_id.clone()),
            NodeKind::Element(ElementData {
                tag: Self::ROOT_ID.to_string(),
                ..Default::default()
            }),
        );
        let mut registry = NodeRegistry::new();
        registry.register(root_id, root);
        LiveDom {
            arena,
            registry,
            root,
            focused: None,
        }
    }

    /// Materializes `root` (which must be an element) as the whole tree.
    pub fn from_vnode(root: &VNode) -> Result<Self, DomError> {
        if !matches!(root, VNode::Element { .. }) {
            return Err(DomError::InvalidRoot);
        }
        let mut dom = LiveDom {
            arena: DomArena::new(),
            registry: NodeRegistry::new(),
            root: NodeHandle::FIRST,
            focused: None,
        };
        dom.check_ids_free(std::slice::from_ref(root), None)?;
        dom.root = dom.build(root)?;
        Ok(dom)
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn resolve(&self, id: &NodeId) -> Option<NodeHandle> {
        self.registry.resolve(id)
    }

    /// Resolves `id`, or the root when no id is given.
    ///
    /// A given id that does not resolve stays unresolved; only an absent id
    /// falls back to the root.
    pub fn resolve_or_root(&self, id: Option<&NodeId>) -> Option<NodeHandle> {
        match id {
            Some(id) => self.resolve(id),
            None => Some(self.root),
        }
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&NodeRecord> {
        self.arena.get(handle)
    }

    /// Convenience lookup by id string.
    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.resolve(&NodeId::from(id)).and_then(|h| self.node(h))
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.arena.len_live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn child_count(&self, parent: NodeHandle) -> usize {
        self.node(parent).map_or(0, |r| r.children().len())
    }

    pub fn child_at(&self, parent: NodeHandle, index: usize) -> Option<NodeHandle> {
        self.node(parent)
            .and_then(|r| r.children().get(index).copied())
    }

    pub fn index_in_parent(&self, handle: NodeHandle) -> Option<usize> {
        let parent = self.node(handle)?.parent()?;
        self.node(parent)?
            .children()
            .iter()
            .position(|c| *c == handle)
    }

    /// Child labels of `id`: the child's id, or `#text` / `<tag>` when anonymous.
    pub fn child_ids(&self, id: &str) -> Vec<String> {
        let Some(record) = self.get(id) else {
            return Vec::new();
        };
        record
            .children()
            .iter()
            .filter_map(|h| self.node(*h))
            .map(|child| match (&child.id, &child.kind) {
                (Some(id), _) => id.to_string(),
                (None, NodeKind::Text { .. }) => "#text".to_string(),
                (None, NodeKind::Element(data)) => format!("<{}>", data.tag),
            })
            .collect()
    }

    /// Concatenated text of the subtree, in document order.
    pub fn text_content(&self, handle: NodeHandle) -> String {
        let mut out = String::new();
        for h in self.arena.subtree(handle) {
            if let Some(text) = self.node(h).and_then(NodeRecord::text) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn focused(&self) -> Option<NodeHandle> {
        self.focused
    }

    pub fn focused_id(&self) -> Option<&NodeId> {
        self.focused
            .and_then(|h| self.node(h))
            .and_then(NodeRecord::id)
    }

    /// Builds `node` as a parentless subtree and registers its ids.
    pub fn create_detached(&mut self, node: &VNode) -> Result<NodeHandle, DomError> {
        self.check_ids_free(std::slice::from_ref(node), None)?;
        self.build(node)
    }

    /// Materializes the subtree at `handle` back into its serialized form.
    pub fn to_vnode(&self, handle: NodeHandle) -> Result<VNode, DomError> {
        let record = self.arena.live(handle)?;
        let node = match &record.kind {
            NodeKind::Text { text } => VNode::Text {
                id: record.id.clone(),
                text: text.clone(),
            },
            NodeKind::Element(data) => VNode::Element {
                id: record.id.clone(),
                tag: data.tag.clone(),
                attributes: data.attributes.clone(),
                classes: data.classes.clone(),
                style: data.style.clone(),
                children: record
                    .children
                    .iter()
                    .map(|child| self.to_vnode(*child))
                    .collect::<Result<Vec<_>, _>>()?,
            },
        };
        Ok(node)
    }

    pub(crate) fn ensure_container(&self, parent: NodeHandle) -> Result<(), DomError> {
        self.arena.ensure_container(parent)
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
        before: Option<NodeHandle>,
    ) -> Result<(), DomError> {
        self.arena.insert_before(parent, child, before)
    }

    pub(crate) fn detach(&mut self, handle: NodeHandle) -> Result<(), DomError> {
        self.arena.detach(handle)
    }

    pub(crate) fn is_descendant(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        self.arena.is_descendant(ancestor, node)
    }

    /// Frees the subtree at `handle`; its ids become unresolvable.
    ///
    /// Returns the number of nodes freed.
    pub(crate) fn remove(&mut self, handle: NodeHandle) -> Result<usize, DomError> {
        let freed = self.arena.remove_subtree(handle)?;
        for (h, id) in &freed {
            if let Some(id) = id {
                self.registry.unregister(id, *h);
            }
            if self.focused == Some(*h) {
                self.focused = None;
            }
        }
        Ok(freed.len())
    }

    pub(crate) fn focus(&mut self, handle: NodeHandle) {
        self.focused = Some(handle);
    }

    pub(crate) fn record_mut(&mut self, handle: NodeHandle) -> Result<&mut NodeRecord, DomError> {
        self.arena.live_mut(handle)
    }

    /// Re-keys a node, keeping the registry in step.
    pub(crate) fn set_node_id(
        &mut self,
        handle: NodeHandle,
        id: Option<NodeId>,
    ) -> Result<(), DomError> {
        if let Some(new_id) = &id {
            match self.registry.resolve(new_id) {
                Some(existing) if existing == handle => return Ok(()),
                Some(_) => return Err(DomError::DuplicateId(new_id.clone())),
                None => {}
            }
        }
        let record = self.arena.live_mut(handle)?;
        let old = std::mem::replace(&mut record.id, id.clone());
        if let Some(old) = old {
            self.registry.unregister(&old, handle);
        }
        if let Some(new_id) = id {
            self.registry.register(new_id, handle);
        }
        Ok(())
    }

    /// Replaces every child of `parent` with `nodes`.
    pub(crate) fn replace_children(
        &mut self,
        parent: NodeHandle,
        nodes: &[VNode],
    ) -> Result<(), DomError> {
        self.ensure_container(parent)?;
        let old_children = self.arena.live(parent)?.children.clone();
        self.check_ids_free(nodes, Some(old_children.as_slice()))?;
        for child in old_children {
            self.remove(child)?;
        }
        for node in nodes {
            let child = self.build(node)?;
            self.arena.insert_before(parent, child, None)?;
        }
        Ok(())
    }

    /// Replaces the attached node `target` with `nodes`, at the same position.
    pub(crate) fn replace_node(
        &mut self,
        target: NodeHandle,
        nodes: &[VNode],
    ) -> Result<(), DomError> {
        let parent = self
            .arena
            .live(target)?
            .parent
            .ok_or(DomError::StaleHandle(target))?;
        self.check_ids_free(nodes, Some(std::slice::from_ref(&target)))?;
        let next_sibling = {
            let siblings = &self.arena.live(parent)?.children;
            let pos = siblings
                .iter()
                .position(|c| *c == target)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: target,
                })?;
            siblings.get(pos + 1).copied()
        };
        self.remove(target)?;
        for node in nodes {
            let child = self.build(node)?;
            self.arena.insert_before(parent, child, next_sibling)?;
        }
        Ok(())
    }

    /// Fails if any id in `nodes` repeats, or is live outside the subtrees
    /// rooted at `replacing` (which are about to be freed).
    fn check_ids_free(
        &self,
        nodes: &[VNode],
        replacing: Option<&[NodeHandle]>,
    ) -> Result<(), DomError> {
        let mut ids = Vec::new();
        for node in nodes {
            node.collect_ids(&mut ids);
        }
        if ids.is_empty() {
            return Ok(());
        }
        let freed: HashSet<NodeHandle> = replacing
            .unwrap_or_default()
            .iter()
            .flat_map(|h| self.arena.subtree(*h))
            .collect();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                return Err(DomError::DuplicateId(id.clone()));
            }
            if let Some(existing) = self.registry.resolve(id) {
                if !freed.contains(&existing) {
                    return Err(DomError::DuplicateId(id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Allocates `node` and its descendants; ids must already be checked.
    fn build(&mut self, node: &VNode) -> Result<NodeHandle, DomError> {
        let handle = match node {
            VNode::Text { id, text } => self
                .arena
                .alloc(id.clone(), NodeKind::Text { text: text.clone() }),
            VNode::Element {
                id,
                tag,
                attributes,
                classes,
                style,
                ..
            } => {
                let mut data = ElementData {
                    tag: tag.clone(),
                    ..Default::default()
                };
                for (k, v) in attributes {
                    data.set_attribute(k, v);
                }
                for class in classes {
                    data.add_class(class);
                }
                for (k, v) in style {
                    data.set_style(k, v);
                }
                self.arena.alloc(id.clone(), NodeKind::Element(data))
            }
        };
        if let Some(id) = node.id() {
            self.registry.register(id.clone(), handle);
        }
        for child in node.children() {
            let child_handle = self.build(child)?;
            self.arena.insert_before(handle, child_handle, None)?;
        }
        Ok(handle)
    }
}

impl Default for LiveDom {
    fn default() -> Self {
        Self::new()
    }
}
