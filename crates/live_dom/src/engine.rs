//! Per-delta application against a [`LiveDom`].
//!
//! Contract:
//! - Deltas name nodes by id; ids are resolved at apply time, so a node may
//!   already be gone or have moved since the delta was computed.
//! - Tolerated misses (`removeNode`, `updateNode`, `focusNode`, `updateVtext`)
//!   return [`Applied::Skipped`] and leave the tree untouched.
//! - Structural violations (unresolvable `replaceChild`/`insertNode`/`moveNode`
//!   targets, cycles, duplicate ids) return [`ApplyError`] and must abort the
//!   batch. Earlier deltas are not rolled back.
//! - Child indices count every child node, text included.

use crate::arena::{ElementData, NodeHandle, NodeKind};
use crate::config::EngineConfig;
use crate::dom::LiveDom;
use crate::error::{ApplyError, DomError};
use core_types::NodeId;
use std::collections::HashSet;
use vdom::{Attributes, ClassDelta, Delta, NodeUpdate, VNode};

const LOG_TARGET: &str = "live_dom.engine";

/// Outcome of one successfully handled delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The tree was mutated.
    Done,
    /// The tree already matched; nothing was touched.
    Unchanged,
    /// A tolerated condition; the delta was dropped.
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MissingNode(NodeId),
    /// Property or child-content updates addressed a text node.
    NotAnElement(NodeHandle),
    /// The root cannot be removed or replaced.
    RootNode,
    /// `outerContent` needs a parent to splice into.
    Detached(NodeHandle),
}

pub struct DeltaEngine {
    boolean_attributes: HashSet<String>,
}

impl DeltaEngine {
    pub fn new(config: &EngineConfig) -> Self {
        DeltaEngine {
            boolean_attributes: config
                .boolean_attributes
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn apply(&self, dom: &mut LiveDom, delta: &Delta) -> Result<Applied, ApplyError> {
        log::trace!(target: LOG_TARGET, "apply {delta:?}");
        let action = delta.action();
        let result = match delta {
            Delta::FocusNode { id } => Ok(focus_node(dom, id)),
            Delta::InsertNode {
                parent_id,
                index,
                content,
            } => insert_node(dom, parent_id, *index, content),
            Delta::MoveNode {
                id,
                parent_id,
                index,
            } => move_node(dom, id, parent_id, *index),
            Delta::RemoveNode { id } => remove_node(dom, id),
            Delta::ReplaceChild {
                parent_id,
                from_id,
                to_id,
            } => replace_child(dom, parent_id, from_id, to_id),
            Delta::UpdateNode(update) => self.update_node(dom, update),
            Delta::UpdateVtext {
                id,
                value,
                old_value,
            } => update_vtext(
                dom,
                id,
                value,
                old_value.as_deref().filter(|old| !old.is_empty()),
            ),
        };
        let applied = result.map_err(|source| ApplyError::new(action, source))?;
        if let Applied::Skipped(reason) = &applied {
            log::warn!(target: LOG_TARGET, "{action} skipped: {reason:?}");
        }
        Ok(applied)
    }

    fn update_node(&self, dom: &mut LiveDom, update: &NodeUpdate) -> Result<Applied, DomError> {
        let Some(target) = dom.resolve_or_root(update.id.as_ref()) else {
            // Only a given id can miss; the root always resolves.
            return Ok(update.id.clone().map_or(Applied::Unchanged, missing));
        };
        if let Some(action) = &update.unrecognized_action {
            log::debug!(target: LOG_TARGET, "applying {action:?} as updateNode");
        }

        let has_properties =
            update.attributes.is_some() || update.cls.is_some() || update.style.is_some();
        if (has_properties || update.inner_content.is_some())
            && dom.record_mut(target)?.element_mut().is_none()
        {
            return Ok(Applied::Skipped(SkipReason::NotAnElement(target)));
        }
        if has_properties {
            if let Some(attributes) = &update.attributes {
                self.apply_attributes(dom, target, attributes)?;
            }
            let record = dom.record_mut(target)?;
            if let Some(element) = record.element_mut() {
                if let Some(cls) = &update.cls {
                    apply_classes(element, cls);
                }
                if let Some(style) = &update.style {
                    apply_style(element, style);
                }
            }
        }

        if let Some(fragment) = &update.inner_content {
            dom.replace_children(target, fragment.nodes())?;
        }

        // Last: the target is freed once its outer content is replaced.
        if let Some(fragment) = &update.outer_content {
            if target == dom.root() {
                return Ok(Applied::Skipped(SkipReason::RootNode));
            }
            let Some(record) = dom.node(target) else {
                return Err(DomError::StaleHandle(target));
            };
            if record.parent().is_none() {
                return Ok(Applied::Skipped(SkipReason::Detached(target)));
            }
            dom.replace_node(target, fragment.nodes())?;
        }
        Ok(Applied::Done)
    }

    fn apply_attributes(
        &self,
        dom: &mut LiveDom,
        target: NodeHandle,
        attributes: &Attributes,
    ) -> Result<(), DomError> {
        for (key, value) in attributes.iter() {
            // Identity changes must go through the registry.
            if key == "id" {
                dom.set_node_id(target, value.map(NodeId::from))?;
                continue;
            }
            let Some(element) = dom.record_mut(target)?.element_mut() else {
                return Ok(());
            };
            if self.boolean_attributes.contains(&key.to_ascii_lowercase()) {
                element.set_property(key, value == Some("true"));
                continue;
            }
            match value {
                Some(value) => element.set_attribute(key, value),
                // Form control values are live state and cannot be removed.
                None if key == "value" => element.set_attribute(key, ""),
                None => element.remove_attribute(key),
            }
        }
        Ok(())
    }
}

impl Default for DeltaEngine {
    fn default() -> Self {
        DeltaEngine::new(&EngineConfig::default())
    }
}

fn missing(id: NodeId) -> Applied {
    Applied::Skipped(SkipReason::MissingNode(id))
}

fn require(dom: &LiveDom, id: &NodeId) -> Result<NodeHandle, DomError> {
    dom.resolve(id)
        .ok_or_else(|| DomError::MissingNode(id.clone()))
}

fn focus_node(dom: &mut LiveDom, id: &NodeId) -> Applied {
    match dom.resolve(id) {
        Some(node) => {
            dom.focus(node);
            Applied::Done
        }
        None => missing(id.clone()),
    }
}

fn insert_node(
    dom: &mut LiveDom,
    parent_id: &NodeId,
    index: usize,
    content: &VNode,
) -> Result<Applied, DomError> {
    let parent = require(dom, parent_id)?;
    dom.ensure_container(parent)?;
    let count = dom.child_count(parent);
    let node = dom.create_detached(content)?;
    // Before the child at `index` so the new node lands exactly there;
    // past the end (or into an empty parent) it goes last.
    let before = if count > 0 && index < count {
        dom.child_at(parent, index)
    } else {
        None
    };
    dom.insert_before(parent, node, before)?;
    Ok(Applied::Done)
}

fn move_node(
    dom: &mut LiveDom,
    id: &NodeId,
    parent_id: &NodeId,
    index: usize,
) -> Result<Applied, DomError> {
    let node = require(dom, id)?;
    let parent = require(dom, parent_id)?;
    dom.ensure_container(parent)?;
    if parent == node || dom.is_descendant(node, parent) {
        return Err(DomError::CycleDetected {
            parent,
            child: node,
        });
    }

    let count = dom.child_count(parent);
    if index >= count {
        if count > 0 && dom.child_at(parent, count - 1) == Some(node) {
            return Ok(Applied::Unchanged);
        }
        dom.insert_before(parent, node, None)?;
        return Ok(Applied::Done);
    }
    if dom.child_at(parent, index) == Some(node) {
        return Ok(Applied::Unchanged);
    }
    // Index positions refer to the list without the moving node, so a
    // forward move within the same parent still lands at `index`.
    dom.detach(node)?;
    let before = dom.child_at(parent, index);
    dom.insert_before(parent, node, before)?;
    Ok(Applied::Done)
}

fn remove_node(dom: &mut LiveDom, id: &NodeId) -> Result<Applied, DomError> {
    let Some(node) = dom.resolve(id) else {
        return Ok(missing(id.clone()));
    };
    if node == dom.root() {
        return Ok(Applied::Skipped(SkipReason::RootNode));
    }
    let freed = dom.remove(node)?;
    log::trace!(target: LOG_TARGET, "removed {id} ({freed} nodes)");
    Ok(Applied::Done)
}

fn replace_child(
    dom: &mut LiveDom,
    parent_id: &NodeId,
    from_id: &NodeId,
    to_id: &NodeId,
) -> Result<Applied, DomError> {
    let parent = require(dom, parent_id)?;
    let from = require(dom, from_id)?;
    let to = require(dom, to_id)?;
    if dom.node(from).and_then(|r| r.parent()) != Some(parent) {
        return Err(DomError::NotAChild {
            parent,
            child: from,
        });
    }
    if from == to {
        return Ok(Applied::Unchanged);
    }
    if to == parent || dom.is_descendant(to, parent) {
        return Err(DomError::CycleDetected { parent, child: to });
    }
    dom.insert_before(parent, to, Some(from))?;
    dom.remove(from)?;
    Ok(Applied::Done)
}

fn update_vtext(
    dom: &mut LiveDom,
    id: &NodeId,
    value: &str,
    old_value: Option<&str>,
) -> Result<Applied, DomError> {
    let Some(node) = dom.resolve(id) else {
        return Ok(missing(id.clone()));
    };
    if let NodeKind::Text { text } = &mut dom.record_mut(node)?.kind {
        match old_value {
            None => text.push_str(value),
            Some(old) => {
                if text.as_str() != old {
                    log::debug!(
                        target: LOG_TARGET,
                        "updateVtext on {id}: expected {old:?}, found {text:?}; replacing anyway"
                    );
                }
                value.clone_into(text);
            }
        }
        return Ok(Applied::Done);
    }

    // Element target: operate on its text content.
    match old_value {
        None => {
            let text = dom.create_detached(&VNode::text(value))?;
            dom.insert_before(node, text, None)?;
        }
        Some(_) => dom.replace_children(node, &[VNode::text(value)])?,
    }
    Ok(Applied::Done)
}

fn apply_classes(element: &mut ElementData, cls: &ClassDelta) {
    for class in &cls.add {
        element.add_class(class);
    }
    for class in &cls.remove {
        element.remove_class(class);
    }
}

fn apply_style(element: &mut ElementData, style: &Attributes) {
    for (name, value) in style.iter() {
        match value {
            Some(value) => element.set_style(name, value),
            None => element.remove_style(name),
        }
    }
}
