//! Delta operations applied to the live tree.
//!
//! Invariants:
//! - Deltas in a batch are applied in order; later deltas may reference nodes
//!   created or moved by earlier ones.
//! - Nodes are named by `NodeId`, never by structural path.
//! - An unrecognized `action` decodes as [`Delta::UpdateNode`].

use core_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::types::{Fragment, VNode};
use crate::wire::RawDelta;

/// Ordered `(key, value)` pairs as they appeared on the wire.
///
/// `None` values mean "clear": producers serialize removals as `null` or `""`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(pub Vec<(String, Option<String>)>);

impl Attributes {
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref().filter(|v| !v.is_empty())))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), Some(value.into())));
        self
    }

    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.0.push((key.into(), None));
        self
    }
}

/// Class names to add, then remove.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDelta {
    #[serde(default, deserialize_with = "crate::wire::null_as_default")]
    pub add: Vec<String>,
    #[serde(default, deserialize_with = "crate::wire::null_as_default")]
    pub remove: Vec<String>,
}

/// Field set of an in-place node update.
///
/// Every field is optional; absent fields leave the node untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    /// Target node; `None` addresses the tree root.
    pub id: Option<NodeId>,
    pub attributes: Option<Attributes>,
    pub cls: Option<ClassDelta>,
    pub inner_content: Option<Fragment>,
    pub outer_content: Option<Fragment>,
    pub style: Option<Attributes>,
    /// Discriminator that routed this delta to the default arm, if it was
    /// neither absent nor `"updateNode"`.
    pub unrecognized_action: Option<String>,
}

impl NodeUpdate {
    pub fn on(id: impl Into<NodeId>) -> Self {
        NodeUpdate {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn on_root() -> Self {
        NodeUpdate::default()
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn cls<A, R>(mut self, add: A, remove: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        self.cls = Some(ClassDelta {
            add: add.into_iter().map(Into::into).collect(),
            remove: remove.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn inner_content(mut self, fragment: impl Into<Fragment>) -> Self {
        self.inner_content = Some(fragment.into());
        self
    }

    pub fn outer_content(mut self, fragment: impl Into<Fragment>) -> Self {
        self.outer_content = Some(fragment.into());
        self
    }

    pub fn style(mut self, style: Attributes) -> Self {
        self.style = Some(style);
        self
    }
}

/// One structural or property change to the live tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDelta", into = "RawDelta")]
pub enum Delta {
    /// Move input focus to `id`.
    FocusNode { id: NodeId },
    /// Insert `content` under `parent_id` so it lands at `index`, or last when
    /// `index` is past the end.
    InsertNode {
        parent_id: NodeId,
        index: usize,
        content: VNode,
    },
    /// Relocate `id` to `index` under `parent_id`.
    MoveNode {
        id: NodeId,
        parent_id: NodeId,
        index: usize,
    },
    /// Detach `id` (and its subtree) from the tree.
    RemoveNode { id: NodeId },
    /// Put the existing node `to_id` where child `from_id` of `parent_id` is.
    ReplaceChild {
        parent_id: NodeId,
        from_id: NodeId,
        to_id: NodeId,
    },
    /// Mutate properties of a node in place. Default arm for unknown actions.
    UpdateNode(NodeUpdate),
    /// Append to (`old_value` empty) or replace (`old_value` set) text content.
    UpdateVtext {
        id: NodeId,
        value: String,
        old_value: Option<String>,
    },
}

impl Delta {
    pub const FOCUS_NODE: &'static str = "focusNode";
    pub const INSERT_NODE: &'static str = "insertNode";
    pub const MOVE_NODE: &'static str = "moveNode";
    pub const REMOVE_NODE: &'static str = "removeNode";
    pub const REPLACE_CHILD: &'static str = "replaceChild";
    pub const UPDATE_NODE: &'static str = "updateNode";
    pub const UPDATE_VTEXT: &'static str = "updateVtext";

    /// Wire discriminator for this delta.
    pub fn action(&self) -> &'static str {
        match self {
            Delta::FocusNode { .. } => Self::FOCUS_NODE,
            Delta::InsertNode { .. } => Self::INSERT_NODE,
            Delta::MoveNode { .. } => Self::MOVE_NODE,
            Delta::RemoveNode { .. } => Self::REMOVE_NODE,
            Delta::ReplaceChild { .. } => Self::REPLACE_CHILD,
            Delta::UpdateNode(_) => Self::UPDATE_NODE,
            Delta::UpdateVtext { .. } => Self::UPDATE_VTEXT,
        }
    }

    pub fn focus(id: impl Into<NodeId>) -> Self {
        Delta::FocusNode { id: id.into() }
    }

    pub fn insert(parent_id: impl Into<NodeId>, index: usize, content: VNode) -> Self {
        Delta::InsertNode {
            parent_id: parent_id.into(),
            index,
            content,
        }
    }

    pub fn move_to(id: impl Into<NodeId>, parent_id: impl Into<NodeId>, index: usize) -> Self {
        Delta::MoveNode {
            id: id.into(),
            parent_id: parent_id.into(),
            index,
        }
    }

    pub fn remove(id: impl Into<NodeId>) -> Self {
        Delta::RemoveNode { id: id.into() }
    }

    pub fn replace_child(
        parent_id: impl Into<NodeId>,
        from_id: impl Into<NodeId>,
        to_id: impl Into<NodeId>,
    ) -> Self {
        Delta::ReplaceChild {
            parent_id: parent_id.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
        }
    }

    pub fn update(update: NodeUpdate) -> Self {
        Delta::UpdateNode(update)
    }

    pub fn vtext(id: impl Into<NodeId>, value: impl Into<String>, old_value: Option<&str>) -> Self {
        Delta::UpdateVtext {
            id: id.into(),
            value: value.into(),
            old_value: old_value.filter(|v| !v.is_empty()).map(str::to_string),
        }
    }
}
