//! JSON wire representation.
//!
//! Deltas and content nodes decode through flat raw records so the fallback
//! for unknown discriminators and the per-action required fields are explicit
//! code paths rather than serde defaults.

use core_types::NodeId;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::delta::{Attributes, ClassDelta, Delta, NodeUpdate};
use crate::types::{Fragment, VNode};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("`{action}` delta is missing required field `{field}`")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
    #[error("content node needs a `tag` or `text` field")]
    UntypedNode,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Accepts `null` wherever the field type has a sensible empty value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl From<OneOrMany<VNode>> for Fragment {
    fn from(value: OneOrMany<VNode>) -> Self {
        Fragment(value.into())
    }
}

// Attribute and style values are strings on the live side; other scalars are
// stringified, `null` means "clear".
fn scalar_to_string<E: de::Error>(key: &str, value: serde_json::Value) -> Result<Option<String>, E> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(E::custom(format!(
            "value for `{key}` must be a string, number, bool or null, got {other}"
        ))),
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of attribute names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(key) = map.next_key::<String>()? {
                    let value = map.next_value::<serde_json::Value>()?;
                    let value = scalar_to_string::<A::Error>(&key, value)?;
                    out.push((key, value));
                }
                Ok(Attributes(out))
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassListRepr {
    Joined(String),
    List(Vec<String>),
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "ClassListRepr", into = "Vec<String>")]
struct ClassList(Vec<String>);

impl ClassList {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ClassListRepr> for ClassList {
    fn from(repr: ClassListRepr) -> Self {
        match repr {
            ClassListRepr::Joined(s) => ClassList(s.split_whitespace().map(str::to_string).collect()),
            ClassListRepr::List(list) => ClassList(list),
        }
    }
}

impl From<ClassList> for Vec<String> {
    fn from(list: ClassList) -> Self {
        list.0
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawVNode {
    Bare(String),
    Node(RawVNodeRecord),
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub(crate) struct RawVNodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Attributes::is_empty"
    )]
    attributes: Attributes,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "ClassList::is_empty"
    )]
    cls: ClassList,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Attributes::is_empty"
    )]
    style: Attributes,
    #[serde(
        default,
        alias = "cn",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    children: Vec<VNode>,
}

fn present_pairs(attributes: Attributes) -> Vec<(String, String)> {
    attributes
        .0
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
}

impl TryFrom<RawVNode> for VNode {
    type Error = WireError;

    fn try_from(raw: RawVNode) -> Result<Self, Self::Error> {
        let record = match raw {
            RawVNode::Bare(text) => return Ok(VNode::Text { id: None, text }),
            RawVNode::Node(record) => record,
        };
        match (record.tag, record.text) {
            (Some(tag), text) => {
                let mut children = Vec::with_capacity(record.children.len() + 1);
                if let Some(text) = text {
                    children.push(VNode::text(text));
                }
                children.extend(record.children);
                Ok(VNode::Element {
                    id: record.id,
                    tag,
                    attributes: present_pairs(record.attributes),
                    classes: record.cls.0,
                    style: present_pairs(record.style),
                    children,
                })
            }
            (None, Some(text)) => Ok(VNode::Text {
                id: record.id,
                text,
            }),
            (None, None) => Err(WireError::UntypedNode),
        }
    }
}

fn pairs_to_attributes(pairs: Vec<(String, String)>) -> Attributes {
    Attributes(pairs.into_iter().map(|(k, v)| (k, Some(v))).collect())
}

impl From<VNode> for RawVNode {
    fn from(node: VNode) -> Self {
        match node {
            VNode::Text { id: None, text } => RawVNode::Bare(text),
            VNode::Text { id, text } => RawVNode::Node(RawVNodeRecord {
                id,
                text: Some(text),
                ..Default::default()
            }),
            VNode::Element {
                id,
                tag,
                attributes,
                classes,
                style,
                children,
            } => RawVNode::Node(RawVNodeRecord {
                id,
                tag: Some(tag),
                text: None,
                attributes: pairs_to_attributes(attributes),
                cls: ClassList(classes),
                style: pairs_to_attributes(style),
                children,
            }),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<VNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cls: Option<ClassDelta>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    inner_content: Option<Option<Fragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outer_content: Option<Fragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_value: Option<String>,
}

fn required<T>(value: Option<T>, action: &'static str, field: &'static str) -> Result<T, WireError> {
    value.ok_or(WireError::MissingField { action, field })
}

impl TryFrom<RawDelta> for Delta {
    type Error = WireError;

    fn try_from(raw: RawDelta) -> Result<Self, Self::Error> {
        let delta = match raw.action.as_deref() {
            Some(Delta::FOCUS_NODE) => Delta::FocusNode {
                id: required(raw.id, Delta::FOCUS_NODE, "id")?,
            },
            Some(Delta::INSERT_NODE) => Delta::InsertNode {
                parent_id: required(raw.parent_id, Delta::INSERT_NODE, "parentId")?,
                index: required(raw.index, Delta::INSERT_NODE, "index")?,
                content: required(raw.content, Delta::INSERT_NODE, "content")?,
            },
            Some(Delta::MOVE_NODE) => Delta::MoveNode {
                id: required(raw.id, Delta::MOVE_NODE, "id")?,
                parent_id: required(raw.parent_id, Delta::MOVE_NODE, "parentId")?,
                index: required(raw.index, Delta::MOVE_NODE, "index")?,
            },
            Some(Delta::REMOVE_NODE) => Delta::RemoveNode {
                id: required(raw.id, Delta::REMOVE_NODE, "id")?,
            },
            Some(Delta::REPLACE_CHILD) => Delta::ReplaceChild {
                parent_id: required(raw.parent_id, Delta::REPLACE_CHILD, "parentId")?,
                from_id: required(raw.from_id, Delta::REPLACE_CHILD, "fromId")?,
                to_id: required(raw.to_id, Delta::REPLACE_CHILD, "toId")?,
            },
            Some(Delta::UPDATE_VTEXT) => Delta::UpdateVtext {
                id: required(raw.id, Delta::UPDATE_VTEXT, "id")?,
                value: required(raw.value, Delta::UPDATE_VTEXT, "value")?,
                old_value: raw.old_value.filter(|v| !v.is_empty()),
            },
            // Default arm: no discriminator, "updateNode", or anything else.
            action => {
                let unrecognized_action = action
                    .filter(|a| *a != Delta::UPDATE_NODE)
                    .map(str::to_string);
                if let Some(action) = &unrecognized_action {
                    log::debug!(
                        target: "vdom.wire",
                        "unrecognized delta action {action:?}, treating as updateNode"
                    );
                }
                Delta::UpdateNode(NodeUpdate {
                    id: raw.id,
                    attributes: raw.attributes,
                    cls: raw.cls,
                    inner_content: raw.inner_content.map(Option::unwrap_or_default),
                    outer_content: raw.outer_content,
                    style: raw.style,
                    unrecognized_action,
                })
            }
        };
        Ok(delta)
    }
}

impl From<Delta> for RawDelta {
    fn from(delta: Delta) -> Self {
        let action = Some(delta.action().to_string());
        match delta {
            Delta::FocusNode { id } | Delta::RemoveNode { id } => RawDelta {
                action,
                id: Some(id),
                ..Default::default()
            },
            Delta::InsertNode {
                parent_id,
                index,
                content,
            } => RawDelta {
                action,
                parent_id: Some(parent_id),
                index: Some(index),
                content: Some(content),
                ..Default::default()
            },
            Delta::MoveNode {
                id,
                parent_id,
                index,
            } => RawDelta {
                action,
                id: Some(id),
                parent_id: Some(parent_id),
                index: Some(index),
                ..Default::default()
            },
            Delta::ReplaceChild {
                parent_id,
                from_id,
                to_id,
            } => RawDelta {
                action,
                parent_id: Some(parent_id),
                from_id: Some(from_id),
                to_id: Some(to_id),
                ..Default::default()
            },
            Delta::UpdateNode(update) => RawDelta {
                action,
                id: update.id,
                attributes: update.attributes,
                cls: update.cls,
                inner_content: update.inner_content.map(Some),
                outer_content: update.outer_content,
                style: update.style,
                ..Default::default()
            },
            Delta::UpdateVtext {
                id,
                value,
                old_value,
            } => RawDelta {
                action,
                id: Some(id),
                value: Some(value),
                old_value,
                ..Default::default()
            },
        }
    }
}
