use core_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::wire::{OneOrMany, RawVNode};

/// Serialized subtree carried by content-bearing deltas.
///
/// Nodes without an `id` are anonymous: they are materialized in the live
/// tree but cannot be addressed by later deltas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVNode", into = "RawVNode")]
pub enum VNode {
    Element {
        id: Option<NodeId>,
        tag: String,
        attributes: Vec<(String, String)>,
        classes: Vec<String>,
        style: Vec<(String, String)>,
        children: Vec<VNode>,
    },
    Text {
        id: Option<NodeId>,
        text: String,
    },
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element {
            id: None,
            tag: tag.into(),
            attributes: Vec::new(),
            classes: Vec::new(),
            style: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text {
            id: None,
            text: text.into(),
        }
    }

    pub fn with_id(mut self, new_id: impl Into<NodeId>) -> Self {
        match &mut self {
            VNode::Element { id, .. } | VNode::Text { id, .. } => *id = Some(new_id.into()),
        }
        self
    }

    /// Builder helper; ignored on text nodes.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element { attributes, .. } = &mut self {
            attributes.push((key.into(), value.into()));
        }
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        if let VNode::Element { classes, .. } = &mut self {
            classes.push(class.into());
        }
        self
    }

    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element { style, .. } = &mut self {
            style.push((name.into(), value.into()));
        }
        self
    }

    pub fn with_child(mut self, child: VNode) -> Self {
        if let VNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn id(&self) -> Option<&NodeId> {
        match self {
            VNode::Element { id, .. } | VNode::Text { id, .. } => id.as_ref(),
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Text { .. } => &[],
        }
    }

    /// Pre-order walk over every id in the subtree.
    pub fn collect_ids<'a>(&'a self, out: &mut Vec<&'a NodeId>) {
        if let Some(id) = self.id() {
            out.push(id);
        }
        for child in self.children() {
            child.collect_ids(out);
        }
    }
}

/// Ordered list of sibling nodes; accepts a single node or an array on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<VNode>", into = "Vec<VNode>")]
pub struct Fragment(pub Vec<VNode>);

impl Fragment {
    pub fn empty() -> Self {
        Fragment(Vec::new())
    }

    pub fn nodes(&self) -> &[VNode] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<VNode> for Fragment {
    fn from(node: VNode) -> Self {
        Fragment(vec![node])
    }
}

impl From<Vec<VNode>> for Fragment {
    fn from(nodes: Vec<VNode>) -> Self {
        Fragment(nodes)
    }
}

impl From<Fragment> for Vec<VNode> {
    fn from(fragment: Fragment) -> Self {
        fragment.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_element_with_children_alias() {
        // Parsed from text so attribute order survives (json! sorts keys).
        let node: VNode = serde_json::from_str(
            r#"{
                "id": "list",
                "tag": "ul",
                "cls": "menu wide",
                "attributes": {"role": "menu", "tabindex": 0, "hidden": false},
                "cn": [
                    {"id": "a", "tag": "li", "style": {"color": "red"}},
                    "plain",
                    {"id": "t", "text": "hello"}
                ]
            }"#,
        )
        .unwrap();

        let VNode::Element {
            id,
            tag,
            attributes,
            classes,
            children,
            ..
        } = &node
        else {
            panic!("expected element, got {node:?}");
        };
        assert_eq!(id.as_ref().map(NodeId::as_str), Some("list"));
        assert_eq!(tag, "ul");
        assert_eq!(classes, &["menu", "wide"]);
        assert_eq!(
            attributes,
            &[
                ("role".to_string(), "menu".to_string()),
                ("tabindex".to_string(), "0".to_string()),
                ("hidden".to_string(), "false".to_string()),
            ]
        );
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], VNode::text("plain"));
        assert_eq!(children[2], VNode::text("hello").with_id("t"));

        let mut ids = Vec::new();
        node.collect_ids(&mut ids);
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, ["list", "a", "t"]);
    }

    #[test]
    fn element_text_becomes_leading_text_child() {
        let node: VNode = serde_json::from_value(json!({"tag": "b", "text": "bold"})).unwrap();
        assert_eq!(node.children(), &[VNode::text("bold")]);
    }

    #[test]
    fn node_without_tag_or_text_is_rejected() {
        let err = serde_json::from_value::<VNode>(json!({"id": "x"})).unwrap_err();
        assert!(err.to_string().contains("tag"), "{err}");
    }

    #[test]
    fn fragment_accepts_single_node_or_array() {
        let one: Fragment = serde_json::from_value(json!({"tag": "p"})).unwrap();
        assert_eq!(one.nodes().len(), 1);
        let many: Fragment = serde_json::from_value(json!(["a", {"tag": "i"}])).unwrap();
        assert_eq!(many.nodes().len(), 2);
    }

    #[test]
    fn serializes_back_to_the_wire_shape() {
        let node = VNode::element("li")
            .with_id("x")
            .with_class("done")
            .with_child(VNode::text("milk"));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({"id": "x", "tag": "li", "cls": ["done"], "children": ["milk"]})
        );
        let back: VNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }
}
