// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recursive source descriptions used to materialize subtrees.

use serde::{Deserialize, Serialize};

use crate::types::{DataMap, DocType};

/// Description of a node and its descendants.
///
/// The JSON shape is `{ "type": .., "id"?: .., "children"?: [..], ..payload }`: every field
/// other than `type`, `id` and `children` becomes part of the node's data.
///
/// ```
/// use folio_tree::{DocType, NodeSource};
///
/// let src: NodeSource = serde_json::from_str(
///     r#"{ "type": "text", "id": "t1", "content": "hello" }"#,
/// ).unwrap();
/// assert_eq!(src.kind, DocType::Text);
/// assert_eq!(src.id.as_deref(), Some("t1"));
/// assert_eq!(src.data["content"], "hello");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSource {
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: DocType,
    /// Stable key; generated from the tree's [`KeyStrategy`](crate::KeyStrategy) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Child descriptions in document order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Self>>,
    /// Everything else.
    #[serde(flatten)]
    pub data: DataMap,
}

impl NodeSource {
    /// A leaf of the given type with no key and empty data.
    pub fn new(kind: DocType) -> Self {
        Self {
            kind,
            id: None,
            children: None,
            data: DataMap::new(),
        }
    }

    /// Shorthand for a text run with a `content` field.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(DocType::Text).with_field("content", content.into())
    }

    /// Set the key.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set one payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Append one child description.
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    /// Append several child descriptions.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.get_or_insert_with(Vec::new).extend(children);
        self
    }
}
