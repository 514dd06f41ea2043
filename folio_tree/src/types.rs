// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the node tree: node identifiers, type tags, payloads, and options.

use serde::{Deserialize, Serialize};

/// Identifier for a node in the tree (generational).
///
/// A `NodeId` stays valid until the node is released with [`Tree::remove`](crate::Tree::remove).
/// After that the slot may be reused, but the generation is bumped, so an old handle is
/// reported as stale instead of aliasing the new occupant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

/// Type tag of a document node.
///
/// The five named variants cover the built-in document schema. Hosts that add their own
/// block or inline types use [`DocType::Custom`] with a number they manage themselves.
///
/// In source descriptions the named variants are written in kebab case (`"list-item"`),
/// and custom tags as `{ "custom": 7 }`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    /// The document root.
    Doc,
    /// An ordered or unordered list.
    List,
    /// One entry of a list.
    ListItem,
    /// A block of inline text runs.
    Paragraph,
    /// A styled text run (leaf).
    Text,
    /// Host-defined node type.
    Custom(u32),
}

/// Opaque payload carried by a node.
///
/// The tree never looks inside it apart from the shallow comparison done by
/// [`Tree::update`](crate::Tree::update).
pub type DataMap = serde_json::Map<String, serde_json::Value>;

/// How keys are produced for nodes whose source description has no `id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Random UUID v4 strings.
    #[default]
    Random,
    /// `prefix-0`, `prefix-1`, ... in creation order. Useful for reproducible fixtures.
    Sequential {
        /// Text placed before the running counter.
        prefix: String,
    },
}

/// Runtime options for a [`Tree`](crate::Tree).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Key generation for nodes built without an explicit `id`.
    pub keys: KeyStrategy,
}

impl TreeOptions {
    /// Options producing deterministic `prefix-N` keys.
    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self {
            keys: KeyStrategy::Sequential {
                prefix: prefix.into(),
            },
        }
    }
}
