// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for tree mutation and lookup.

use thiserror::Error;

use crate::types::NodeId;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TreeError> = core::result::Result<T, E>;

/// Precondition violations reported by [`Tree`](crate::Tree).
///
/// Every variant is fatal to the call that produced it; the tree is left exactly as it was
/// before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The handle refers to a freed (or never allocated) slot.
    #[error("node {0} is stale")]
    StaleNode(NodeId),

    /// A named endpoint is not one of `parent`'s direct children.
    #[error("node {child} is not a child of {parent}")]
    StructuralMismatch {
        /// Node whose children were searched.
        parent: NodeId,
        /// Endpoint that was not found.
        child: NodeId,
    },

    /// A boundary node is not below the traversal origin.
    #[error("node {node} is not a descendant of {origin}")]
    NotADescendant {
        /// Node whose ancestry was walked.
        node: NodeId,
        /// Expected ancestor.
        origin: NodeId,
    },

    /// `detach` was called on a node without a parent.
    #[error("node {0} has no parent and cannot be detached")]
    InvalidDetach(NodeId),

    /// A child-list mutator was called on a leaf.
    #[error("node {0} has no children")]
    EmptyChildren(NodeId),

    /// An inserted node is already owned by a parent (or listed twice).
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("inserting {node} under {parent} would create a cycle")]
    WouldCycle {
        /// Node being inserted.
        node: NodeId,
        /// Node receiving the insertion.
        parent: NodeId,
    },

    /// `remove` was called on a node that still has a parent.
    #[error("node {0} is still attached; detach it before removing")]
    StillAttached(NodeId),

    /// Two live nodes would share the same key.
    #[error("duplicate node key {0:?}")]
    DuplicateKey(String),

    /// A source description could not be parsed.
    #[error("invalid node source: {0}")]
    Source(String),
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Source(err.to_string())
    }
}
