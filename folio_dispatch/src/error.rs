// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for dispatch.

use folio_tree::{NodeId, TreeError};
use thiserror::Error;

/// Reasons a dispatch call is aborted.
///
/// None of these are retried. Handler side effects that happened before the failure are
/// not rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A tree operation failed, either while resolving boundaries or inside a handler.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A boundary path does not start at the dispatch origin.
    #[error("boundary path starts at {first:?} instead of origin {origin}")]
    BoundaryOrigin {
        /// Dispatch origin.
        origin: NodeId,
        /// First element of the offending path, `None` if the path was empty.
        first: Option<NodeId>,
    },

    /// A boundary node could not be located among its expected siblings.
    #[error("boundary node {boundary} not found under {parent} at depth {depth}")]
    InconsistentBoundary {
        /// Node whose children were scanned.
        parent: NodeId,
        /// Boundary node that was expected at this level.
        boundary: NodeId,
        /// Depth of the scanned children.
        depth: usize,
    },

    /// A handler gave up.
    #[error("handler failed: {0}")]
    Handler(String),
}
