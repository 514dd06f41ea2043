// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=folio_tree --heading-base-level=0

//! Folio Tree: the typed node tree behind a structured document editor.
//!
//! A document is a tree of typed nodes (document, list, list item, paragraph, text). Each
//! node carries an opaque data payload and an optional ordered list of children.
//! The tree provides the mutation primitives an editor command needs, and it notifies an
//! optional per-node render hook whenever something observable changes.
//!
//! ## Ownership model
//!
//! - Nodes live in an arena owned by [`Tree`] and are addressed by [`NodeId`], a
//!   generational handle. A handle to a released node is reported as
//!   [`TreeError::StaleNode`] instead of silently aliasing whatever reuses the slot.
//! - A parent exclusively owns its children. The child's `parent` link is a plain handle,
//!   cleared when the child is removed and set again when it is inserted elsewhere.
//! - Child lists are copy-on-write. A snapshot returned by [`Tree::children`] never
//!   changes, which lets a traversal keep walking a list while handlers mutate siblings.
//!
//! ## API overview
//!
//! - [`Tree::build`] / [`Tree::build_json`] materialize a subtree from a [`NodeSource`].
//! - [`Tree::update`] shallow-merges into a node's [`DataMap`].
//! - [`Tree::concat`], [`Tree::splice`], [`Tree::replace`] and [`Tree::detach`] edit child
//!   lists.
//! - [`Tree::index_of`], [`Tree::children`], [`Tree::parent_of`] and [`Tree::path_to`]
//!   answer structural queries.
//! - [`Tree::set_render_hook`] and [`Tree::set_children_hook`] connect a view layer.
//!
//! ```rust
//! use folio_tree::{Tree, TreeOptions};
//! use serde_json::json;
//!
//! let mut tree = Tree::with_options(TreeOptions::sequential("n"));
//! let doc = tree
//!     .build_json(r#"{
//!         "type": "doc",
//!         "children": [
//!             { "type": "paragraph", "id": "p", "children": [
//!                 { "type": "text", "id": "t", "content": "hello" }
//!             ]}
//!         ]
//!     }"#)
//!     .unwrap();
//!
//! let t = tree.find("t").unwrap();
//! let patch = json!({ "content": "hello, world" });
//! assert!(tree.update(t, patch.as_object().unwrap().clone()).unwrap());
//! assert_eq!(tree.path_to(t, doc).unwrap().len(), 3);
//! ```

mod error;
mod source;
mod tree;
mod types;
mod util;

pub use error::{Result, TreeError};
pub use source::NodeSource;
pub use tree::{ChildrenHook, RenderHook, Tree};
pub use types::{DataMap, DocType, KeyStrategy, NodeId, TreeOptions};
